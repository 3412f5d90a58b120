//! Double-elimination wiring.
//!
//! # Algorithm
//!
//! Winners matches are visited children-first. Each one yields an
//! *outflow*: the stream that carries the team eliminated from its
//! subtree for the second time.
//!
//! | Winners match `W` | Losers matches created | Outflow |
//! |-------------------|------------------------|---------|
//! | no feeders | none | loser of `W` |
//! | one feeder `D` | `L = (loser of W, out(D))` | winner of `L` |
//! | two feeders `D1, D2` | `F = (out(D1), out(D2))`, `L = (loser of W, winner of F)` | winner of `L` |
//!
//! The grand final takes the winners-bracket champion (left) and the
//! outflow of the final (right). An optional reset match follows it; the
//! grand final feeds both of the reset's slots.
//!
//! Every stream absorbed by a losers match eliminates one team, so the
//! losers bracket has `n - 2` matches and the whole bracket `2n - 2`
//! (`2n - 1` with the reset).

use std::collections::HashMap;

use super::numbering::MatchIdGen;
use super::shape::BracketShape;
use crate::error::{Result, SchedulingError};
use crate::models::{Match, MatchSide};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Outflow {
    Loser(String),
    Winner(String),
}

/// Double-elimination additions to a winners bracket.
#[derive(Debug, Clone, Default)]
pub struct LosersWiring {
    /// Losers-bracket match ids in creation order.
    pub losers: Vec<String>,
    /// Grand final id.
    pub grand_final: Option<String>,
    /// Reset match id.
    pub reset: Option<String>,
}

struct Wiring<'a> {
    shape: &'a mut BracketShape,
    ids: &'a mut MatchIdGen,
    division_id: &'a str,
    out: LosersWiring,
}

impl Wiring<'_> {
    fn create(&mut self, losers_bracket: bool) -> String {
        let id = self.ids.next_id();
        let mut m = Match::new(id.clone(), self.division_id);
        m.losers_bracket = losers_bracket;
        self.shape.matches.insert(id.clone(), m);
        self.shape.created.push(id.clone());
        if losers_bracket {
            self.out.losers.push(id.clone());
        }
        id
    }

    /// Routes `flow` into `target`'s `side` slot.
    fn feed(&mut self, flow: &Outflow, target: &str, side: MatchSide) -> Result<()> {
        let (source, is_loser) = match flow {
            Outflow::Loser(id) => (id, true),
            Outflow::Winner(id) => (id, false),
        };
        let src = self
            .shape
            .matches
            .get_mut(source)
            .ok_or_else(|| SchedulingError::UnknownMatch(source.clone()))?;
        let wire = if is_loser {
            &mut src.loser_next_id
        } else {
            &mut src.winner_next_id
        };
        if wire.is_some() {
            return Err(SchedulingError::MissingLoserChain {
                match_id: source.clone(),
            });
        }
        *wire = Some(target.to_string());
        if !is_loser {
            src.side = Some(side);
        }
        if let Some(t) = self.shape.matches.get_mut(target) {
            t.set_previous(side, Some(source.clone()));
        }
        Ok(())
    }

    fn losers_match(&mut self, left: &Outflow, right: &Outflow) -> Result<Outflow> {
        let id = self.create(true);
        self.feed(left, &id, MatchSide::Left)?;
        self.feed(right, &id, MatchSide::Right)?;
        Ok(Outflow::Winner(id))
    }
}

/// Post-order over the winners bracket, children before parents.
fn post_order(shape: &BracketShape, root: &str) -> Vec<String> {
    let mut order = Vec::new();
    let mut stack: Vec<(String, bool)> = vec![(root.to_string(), false)];
    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            order.push(id);
            continue;
        }
        let deps: Vec<String> = shape
            .matches
            .get(&id)
            .map(|m| m.dependency_ids().map(str::to_string).collect())
            .unwrap_or_default();
        stack.push((id, true));
        for dep in deps.into_iter().rev() {
            stack.push((dep, false));
        }
    }
    order
}

/// Adds the losers bracket, grand final and optional reset to `shape`.
pub fn wire_double_elimination(
    shape: &mut BracketShape,
    division_id: &str,
    ids: &mut MatchIdGen,
    bracket_reset: bool,
) -> Result<LosersWiring> {
    let root = shape.root.clone().ok_or_else(|| SchedulingError::MissingLoserChain {
        match_id: division_id.to_string(),
    })?;
    let order = post_order(shape, &root);
    let mut wiring = Wiring {
        shape,
        ids,
        division_id,
        out: LosersWiring::default(),
    };

    let mut outflow: HashMap<String, Outflow> = HashMap::new();
    for w in order {
        let deps: Vec<String> = wiring
            .shape
            .matches
            .get(&w)
            .map(|m| m.dependency_ids().map(str::to_string).collect())
            .unwrap_or_default();
        let dep_flows: Vec<Outflow> = deps
            .iter()
            .map(|d| {
                outflow
                    .remove(d)
                    .ok_or_else(|| SchedulingError::MissingLoserChain { match_id: d.clone() })
            })
            .collect::<Result<_>>()?;

        let own = Outflow::Loser(w.clone());
        let flow = match dep_flows.as_slice() {
            [] => own,
            [single] => wiring.losers_match(&own, single)?,
            [left, right, ..] => {
                let merged = wiring.losers_match(left, right)?;
                wiring.losers_match(&own, &merged)?
            }
        };
        outflow.insert(w, flow);
    }

    let final_flow = outflow
        .remove(&root)
        .ok_or_else(|| SchedulingError::MissingLoserChain { match_id: root.clone() })?;
    if final_flow == Outflow::Loser(root.clone()) {
        return Err(SchedulingError::MissingLoserChain { match_id: root });
    }

    let grand_final = wiring.create(false);
    wiring.feed(&Outflow::Winner(root), &grand_final, MatchSide::Left)?;
    wiring.feed(&final_flow, &grand_final, MatchSide::Right)?;
    wiring.out.grand_final = Some(grand_final.clone());

    if bracket_reset {
        let reset = wiring.create(false);
        if let Some(gf) = wiring.shape.matches.get_mut(&grand_final) {
            gf.winner_next_id = Some(reset.clone());
            gf.loser_next_id = Some(reset.clone());
        }
        if let Some(r) = wiring.shape.matches.get_mut(&reset) {
            r.previous_left_id = Some(grand_final.clone());
            r.previous_right_id = Some(grand_final.clone());
        }
        wiring.out.reset = Some(reset);
    }
    wiring.shape.root = wiring.out.reset.clone().or_else(|| wiring.out.grand_final.clone());
    Ok(wiring.out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::shape::build_shape;
    use crate::models::Team;

    fn shape(n: usize, ids: &mut MatchIdGen) -> BracketShape {
        let owned: Vec<Team> = (0..n)
            .map(|i| Team::new(format!("t{}", i + 1), i as u32 + 1, "open"))
            .collect();
        let refs: Vec<&Team> = owned.iter().collect();
        build_shape("open", &refs, ids, 32).unwrap()
    }

    fn wired(n: usize, reset: bool) -> (BracketShape, LosersWiring) {
        let mut ids = MatchIdGen::new("e", "match");
        let mut s = shape(n, &mut ids);
        let w = wire_double_elimination(&mut s, "open", &mut ids, reset).unwrap();
        (s, w)
    }

    #[test]
    fn test_eight_teams() {
        let (s, w) = wired(8, false);
        assert_eq!(s.matches.len(), 14);
        assert_eq!(w.losers.len(), 6);
        assert!(w.reset.is_none());
    }

    #[test]
    fn test_counts_with_and_without_reset() {
        for n in 3..=16 {
            assert_eq!(wired(n, false).0.matches.len(), 2 * n - 2, "n = {n}");
            assert_eq!(wired(n, true).0.matches.len(), 2 * n - 1, "n = {n}");
        }
    }

    #[test]
    fn test_every_winners_match_drops_its_loser() {
        let (s, _) = wired(6, false);
        for m in s.matches.values().filter(|m| !m.losers_bracket) {
            if s.root.as_deref() == Some(m.id.as_str()) {
                continue;
            }
            assert!(m.winner_next_id.is_some(), "{} has no winner path", m.id);
        }
        let winners_losing_nowhere = s
            .matches
            .values()
            .filter(|m| !m.losers_bracket && m.winner_next_id.is_some() && m.loser_next_id.is_none())
            .count();
        // Only the grand final has no loser path.
        assert_eq!(winners_losing_nowhere, 0);
    }

    #[test]
    fn test_grand_final_and_reset_links() {
        let (s, w) = wired(4, true);
        let gf = &s.matches[w.grand_final.as_deref().unwrap()];
        let reset = w.reset.as_deref().unwrap();
        assert!(gf.feeds_reset());
        assert_eq!(gf.winner_next_id.as_deref(), Some(reset));
        let r = &s.matches[reset];
        assert_eq!(r.previous_left_id, r.previous_right_id);
        assert_eq!(s.root.as_deref(), Some(reset));

        let left = &s.matches[gf.previous_left_id.as_deref().unwrap()];
        let right = &s.matches[gf.previous_right_id.as_deref().unwrap()];
        assert!(!left.losers_bracket);
        assert!(right.losers_bracket);
    }

    #[test]
    fn test_two_teams_have_no_loser_chain() {
        let mut ids = MatchIdGen::new("e", "match");
        let mut s = shape(2, &mut ids);
        let err = wire_double_elimination(&mut s, "open", &mut ids, false).unwrap_err();
        assert!(matches!(err, SchedulingError::MissingLoserChain { .. }));
    }
}

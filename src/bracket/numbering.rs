//! Match identifiers and chronological numbering.
//!
//! Stable ids are UUIDv5 values derived from the event id and a build
//! sequence, so rebuilding identical input yields identical ids. The small
//! `match_id` numbers are assigned after the whole schedule is known, in
//! (start, end, field, id) order starting at 1.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulingError};
use crate::models::MatchTable;

/// Deterministic match id source for one build.
#[derive(Debug, Clone)]
pub struct MatchIdGen {
    namespace: Uuid,
    prefix: String,
    seq: u64,
}

impl MatchIdGen {
    /// Creates a generator scoped to an event and a phase prefix
    /// (e.g. `"match"`, `"playoff"`).
    pub fn new(event_id: &str, prefix: impl Into<String>) -> Self {
        Self {
            namespace: Uuid::new_v5(&Uuid::NAMESPACE_OID, event_id.as_bytes()),
            prefix: prefix.into(),
            seq: 0,
        }
    }

    /// Next id.
    pub fn next_id(&mut self) -> String {
        let name = format!("{}:{}", self.prefix, self.seq);
        self.seq += 1;
        Uuid::new_v5(&self.namespace, name.as_bytes()).to_string()
    }
}

/// Numbers every match chronologically, starting at 1.
///
/// Matches are collected by walking from the roots (matches with no
/// successor) back over their previous-match links. Fails when the walk
/// processes more than `max_traversal` matches or cannot reach every match
/// (which only happens when the links form a cycle).
pub fn assign_match_ids(matches: &mut MatchTable, config: &SchedulerConfig) -> Result<()> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut stack: Vec<String> = matches
        .values()
        .filter(|m| m.winner_next_id.is_none() && m.loser_next_id.is_none())
        .map(|m| m.id.clone())
        .collect();
    let mut processed = 0usize;

    while let Some(id) = stack.pop() {
        if !visited.insert(id.clone()) {
            continue;
        }
        processed += 1;
        if processed > config.max_traversal {
            return Err(SchedulingError::TraversalLimitExceeded {
                limit: config.max_traversal,
            });
        }
        if let Some(m) = matches.get(&id) {
            stack.extend(
                m.dependency_ids()
                    .filter(|d| !visited.contains(*d))
                    .map(str::to_string),
            );
        }
    }

    if let Some(unreached) = matches.keys().find(|k| !visited.contains(*k)) {
        return Err(SchedulingError::CyclicMatchGraph {
            match_id: unreached.clone(),
        });
    }

    let mut order: Vec<(_, String)> = matches
        .values()
        .map(|m| {
            let (start, end, field, id) = m.chronological_key();
            ((start, end, field.map(str::to_string)), id.to_string())
        })
        .collect();
    order.sort();
    for (n, (_, id)) in order.into_iter().enumerate() {
        if let Some(m) = matches.get_mut(&id) {
            m.match_id = Some(n as u32 + 1);
        }
    }
    debug!(count = matches.len(), "numbered matches");
    Ok(())
}

/// `match_id -> id` for every numbered match.
pub fn identity_map(matches: &MatchTable) -> BTreeMap<u32, String> {
    matches
        .values()
        .filter_map(|m| m.match_id.map(|n| (n, m.id.clone())))
        .collect()
}

/// Gives renumbered matches back the ids their numbers had before.
///
/// A match numbered `n` takes `previous[n]` as its id. A rename is dropped
/// when its target is still held by a match that is not being renamed.
pub fn restore_identities(matches: &mut MatchTable, previous: &BTreeMap<u32, String>) {
    let mut renames: HashMap<String, String> = matches
        .values()
        .filter_map(|m| {
            let old = previous.get(&m.match_id?)?;
            (*old != m.id).then(|| (m.id.clone(), old.clone()))
        })
        .collect();

    loop {
        let kept: BTreeSet<&String> = matches.keys().filter(|k| !renames.contains_key(*k)).collect();
        let blocked: Vec<String> = renames
            .iter()
            .filter(|(_, to)| kept.contains(to))
            .map(|(from, _)| from.clone())
            .collect();
        if blocked.is_empty() {
            break;
        }
        for from in blocked {
            renames.remove(&from);
        }
    }
    if renames.is_empty() {
        return;
    }

    let table = std::mem::take(matches);
    for (_, mut m) in table {
        m.remap_ids(&renames);
        matches.insert(m.id.clone(), m);
    }
    debug!(renamed = renames.len(), "restored match identities");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Match, TimeWindow};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn placed(id: &str, field: &str, start: u32) -> Match {
        let mut m = Match::new(id, "open");
        m.place(field, TimeWindow::new(at(start), at(start + 1)));
        m
    }

    fn table(ms: Vec<Match>) -> MatchTable {
        ms.into_iter().map(|m| (m.id.clone(), m)).collect()
    }

    #[test]
    fn test_ids_are_deterministic() {
        let mut a = MatchIdGen::new("e1", "match");
        let mut b = MatchIdGen::new("e1", "match");
        let mut c = MatchIdGen::new("e1", "playoff");
        let first = a.next_id();
        assert_eq!(first, b.next_id());
        assert_ne!(first, a.next_id());
        assert_ne!(first, c.next_id());
    }

    #[test]
    fn test_chronological_numbering() {
        let mut final_match = placed("z", "f1", 11);
        final_match.previous_left_id = Some("b".into());
        final_match.previous_right_id = Some("a".into());
        let mut a = placed("a", "f2", 9);
        a.winner_next_id = Some("z".into());
        let mut b = placed("b", "f1", 9);
        b.winner_next_id = Some("z".into());
        let mut t = table(vec![final_match, a, b, placed("lone", "f1", 10)]);

        assign_match_ids(&mut t, &SchedulerConfig::default()).unwrap();
        assert_eq!(t["b"].match_id, Some(1));
        assert_eq!(t["a"].match_id, Some(2));
        assert_eq!(t["lone"].match_id, Some(3));
        assert_eq!(t["z"].match_id, Some(4));
    }

    #[test]
    fn test_traversal_ceiling() {
        let mut t = table(vec![placed("a", "f1", 9), placed("b", "f1", 10)]);
        let config = SchedulerConfig::default().with_max_traversal(1);
        let err = assign_match_ids(&mut t, &config).unwrap_err();
        assert_eq!(err, SchedulingError::TraversalLimitExceeded { limit: 1 });
    }

    #[test]
    fn test_cycle_detected() {
        let mut a = placed("a", "f1", 9);
        a.winner_next_id = Some("b".into());
        a.previous_left_id = Some("b".into());
        let mut b = placed("b", "f1", 10);
        b.winner_next_id = Some("a".into());
        b.previous_left_id = Some("a".into());
        let mut t = table(vec![a, b]);
        let err = assign_match_ids(&mut t, &SchedulerConfig::default()).unwrap_err();
        assert!(matches!(err, SchedulingError::CyclicMatchGraph { .. }));
    }

    #[test]
    fn test_restore_identities_swaps_and_relinks() {
        let mut x = placed("x", "f1", 9);
        x.match_id = Some(1);
        x.winner_next_id = Some("y".into());
        let mut y = placed("y", "f1", 10);
        y.match_id = Some(2);
        y.previous_left_id = Some("x".into());
        let mut t = table(vec![x, y]);

        let previous = BTreeMap::from([(1, "y".to_string()), (2, "x".to_string())]);
        restore_identities(&mut t, &previous);
        assert_eq!(t["y"].match_id, Some(1));
        assert_eq!(t["y"].winner_next_id.as_deref(), Some("x"));
        assert_eq!(t["x"].previous_left_id.as_deref(), Some("y"));
    }

    #[test]
    fn test_restore_identities_skips_taken_ids() {
        let mut x = placed("x", "f1", 9);
        x.match_id = Some(1);
        let mut y = placed("y", "f1", 10);
        y.match_id = Some(3);
        let mut t = table(vec![x, y]);

        // 1 used to be "y", but "y" is still held by an unrenamed match.
        let previous = BTreeMap::from([(1, "y".to_string())]);
        restore_identities(&mut t, &previous);
        assert!(t.contains_key("x"));
        assert!(t.contains_key("y"));
        assert_eq!(identity_map(&t).get(&1).map(String::as_str), Some("x"));
    }
}

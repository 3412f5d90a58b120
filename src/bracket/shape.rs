//! Winners-bracket tree and seeding.
//!
//! # Algorithm
//!
//! With `n` teams the bracket has `r = ceil(log2 n)` rounds and
//! `b = 2^r - n` first-round byes. The tree is grown top-down from the
//! final with an explicit work stack. Each frame is a subtree with `r`
//! rounds and `b` byes, attached to one input slot of its parent:
//!
//! | Frame | Result |
//! |-------|--------|
//! | `r = 1, b = 0` | leaf match, two seeded teams |
//! | `r = 1, b = 1` | bye: one team enters the parent slot directly |
//! | `b = 2^(r-1)` | collapses to a full `(r-1, 0)` subtree |
//! | otherwise | a match whose children split `b` (ceil to the frame's own side) |
//!
//! Bye slots take the best seeds in depth-first order; leaf matches pair
//! the remaining teams outside-in (best vs worst).
//!
//! # Byes
//!
//! `b` is the classic power-of-two count. The remainder form
//! `rem - rem mod (2^p - 1)` with `rem = n - 2^floor(log2 n)` is not used:
//! it gives zero byes for 6 teams, which leaves two teams without an
//! opponent. With `2^r - n` every bracket closes, so single elimination
//! always has `n - 1` matches.

use tracing::debug;

use super::numbering::MatchIdGen;
use crate::error::{Result, SchedulingError};
use crate::models::{Match, MatchSide, MatchTable, Team};

#[derive(Debug, Clone)]
struct Frame {
    parent: Option<(String, MatchSide)>,
    rounds: u32,
    byes: usize,
    side: MatchSide,
    depth: usize,
}

/// A winners bracket before scheduling.
#[derive(Debug, Clone, Default)]
pub struct BracketShape {
    /// Matches keyed by id.
    pub matches: MatchTable,
    /// Ids in creation order (the final first).
    pub created: Vec<String>,
    /// The final.
    pub root: Option<String>,
}

/// Rounds and first-round byes for `n` teams.
pub fn bracket_size(n: usize) -> (u32, usize) {
    let slots = n.max(1).next_power_of_two();
    (slots.trailing_zeros(), slots - n.max(1))
}

/// Builds the winners bracket for `teams` (best seed first).
pub fn build_shape(
    division_id: &str,
    teams: &[&Team],
    ids: &mut MatchIdGen,
    max_depth: usize,
) -> Result<BracketShape> {
    let (rounds, byes) = bracket_size(teams.len());
    let mut shape = BracketShape::default();
    let mut bye_slots: Vec<(String, MatchSide)> = Vec::new();
    let mut leaves: Vec<String> = Vec::new();

    let mut stack = vec![Frame {
        parent: None,
        rounds,
        byes,
        side: MatchSide::Left,
        depth: 0,
    }];

    while let Some(frame) = stack.pop() {
        if frame.depth > max_depth {
            return Err(SchedulingError::BracketDepthExceeded { limit: max_depth });
        }
        if frame.rounds <= 1 && frame.byes >= 1 {
            if let Some(slot) = frame.parent {
                bye_slots.push(slot);
            }
            continue;
        }
        if frame.rounds > 1 && frame.byes == 1usize << (frame.rounds - 1) {
            stack.push(Frame {
                rounds: frame.rounds - 1,
                byes: 0,
                depth: frame.depth + 1,
                ..frame
            });
            continue;
        }

        let id = ids.next_id();
        let mut m = Match::new(id.clone(), division_id);
        if let Some((parent_id, slot)) = &frame.parent {
            m.winner_next_id = Some(parent_id.clone());
            m.side = Some(*slot);
            if let Some(parent) = shape.matches.get_mut(parent_id) {
                parent.set_previous(*slot, Some(id.clone()));
            }
        } else {
            shape.root = Some(id.clone());
        }
        shape.matches.insert(id.clone(), m);
        shape.created.push(id.clone());

        if frame.rounds <= 1 {
            leaves.push(id);
            continue;
        }

        let (big, small) = (frame.byes.div_ceil(2), frame.byes / 2);
        let (left_byes, right_byes) = match frame.side {
            MatchSide::Left => (big, small),
            MatchSide::Right => (small, big),
        };
        // Right first so the left subtree is expanded first.
        for (side, child_byes) in [(MatchSide::Right, right_byes), (MatchSide::Left, left_byes)] {
            stack.push(Frame {
                parent: Some((id.clone(), side)),
                rounds: frame.rounds - 1,
                byes: child_byes,
                side,
                depth: frame.depth + 1,
            });
        }
    }

    seed(&mut shape, division_id, teams, &bye_slots, &leaves)?;
    debug!(
        division = division_id,
        teams = teams.len(),
        matches = shape.matches.len(),
        byes = bye_slots.len(),
        "winners bracket built"
    );
    Ok(shape)
}

fn seed(
    shape: &mut BracketShape,
    division_id: &str,
    teams: &[&Team],
    bye_slots: &[(String, MatchSide)],
    leaves: &[String],
) -> Result<()> {
    let (bye_teams, remaining) = teams.split_at(bye_slots.len().min(teams.len()));
    for ((match_id, side), team) in bye_slots.iter().zip(bye_teams) {
        if let Some(m) = shape.matches.get_mut(match_id) {
            m.set_team(*side, Some(team.id.clone()));
        }
    }

    let n = remaining.len();
    for (i, leaf) in leaves.iter().enumerate() {
        let opponent = n.checked_sub(i + 1).filter(|&j| j > i).ok_or_else(|| {
            SchedulingError::NotEnoughTeamsAtLeaf {
                division: division_id.to_string(),
                remaining: n.saturating_sub(2 * i),
            }
        })?;
        if let Some(m) = shape.matches.get_mut(leaf) {
            m.team1_id = Some(remaining[i].id.clone());
            m.team2_id = Some(remaining[opponent].id.clone());
        }
    }
    Ok(())
}

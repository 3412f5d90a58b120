//! Official and team-referee assignment.
//!
//! Runs after placement. Matches are visited in (start, end, field) order.
//! For each one, the candidates are the officials covering its division
//! (and, with team referees enabled, the other teams of its division) that
//! have no booking overlapping the match. Candidates are drawn round-robin
//! from a rotation cursor per pool instead of always taking the first free
//! one, so the load spreads evenly.

use std::collections::HashMap;
use tracing::debug;

use crate::models::{Event, Match, Team};
use crate::scheduler::Scheduler;

const OFFICIAL_POOL: &str = "\u{0}officials";

/// Rotation cursors, one per candidate pool.
#[derive(Debug, Clone, Default)]
pub struct RefereeRotation {
    cursors: HashMap<String, usize>,
}

impl RefereeRotation {
    /// Creates a rotation with every cursor at the start.
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks the next eligible candidate of `pool` after the last pick.
    pub fn pick<'a>(
        &mut self,
        pool: &str,
        candidates: &[&'a str],
        eligible: impl Fn(&str) -> bool,
    ) -> Option<&'a str> {
        if candidates.is_empty() {
            return None;
        }
        let cursor = self.cursors.entry(pool.to_string()).or_insert(0);
        let n = candidates.len();
        let found = (0..n)
            .map(|offset| (*cursor + offset) % n)
            .find(|&i| eligible(candidates[i]))?;
        *cursor = (found + 1) % n;
        Some(candidates[found])
    }
}

/// Assigns officials and team referees to the matches selected by `only`.
///
/// Existing bookings in `scheduler` are respected and every new assignment
/// is booked there too. Matches without a time are skipped.
pub fn assign_referees(
    event: &mut Event,
    scheduler: &mut Scheduler,
    rotation: &mut RefereeRotation,
    only: impl Fn(&Match) -> bool,
) {
    let mut order: Vec<&Match> = event
        .matches
        .values()
        .filter(|m| m.window().is_some() && only(m))
        .collect();
    order.sort_by(|a, b| a.chronological_key().cmp(&b.chronological_key()));
    let keys: Vec<String> = order.into_iter().map(|m| m.id.clone()).collect();

    let officials: Vec<(String, Vec<String>)> = event
        .officials
        .iter()
        .map(|o| (o.id.clone(), o.division_ids.clone()))
        .collect();
    let mut referee_pools: HashMap<String, Vec<String>> = HashMap::new();
    if event.team_referees {
        for division in event.division_ids() {
            let pool = event
                .teams_in_division(&division)
                .into_iter()
                .filter(|t| !t.placeholder)
                .map(|t: &Team| t.id.clone())
                .collect();
            referee_pools.insert(division, pool);
        }
    }

    for key in keys {
        let Some(m) = event.matches.get_mut(&key) else { continue };
        let Some(window) = m.window() else { continue };

        let covering: Vec<&str> = officials
            .iter()
            .filter(|(_, divs)| divs.is_empty() || divs.iter().any(|d| *d == m.division_id))
            .map(|(id, _)| id.as_str())
            .collect();
        let official = rotation.pick(OFFICIAL_POOL, &covering, |id| {
            scheduler.is_participant_free(id, &window)
        });
        m.official_id = official.map(str::to_string);
        if let Some(id) = official {
            scheduler.book_participant(id, &key, window);
        } else if !covering.is_empty() {
            debug!(match_id = %key, "no official available");
        }

        if !m.has_both_teams() {
            continue;
        }
        let Some(pool) = referee_pools.get(&m.division_id) else { continue };
        let candidates: Vec<&str> = pool.iter().map(String::as_str).collect();
        let playing: Vec<String> = m.team_ids().map(str::to_string).collect();
        let referee = rotation.pick(&m.division_id, &candidates, |id| {
            !playing.iter().any(|p| p == id) && scheduler.is_participant_free(id, &window)
        });
        m.team_referee_id = referee.map(str::to_string);
        if let Some(id) = referee {
            scheduler.book_participant(id, &key, window);
        }
    }
}

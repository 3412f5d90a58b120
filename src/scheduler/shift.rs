//! Cascading reschedule after a match's actual end changes.
//!
//! # Algorithm
//!
//! Starting from the changed match, visit its dependants and the next match
//! on the same field (by the ordering at entry). For each visited match the
//! required start is
//! `max(dependency end + dependency buffer, field predecessor end)`,
//! rounded up to the granularity:
//! - later than its start: push it later;
//! - earlier than its start and it is a dependant of the changed match:
//!   pull it earlier to the required start;
//! - field neighbours are never pulled earlier.
//!
//! Every moved match is visited in turn. Locked and unscheduled matches
//! are left alone. The walk is bounded by `max_traversal` visits.

use std::collections::{BTreeSet, HashMap, VecDeque};
use tracing::debug;

use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulingError};
use crate::models::{add_ms, round_up, DependencyGraph, Match, MatchTable, Schedulable};

/// Moves a match by `delta_ms`, keeping its duration.
pub fn shift_times(m: &mut Match, delta_ms: i64) {
    if let Some(w) = m.window() {
        let w = w.shifted(delta_ms);
        m.start = Some(w.start);
        m.end = Some(w.end);
    }
}

/// Field neighbours as (previous, next) per match id, in start order.
fn field_neighbours(matches: &MatchTable) -> HashMap<String, (Option<String>, Option<String>)> {
    let mut lanes: HashMap<&str, Vec<&Match>> = HashMap::new();
    for m in matches.values().filter(|m| m.is_scheduled()) {
        if let Some(field) = m.field_id.as_deref() {
            lanes.entry(field).or_default().push(m);
        }
    }
    let mut out = HashMap::new();
    for lane in lanes.values_mut() {
        lane.sort_by(|a, b| a.chronological_key().cmp(&b.chronological_key()));
        for (i, m) in lane.iter().enumerate() {
            let prev = i.checked_sub(1).map(|p| lane[p].id.clone());
            let next = lane.get(i + 1).map(|n| n.id.clone());
            out.insert(m.id.clone(), (prev, next));
        }
    }
    out
}

/// Propagates a change of `key`'s times to everything after it.
///
/// Returns the ids of moved matches, in the order they were moved.
pub fn reschedule_following_events(
    matches: &mut MatchTable,
    key: &str,
    config: &SchedulerConfig,
) -> Result<Vec<String>> {
    if !matches.contains_key(key) {
        return Err(SchedulingError::UnknownMatch(key.to_string()));
    }
    let neighbours = field_neighbours(matches);
    let mut moved: Vec<String> = Vec::new();
    let mut moved_set: BTreeSet<String> = BTreeSet::new();
    let mut queue: VecDeque<String> = VecDeque::from([key.to_string()]);
    let mut visits = 0usize;

    while let Some(current) = queue.pop_front() {
        visits += 1;
        if visits > config.max_traversal {
            return Err(SchedulingError::TraversalLimitExceeded {
                limit: config.max_traversal,
            });
        }

        let dependants: Vec<String> = matches
            .dependants(&current)
            .iter()
            .map(|m| m.key().to_string())
            .collect();
        let field_next = neighbours.get(&current).and_then(|(_, next)| next.clone());

        let mut visit: Vec<(String, bool)> = dependants.into_iter().map(|d| (d, true)).collect();
        if let Some(next) = field_next {
            if !visit.iter().any(|(d, _)| *d == next) {
                visit.push((next, false));
            }
        }

        for (candidate, may_pull) in visit {
            let Some(m) = matches.get(&candidate) else { continue };
            if m.locked {
                continue;
            }
            let Some(window) = m.window() else { continue };

            let dep_ready = matches
                .dependencies(&candidate)
                .iter()
                .filter_map(|d| d.window().map(|w| add_ms(w.end, d.buffer_ms())))
                .max();
            let field_ready = neighbours
                .get(&candidate)
                .and_then(|(prev, _)| prev.as_ref())
                .and_then(|p| matches.get(p))
                .and_then(|p| p.end);
            let Some(required) = dep_ready.max(field_ready) else { continue };
            let required = round_up(required, config.granularity_minutes);

            let delta = (required - window.start).num_milliseconds();
            if delta == 0 || (delta < 0 && !may_pull) {
                continue;
            }
            if let Some(m) = matches.get_mut(&candidate) {
                shift_times(m, delta);
                debug!(match_id = %candidate, delta_ms = delta, "shifted");
            }
            if moved_set.insert(candidate.clone()) {
                moved.push(candidate.clone());
            }
            queue.push_back(candidate);
        }
    }
    Ok(moved)
}

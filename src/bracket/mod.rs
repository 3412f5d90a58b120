//! Bracket Builder: elimination trees, scheduled in advance.
//!
//! Builds a single- or double-elimination match graph per division and
//! places every node, including matches whose teams are still unknown, so
//! times and fields are published before the first result comes in.
//!
//! # Algorithm
//!
//! 1. Winners tree with byes ([`shape`]).
//! 2. Losers bracket, grand final and optional reset ([`losers`]).
//! 3. Placement in dependency order: Kahn's algorithm, ready matches
//!    ordered by (level, creation order), each placed by the shared
//!    [`Scheduler`].
//! 4. Chronological numbering once every division is placed ([`numbering`]).
//!
//! Divisions with fewer than 3 teams get no bracket.
//!
//! # Reference
//! Kahn (1962), "Topological sorting of large networks"

pub mod losers;
pub mod numbering;
pub mod shape;

pub use losers::{wire_double_elimination, LosersWiring};
pub use numbering::{assign_match_ids, identity_map, restore_identities, MatchIdGen};
pub use shape::{bracket_size, build_shape, BracketShape};

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use tracing::{info, warn};

use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulingError};
use crate::models::{Event, MatchTable, Team, TournamentOptions};
use crate::scheduler::Scheduler;

/// Smallest division that gets a bracket.
pub const MIN_BRACKET_TEAMS: usize = 3;

/// Builds and places the bracket for one division.
///
/// Returns the division's matches; the caller merges them into the event.
pub fn build_division_bracket(
    event: &Event,
    division_id: &str,
    options: &TournamentOptions,
    scheduler: &mut Scheduler,
    ids: &mut MatchIdGen,
    config: &SchedulerConfig,
) -> Result<MatchTable> {
    let teams: Vec<&Team> = event.teams_in_division(division_id);
    if teams.len() < MIN_BRACKET_TEAMS {
        warn!(division = division_id, teams = teams.len(), "division skipped: too few teams");
        return Ok(MatchTable::new());
    }

    let mut shape = build_shape(division_id, &teams, ids, config.max_bracket_depth)?;
    if options.double_elimination {
        wire_double_elimination(&mut shape, division_id, ids, options.bracket_reset)?;
    }

    let rules = &event.rules;
    for m in shape.matches.values_mut() {
        let sets = if m.losers_bracket {
            options.loser_set_count
        } else {
            options.winner_set_count
        };
        let slots = rules.score_slots(sets);
        m.team1_points = vec![0; slots];
        m.team2_points = vec![0; slots];
        m.buffer_ms = rules.rest_ms();
    }

    let order = placement_order(&shape)?;
    let mut matches = shape.matches;
    for id in order {
        let sets = match matches.get(&id) {
            Some(m) if m.losers_bracket => options.loser_set_count,
            Some(_) => options.winner_set_count,
            None => continue,
        };
        let placement = scheduler.schedule_event(&matches, &id, rules.duration_ms(sets))?;
        if let Some(m) = matches.get_mut(&id) {
            m.place(placement.field_id, placement.window);
            for team in m.team_ids() {
                scheduler.book_participant(team, &m.id, placement.window);
            }
        }
    }

    info!(
        division = division_id,
        teams = teams.len(),
        matches = matches.len(),
        double_elimination = options.double_elimination,
        "bracket scheduled"
    );
    Ok(matches)
}

/// Builds every division's bracket on a shared scheduler.
pub fn build_tournament(
    event: &Event,
    options: &TournamentOptions,
    scheduler: &mut Scheduler,
    ids: &mut MatchIdGen,
    config: &SchedulerConfig,
) -> Result<MatchTable> {
    let mut all = MatchTable::new();
    for division in event.division_ids() {
        all.extend(build_division_bracket(event, &division, options, scheduler, ids, config)?);
    }
    Ok(all)
}

/// Topological order, ready matches by (level, creation order).
fn placement_order(shape: &BracketShape) -> Result<Vec<String>> {
    let seq: HashMap<&str, usize> = shape
        .created
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();
    let distinct_deps = |id: &str| -> Vec<String> {
        let mut deps: Vec<String> = shape
            .matches
            .get(id)
            .map(|m| m.dependency_ids().map(str::to_string).collect())
            .unwrap_or_default();
        deps.dedup();
        deps
    };

    let mut pending: HashMap<&str, usize> = HashMap::new();
    let mut level: HashMap<String, usize> = HashMap::new();
    let mut ready = BinaryHeap::new();
    for id in &shape.created {
        let n = distinct_deps(id.as_str()).len();
        pending.insert(id.as_str(), n);
        if n == 0 {
            ready.push(Reverse((0usize, seq[id.as_str()], id.clone())));
        }
    }

    let mut order = Vec::with_capacity(shape.created.len());
    while let Some(Reverse((lvl, _, id))) = ready.pop() {
        level.insert(id.clone(), lvl);
        if let Some(m) = shape.matches.get(&id) {
            for next in m.dependant_ids() {
                let Some(count) = pending.get_mut(next) else { continue };
                *count -= 1;
                if *count == 0 {
                    let next_level = distinct_deps(next)
                        .iter()
                        .filter_map(|d| level.get(d))
                        .max()
                        .map_or(0, |l| l + 1);
                    ready.push(Reverse((next_level, seq[next], next.to_string())));
                }
            }
        }
        order.push(id);
    }

    if order.len() < shape.created.len() {
        let stuck = shape
            .created
            .iter()
            .find(|id| !level.contains_key(*id))
            .cloned()
            .unwrap_or_default();
        return Err(SchedulingError::CyclicMatchGraph { match_id: stuck });
    }
    Ok(order)
}

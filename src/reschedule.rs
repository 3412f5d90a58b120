//! Locked-Preserving Rescheduler.
//!
//! Replans every unlocked match of an event while locked matches keep
//! their id, time, field and officials. Used when event parameters change
//! after some matches were played or pinned by hand.
//!
//! # Algorithm
//!
//! 1. A fresh [`Scheduler`] for the event's current window and slots.
//! 2. Locked matches are committed to their recorded fields and their
//!    participants booked.
//! 3. Unlocked matches are unscheduled, then placed in dependency-ready
//!    order: a match is ready once none of its dependencies are still
//!    pending. Ready ties go to the smallest (match number, start, end, id)
//!    as recorded before the pass. If nothing is ready, the smallest pending
//!    match is forced so the pass always terminates.
//! 4. Officials and team referees are reassigned for unlocked matches.
//! 5. Locked matches that no longer fit are reported as warnings, then the
//!    event end is extended to the latest match.
//!
//! Chronological numbers are left as they were, so printed schedules keep
//! their references.

use chrono::NaiveDateTime;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

use crate::builder::{assign_referees, check_setup, RefereeRotation};
use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulingError};
use crate::models::{Event, EventKind, Match, ScheduleWarning};
use crate::scheduler::Scheduler;
use crate::validation;

type ReadyKey = (Option<u32>, Option<NaiveDateTime>, Option<NaiveDateTime>, String);

/// Replans unlocked matches around locked ones.
///
/// Returns warnings for locked matches that fall outside the event window
/// or the configured time slots; those never fail the pass.
pub fn reschedule_event_matches_preserving_locks(
    event: &mut Event,
    config: &SchedulerConfig,
) -> Result<Vec<ScheduleWarning>> {
    check_setup(event)?;
    validation::validate_event(event).map_err(SchedulingError::Validation)?;

    let mut scheduler = Scheduler::for_event(event, config)?;
    for m in event.matches.values().filter(|m| m.locked) {
        let (Some(field), Some(window)) = (m.field_id.as_deref(), m.window()) else {
            continue;
        };
        if !scheduler.commit(field, &m.id, window) {
            debug!(match_id = %m.id, field, "locked match on unknown field");
        }
        let participants = m
            .team_ids()
            .chain(m.official_id.as_deref())
            .chain(m.team_referee_id.as_deref());
        for p in participants {
            scheduler.book_participant(p, &m.id, window);
        }
    }

    let mut snapshot: HashMap<String, (ReadyKey, Option<i64>)> = HashMap::new();
    for m in event.matches.values_mut().filter(|m| !m.locked) {
        let key = (m.match_id, m.start, m.end, m.id.clone());
        snapshot.insert(m.id.clone(), (key, m.duration_ms()));
        m.unschedule();
        m.official_id = None;
        m.team_referee_id = None;
    }

    let mut pending: BTreeSet<String> = snapshot.keys().cloned().collect();
    while !pending.is_empty() {
        let is_ready = |id: &String| {
            event
                .matches
                .get(id)
                .map_or(true, |m| m.dependency_ids().all(|d| !pending.contains(d)))
        };
        let by_key = |id: &&String| snapshot.get(*id).map(|(key, _)| key.clone());
        let next = match pending.iter().filter(|id| is_ready(id)).min_by_key(by_key) {
            Some(id) => id.clone(),
            None => {
                let Some(forced) = pending.iter().min_by_key(by_key).cloned() else { break };
                warn!(match_id = %forced, "no ready match; forcing placement");
                forced
            }
        };
        pending.remove(&next);

        let duration = snapshot
            .get(&next)
            .and_then(|(_, d)| *d)
            .or_else(|| event.matches.get(&next).map(|m| planned_duration_ms(event, m)))
            .unwrap_or_else(|| event.rules.duration_ms(1));
        let placement = scheduler.schedule_event(&event.matches, &next, duration)?;
        if let Some(m) = event.matches.get_mut(&next) {
            m.place(placement.field_id, placement.window);
            for team in m.team_ids() {
                scheduler.book_participant(team, &m.id, placement.window);
            }
        }
    }

    assign_referees(event, &mut scheduler, &mut RefereeRotation::new(), |m| !m.locked);

    let warnings = locked_warnings(event, &scheduler);
    for w in &warnings {
        warn!(match_id = %w.match_id, kind = ?w.kind, "{}", w.message);
    }
    event.extend_end_to_matches();
    info!(
        event = %event.id,
        replanned = snapshot.len(),
        warnings = warnings.len(),
        "rescheduled around locked matches"
    );
    Ok(warnings)
}

/// Planned duration from the event rules and the match's bracket.
fn planned_duration_ms(event: &Event, m: &Match) -> i64 {
    let sets = match &event.kind {
        EventKind::Tournament(t) if m.losers_bracket => t.loser_set_count,
        EventKind::Tournament(t) => t.winner_set_count,
        EventKind::League(l) if m.losers_bracket => l.playoffs.loser_set_count,
        EventKind::League(l) if m.dependency_ids().next().is_some() || m.winner_next_id.is_some() => {
            l.playoffs.winner_set_count
        }
        EventKind::League(_) => 1,
    };
    event.rules.duration_ms(sets)
}

fn locked_warnings(event: &Event, scheduler: &Scheduler) -> Vec<ScheduleWarning> {
    let mut warnings = Vec::new();
    for m in event.matches.values().filter(|m| m.locked) {
        let (Some(field), Some(window)) = (m.field_id.as_deref(), m.window()) else {
            warnings.push(ScheduleWarning::unscheduled(
                &m.id,
                format!("Locked match '{}' has no time or field", m.id),
            ));
            continue;
        };
        if window.start < event.start || window.end > event.end {
            warnings.push(ScheduleWarning::outside_event_window(
                &m.id,
                format!(
                    "Locked match '{}' ({} - {}) is outside the event window ({} - {})",
                    m.id, window.start, window.end, event.start, event.end
                ),
            ));
        }
        if !scheduler.slot_covers(field, &m.division_id, &window) {
            warnings.push(ScheduleWarning::outside_time_slots(
                &m.id,
                format!(
                    "Locked match '{}' on field '{}' at {} is not covered by any time slot",
                    m.id, field, window.start
                ),
            ));
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_event_schedule;
    use crate::models::{
        add_ms, Field, LeagueOptions, MatchTable, Team, TimeSlot, TournamentOptions,
        WarningKind,
    };
    use chrono::{Datelike, NaiveDate, TimeDelta};

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn built_tournament() -> Event {
        let mut e = Event::new(
            "cup",
            EventKind::Tournament(TournamentOptions::double_elimination(false)),
            at(3, 9),
            at(3, 18),
        )
        .with_field(Field::new("f1", 1))
        .with_field(Field::new("f2", 2));
        for i in 0..6 {
            e = e.with_team(Team::new(format!("t{}", i + 1), i + 1, "open"));
        }
        build_event_schedule(&mut e, &SchedulerConfig::default()).unwrap();
        e
    }

    fn by_number(e: &Event, n: u32) -> String {
        e.matches.values().find(|m| m.match_id == Some(n)).unwrap().id.clone()
    }

    fn assert_consistent(matches: &MatchTable) {
        for m in matches.values() {
            let w = m.window().unwrap();
            for dep in m.dependency_ids() {
                let d = &matches[dep];
                assert!(add_ms(d.end.unwrap(), d.buffer_ms) <= w.start || m.locked || d.locked);
            }
            for other in matches.values().filter(|o| o.id != m.id && o.field_id == m.field_id) {
                assert!(!w.overlaps(&other.window().unwrap()), "{} overlaps {}", m.id, other.id);
            }
        }
    }

    #[test]
    fn test_locked_matches_untouched() {
        let mut e = built_tournament();
        let locked = [by_number(&e, 1), by_number(&e, 2)];
        for id in &locked {
            e.matches.get_mut(id).unwrap().locked = true;
        }
        let before: Vec<Match> = locked.iter().map(|id| e.matches[id].clone()).collect();

        let warnings = reschedule_event_matches_preserving_locks(&mut e, &SchedulerConfig::default()).unwrap();
        assert!(warnings.is_empty());
        for m in &before {
            assert_eq!(&e.matches[&m.id], m);
        }
        assert!(e.matches.values().all(|m| m.is_scheduled()));
        assert_consistent(&e.matches);
    }

    #[test]
    fn test_start_moved_later() {
        let mut e = built_tournament();
        let first = by_number(&e, 1);
        e.matches.get_mut(&first).unwrap().locked = true;
        e.start = at(4, 9);
        e.end = at(4, 18);

        let warnings = reschedule_event_matches_preserving_locks(&mut e, &SchedulerConfig::default()).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::OutsideEventWindow);
        assert_eq!(warnings[0].match_id, first);

        for m in e.matches.values().filter(|m| !m.locked) {
            assert!(m.start.unwrap() >= at(4, 9));
        }
        assert_eq!(e.matches[&first].start, Some(at(3, 9)));
        assert!(e.end >= e.latest_match_end().unwrap());
        assert_consistent(&e.matches);
    }

    #[test]
    fn test_match_numbers_kept() {
        let mut e = built_tournament();
        let numbers: Vec<(String, Option<u32>)> = e.matches.values().map(|m| (m.id.clone(), m.match_id)).collect();
        e.start = at(3, 12);
        reschedule_event_matches_preserving_locks(&mut e, &SchedulerConfig::default()).unwrap();
        for (id, n) in numbers {
            assert_eq!(e.matches[&id].match_id, n);
        }
    }

    #[test]
    fn test_repeated_runs_keep_locks() {
        let mut e = built_tournament();
        for n in [1, 3, 5] {
            let id = by_number(&e, n);
            e.matches.get_mut(&id).unwrap().locked = true;
        }
        reschedule_event_matches_preserving_locks(&mut e, &SchedulerConfig::default()).unwrap();
        let once = e.matches.clone();
        reschedule_event_matches_preserving_locks(&mut e, &SchedulerConfig::default()).unwrap();
        for (id, m) in once.iter().filter(|(_, m)| m.locked) {
            assert_eq!(&e.matches[id], m);
        }
    }

    #[test]
    fn test_slot_and_unscheduled_warnings() {
        let mut e = Event::new(
            "league",
            EventKind::League(LeagueOptions::default()),
            at(3, 0),
            at(3, 0),
        )
        .with_field(Field::new("f1", 1))
        .with_time_slot(TimeSlot::weekly("mon", 0, 18 * 60, 22 * 60));
        for i in 0..4 {
            e = e.with_team(Team::new(format!("t{}", i + 1), i + 1, "open"));
        }
        build_event_schedule(&mut e, &SchedulerConfig::default()).unwrap();

        let pinned = by_number(&e, 1);
        let floating = by_number(&e, 6);
        e.matches.get_mut(&pinned).unwrap().locked = true;
        let f = e.matches.get_mut(&floating).unwrap();
        f.locked = true;
        f.unschedule();
        // Availability moves to Tuesdays.
        e.time_slots = vec![TimeSlot::weekly("tue", 1, 18 * 60, 22 * 60)];

        let warnings = reschedule_event_matches_preserving_locks(&mut e, &SchedulerConfig::default()).unwrap();
        let kinds: Vec<(&str, &WarningKind)> = warnings.iter().map(|w| (w.match_id.as_str(), &w.kind)).collect();
        assert!(kinds.contains(&(pinned.as_str(), &WarningKind::OutsideTimeSlots)));
        assert!(kinds.contains(&(floating.as_str(), &WarningKind::Unscheduled)));
        for m in e.matches.values().filter(|m| !m.locked) {
            let start = m.start.unwrap();
            assert_eq!(start.date().weekday(), chrono::Weekday::Tue);
            assert!(start >= at(3, 0) + TimeDelta::hours(18));
        }
    }

    #[test]
    fn test_locked_final_keeps_feeders_scheduled() {
        let mut e = built_tournament();
        let last = by_number(&e, e.matches.len() as u32);
        e.matches.get_mut(&last).unwrap().locked = true;
        reschedule_event_matches_preserving_locks(&mut e, &SchedulerConfig::default()).unwrap();
        assert!(e.matches.values().all(|m| m.is_scheduled()));
    }

    #[test]
    fn test_league_teams_never_double_booked() {
        let mut e = Event::new(
            "league",
            EventKind::League(LeagueOptions::default()),
            at(3, 0),
            at(3, 0),
        )
        .with_field(Field::new("f1", 1))
        .with_field(Field::new("f2", 2))
        .with_field(Field::new("f3", 3))
        .with_time_slot(TimeSlot::weekly("mon", 0, 18 * 60, 22 * 60));
        for i in 0..4 {
            e = e.with_team(Team::new(format!("t{}", i + 1), i + 1, "open"));
        }
        build_event_schedule(&mut e, &SchedulerConfig::default()).unwrap();
        reschedule_event_matches_preserving_locks(&mut e, &SchedulerConfig::default()).unwrap();

        let all: Vec<&Match> = e.matches.values().collect();
        assert_eq!(all.len(), 6);
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                if a.team_ids().any(|t| b.involves_team(t)) {
                    assert!(
                        !a.window().unwrap().overlaps(&b.window().unwrap()),
                        "{} and {} share a team at the same time",
                        a.id,
                        b.id
                    );
                }
            }
        }
    }
}

//! Event Builder: full schedule generation for leagues and tournaments.
//!
//! # Pipeline
//!
//! 1. Setup checks (fields, league time slots) and input validation.
//! 2. Placeholder teams fill any shortfall against `max_participants`.
//! 3. Tournaments: one bracket per division ([`crate::bracket`]).
//!    Leagues: round robin per division, scheduled round by round; the
//!    clock moves past each round's last end plus rest, so rounds never
//!    interleave. Optional playoffs follow on an isolated copy of the event.
//! 4. Officials and team referees ([`referees`]).
//! 5. Chronological numbering, with ids of previously numbered matches
//!    restored so persisted rows are updated in place.
//! 6. Placeholders are stripped and the event end is extended to cover
//!    every match.
//!
//! Rebuilding the same input produces the same schedule.

pub mod referees;
pub mod round_robin;

pub use referees::{assign_referees, RefereeRotation};
pub use round_robin::{round_robin_rounds, Round};

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::bracket::{self, MatchIdGen};
use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulingError};
use crate::models::{add_ms, Event, EventKind, LeagueOptions, Match, MatchTable, Team};
use crate::scheduler::Scheduler;
use crate::validation;

/// Division used for placeholders when the event declares none.
pub const DEFAULT_DIVISION: &str = "default";

/// Checks that an event can be scheduled at all.
pub fn check_setup(event: &Event) -> Result<()> {
    if event.fields.is_empty() {
        return Err(SchedulingError::NoFieldsConfigured);
    }
    if event.is_league() && event.time_slots.is_empty() {
        return Err(SchedulingError::NoRecurringTimeSlots);
    }
    Ok(())
}

/// Generates every match of `event` from scratch.
///
/// Existing matches are replaced. Matches whose chronological number
/// already existed keep their previous id.
pub fn build_event_schedule(event: &mut Event, config: &SchedulerConfig) -> Result<()> {
    check_setup(event)?;
    // Matches about to be replaced may reference removed teams or fields.
    let replaced = std::mem::take(&mut event.matches);
    if let Err(errors) = validation::validate_event(event) {
        event.matches = replaced;
        return Err(SchedulingError::Validation(errors));
    }
    let previous = bracket::identity_map(&replaced);

    add_placeholders(event);
    if event.teams.len() < 2 {
        return Err(SchedulingError::NotEnoughParticipants {
            found: event.teams.len(),
        });
    }

    let mut scheduler = Scheduler::for_event(event, config)?;
    let mut ids = MatchIdGen::new(&event.id, "match");
    let matches = match event.kind.clone() {
        EventKind::Tournament(options) => {
            bracket::build_tournament(event, &options, &mut scheduler, &mut ids, config)?
        }
        EventKind::League(options) => {
            let mut season = schedule_league(event, &options, &mut scheduler, &mut ids)?;
            if options.include_playoffs && options.playoff_team_count > 1 {
                let playoffs = schedule_playoffs(event, &options, &mut scheduler, config)?;
                season.extend(playoffs);
            }
            season
        }
    };
    event.matches = matches;

    assign_referees(event, &mut scheduler, &mut RefereeRotation::new(), |_| true);
    bracket::assign_match_ids(&mut event.matches, config)?;
    bracket::restore_identities(&mut event.matches, &previous);
    strip_placeholders(event);
    event.extend_end_to_matches();

    if let Some(match_id) = validation::find_cycle(&event.matches) {
        return Err(SchedulingError::CyclicMatchGraph { match_id });
    }
    info!(
        event = %event.id,
        matches = event.matches.len(),
        end = %event.end,
        "event scheduled"
    );
    Ok(())
}

/// Adds placeholder teams until `max_participants` is reached.
///
/// Each placeholder joins the division with the fewest teams and is seeded
/// after that division's weakest team. Returns the number added.
pub fn add_placeholders(event: &mut Event) -> usize {
    let Some(capacity) = event.max_participants else { return 0 };
    let shortfall = capacity.saturating_sub(event.teams.len());
    if shortfall == 0 {
        return 0;
    }
    let mut divisions = event.division_ids();
    if divisions.is_empty() {
        divisions.push(DEFAULT_DIVISION.to_string());
    }

    let mut index = 0usize;
    for _ in 0..shortfall {
        let Some(division) = divisions
            .iter()
            .min_by_key(|d| event.teams.values().filter(|t| t.division_id == **d).count())
            .cloned()
        else {
            break;
        };
        let seed = event
            .teams
            .values()
            .filter(|t| t.division_id == division)
            .map(|t| t.seed)
            .max()
            .map_or(1, |s| s + 1);
        let mut team = Team::placeholder(index, seed, &division);
        while event.teams.contains_key(&team.id) {
            index += 1;
            team = Team::placeholder(index, seed, &division);
        }
        index += 1;
        event.teams.insert(team.id.clone(), team);
    }
    debug!(event = %event.id, added = shortfall, "placeholder teams added");
    shortfall
}

/// Clears placeholder team slots and removes placeholder teams.
pub fn strip_placeholders(event: &mut Event) {
    let placeholders: Vec<String> = event
        .teams
        .values()
        .filter(|t| t.placeholder)
        .map(|t| t.id.clone())
        .collect();
    if placeholders.is_empty() {
        return;
    }
    let is_placeholder = |id: &Option<String>| id.as_ref().is_some_and(|id| placeholders.contains(id));
    for m in event.matches.values_mut() {
        if is_placeholder(&m.team1_id) {
            m.team1_id = None;
        }
        if is_placeholder(&m.team2_id) {
            m.team2_id = None;
        }
        if is_placeholder(&m.team_referee_id) {
            m.team_referee_id = None;
        }
    }
    for id in &placeholders {
        event.teams.remove(id);
    }
    debug!(event = %event.id, removed = placeholders.len(), "placeholder teams stripped");
}

/// Schedules the regular season, round by round across all divisions.
fn schedule_league(
    event: &Event,
    options: &LeagueOptions,
    scheduler: &mut Scheduler,
    ids: &mut MatchIdGen,
) -> Result<MatchTable> {
    let per_division: Vec<(String, Vec<Round>)> = event
        .division_ids()
        .into_iter()
        .map(|d| {
            let teams: Vec<String> = event.teams_in_division(&d).iter().map(|t| t.id.clone()).collect();
            let rounds = round_robin_rounds(&teams, options.games_per_opponent);
            (d, rounds)
        })
        .collect();
    let round_count = per_division.iter().map(|(_, r)| r.len()).max().unwrap_or(0);

    let rules = &event.rules;
    let duration = rules.duration_ms(1);
    let mut matches = MatchTable::new();
    for round in 0..round_count {
        let mut round_end: Option<NaiveDateTime> = None;
        for (division, rounds) in &per_division {
            let Some(pairings) = rounds.get(round) else { continue };
            for (home, away) in pairings {
                let id = ids.next_id();
                let m = Match::new(id.clone(), division.as_str())
                    .with_teams(Some(home.clone()), Some(away.clone()))
                    .with_buffer_ms(rules.rest_ms())
                    .with_sets(rules.score_slots(1));
                matches.insert(id.clone(), m);

                let placement = scheduler.schedule_event(&matches, &id, duration)?;
                scheduler.book_participant(home, &id, placement.window);
                scheduler.book_participant(away, &id, placement.window);
                round_end = round_end.max(Some(placement.window.end));
                if let Some(m) = matches.get_mut(&id) {
                    m.place(placement.field_id, placement.window);
                }
            }
        }
        if let Some(end) = round_end {
            scheduler.advance_to(add_ms(end, rules.rest_ms()));
            debug!(round = round + 1, end = %end, "league round scheduled");
        }
    }
    Ok(matches)
}

/// Builds the playoff bracket on an isolated copy of the league.
///
/// The copy holds the top `playoff_team_count` teams of each division
/// (re-seeded by standing) and starts no earlier than the end of the
/// regular season. Placed matches are committed to `scheduler` so later
/// passes see them.
fn schedule_playoffs(
    event: &Event,
    options: &LeagueOptions,
    scheduler: &mut Scheduler,
    config: &SchedulerConfig,
) -> Result<MatchTable> {
    let mut playoff = event.clone();
    playoff.kind = EventKind::Tournament(options.playoffs.clone());
    playoff.matches.clear();
    playoff.start = event.start.max(scheduler.current_time());
    playoff.end = playoff.end.max(playoff.start);
    playoff.teams.clear();
    for division in event.division_ids() {
        let mut ranked: Vec<&Team> = event.teams.values().filter(|t| t.division_id == division).collect();
        ranked.sort_by(|a, b| a.standing_cmp(b));
        for (rank, team) in ranked.into_iter().take(options.playoff_team_count).enumerate() {
            let mut seeded = team.clone();
            seeded.seed = rank as u32 + 1;
            playoff.teams.insert(seeded.id.clone(), seeded);
        }
    }

    let mut playoff_scheduler = Scheduler::for_event(&playoff, config)?;
    let mut ids = MatchIdGen::new(&event.id, "playoff");
    let matches = bracket::build_tournament(
        &playoff,
        &options.playoffs,
        &mut playoff_scheduler,
        &mut ids,
        config,
    )?;

    for m in matches.values() {
        if let (Some(field), Some(window)) = (m.field_id.as_deref(), m.window()) {
            scheduler.commit(field, &m.id, window);
            for team in m.team_ids() {
                scheduler.book_participant(team, &m.id, window);
            }
        }
    }
    info!(event = %event.id, matches = matches.len(), start = %playoff.start, "playoffs scheduled");
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Division, Field, LeagueOptions, Official, Schedulable, TimeSlot, TimeWindow, TournamentOptions,
    };
    use chrono::NaiveDate;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn tournament(teams: usize, options: TournamentOptions) -> Event {
        let mut e = Event::new("cup", EventKind::Tournament(options), at(3, 9), at(3, 18))
            .with_field(Field::new("f1", 1))
            .with_field(Field::new("f2", 2));
        for i in 0..teams {
            e = e.with_team(Team::new(format!("t{}", i + 1), i as u32 + 1, "open"));
        }
        e
    }

    fn league(teams: usize, options: LeagueOptions) -> Event {
        let mut e = Event::new("league", EventKind::League(options), at(3, 0), at(3, 0))
            .with_field(Field::new("f1", 1))
            .with_time_slot(TimeSlot::weekly("mon", 0, 18 * 60, 22 * 60));
        for i in 0..teams {
            e = e.with_team(Team::new(format!("t{}", i + 1), i as u32 + 1, "open"));
        }
        e
    }

    fn assert_numbered(e: &Event) {
        let mut sorted: Vec<&Match> = e.matches.values().collect();
        sorted.sort_by(|a, b| a.chronological_key().cmp(&b.chronological_key()));
        let numbers: Vec<u32> = sorted.iter().filter_map(|m| m.match_id).collect();
        let expected: Vec<u32> = (1..=e.matches.len() as u32).collect();
        assert_eq!(numbers, expected);
    }

    #[test]
    fn test_league_without_slots() {
        let mut e = league(4, LeagueOptions::default());
        e.time_slots.clear();
        let err = build_event_schedule(&mut e, &SchedulerConfig::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unable to schedule league because no recurring time slots are configured. Add weekly field availability to continue."
        );
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_no_fields() {
        let mut e = tournament(4, TournamentOptions::default());
        e.fields.clear();
        let err = build_event_schedule(&mut e, &SchedulerConfig::default()).unwrap_err();
        assert_eq!(err, SchedulingError::NoFieldsConfigured);
    }

    #[test]
    fn test_same_day_league_is_extended() {
        let mut e = league(4, LeagueOptions::default());
        let original_end = e.end;
        build_event_schedule(&mut e, &SchedulerConfig::default()).unwrap();
        assert_eq!(e.matches.len(), 6);
        assert!(e.end > original_end);
        assert_numbered(&e);
    }

    #[test]
    fn test_league_rounds_do_not_interleave() {
        let mut e = league(4, LeagueOptions::default()).with_field(Field::new("f2", 2));
        e.rules.rest_time_minutes = 15;
        build_event_schedule(&mut e, &SchedulerConfig::default()).unwrap();

        // Four teams: three rounds of two matches, one round per slot block.
        let mut starts: Vec<NaiveDateTime> = e.matches.values().filter_map(|m| m.start).collect();
        starts.sort();
        starts.dedup();
        assert_eq!(starts, vec![at(3, 18), at(3, 19) + chrono::TimeDelta::minutes(15), at(3, 20) + chrono::TimeDelta::minutes(30)]);
        for team in e.teams.keys() {
            assert_eq!(e.matches_for_team(team).len(), 3);
        }
    }

    #[test]
    fn test_placeholders_stripped() {
        let mut e = tournament(4, TournamentOptions::default());
        e.max_participants = Some(6);
        build_event_schedule(&mut e, &SchedulerConfig::default()).unwrap();

        assert_eq!(e.matches.len(), 5);
        assert_eq!(e.teams.len(), 4);
        assert!(e
            .matches
            .values()
            .flat_map(|m| m.team_ids())
            .all(|t| e.teams.contains_key(t)));
        assert!(e.matches.values().any(|m| m.team_ids().count() < 2));
    }

    #[test]
    fn test_not_enough_participants() {
        let mut e = tournament(1, TournamentOptions::default());
        let err = build_event_schedule(&mut e, &SchedulerConfig::default()).unwrap_err();
        assert_eq!(err, SchedulingError::NotEnoughParticipants { found: 1 });
    }

    #[test]
    fn test_placeholders_go_to_smallest_division() {
        let mut e = tournament(3, TournamentOptions::default())
            .with_division(Division::new("open"))
            .with_division(Division::new("youth"));
        e.max_participants = Some(5);
        assert_eq!(add_placeholders(&mut e), 2);
        assert_eq!(e.teams_in_division("youth").len(), 2);
        let youth = e.teams_in_division("youth");
        assert!(youth.iter().all(|t| t.placeholder));
        assert_eq!(youth[0].name, "Team 1");
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let mut e = tournament(6, TournamentOptions::double_elimination(true))
            .with_official(Official::new("o1"));
        e.max_participants = Some(7);
        build_event_schedule(&mut e, &SchedulerConfig::default()).unwrap();
        let first = e.matches.clone();
        build_event_schedule(&mut e, &SchedulerConfig::default()).unwrap();
        assert_eq!(first, e.matches);
    }

    #[test]
    fn test_rebuild_after_team_withdraws() {
        let mut e = tournament(5, TournamentOptions::single_elimination());
        build_event_schedule(&mut e, &SchedulerConfig::default()).unwrap();
        assert!(e.matches.values().any(|m| m.involves_team("t5")));

        e.teams.remove("t5");
        build_event_schedule(&mut e, &SchedulerConfig::default()).unwrap();
        assert_eq!(e.matches.len(), 3);
        assert!(e.matches.values().all(|m| !m.involves_team("t5")));
        assert_numbered(&e);
    }

    #[test]
    fn test_invalid_rebuild_keeps_matches() {
        let mut e = tournament(4, TournamentOptions::single_elimination());
        build_event_schedule(&mut e, &SchedulerConfig::default()).unwrap();
        let before = e.matches.clone();

        e.time_slots.push(TimeSlot::weekly("bad", 9, 60, 120));
        let err = build_event_schedule(&mut e, &SchedulerConfig::default()).unwrap_err();
        assert!(matches!(err, SchedulingError::Validation(_)));
        assert_eq!(e.matches, before);
    }

    #[test]
    fn test_rebuild_keeps_ids_of_numbered_matches() {
        let mut e = tournament(4, TournamentOptions::default());
        let mut old = Match::new("persisted-row", "open");
        old.match_id = Some(1);
        old.place("f1", TimeWindow::new(at(3, 9), at(3, 10)));
        e.matches.insert(old.id.clone(), old);

        build_event_schedule(&mut e, &SchedulerConfig::default()).unwrap();
        let first = e.matches.values().find(|m| m.match_id == Some(1)).unwrap();
        assert_eq!(first.id, "persisted-row");
        let final_match = e.matches.values().find(|m| m.match_id == Some(3)).unwrap();
        assert!(final_match.dependency_ids().any(|d| d == "persisted-row"));
    }

    #[test]
    fn test_league_playoffs_follow_season() {
        let options = LeagueOptions {
            include_playoffs: true,
            playoff_team_count: 4,
            ..LeagueOptions::default()
        };
        let mut e = league(5, options).with_field(Field::new("f2", 2));
        e.teams.get_mut("t5").unwrap().wins = 3;
        build_event_schedule(&mut e, &SchedulerConfig::default()).unwrap();

        let season: Vec<&Match> = e.matches.values().filter(|m| m.dependency_ids().count() == 0 && m.winner_next_id.is_none()).collect();
        let playoffs: Vec<&Match> = e
            .matches
            .values()
            .filter(|m| m.winner_next_id.is_some() || m.dependency_ids().count() > 0)
            .collect();
        assert_eq!(season.len(), 10);
        assert_eq!(playoffs.len(), 3);
        let season_end = season.iter().filter_map(|m| m.end).max().unwrap();
        assert!(playoffs.iter().all(|m| m.start.unwrap() >= season_end));
        // The best record gets the top seed: it faces the fourth seed.
        assert!(playoffs.iter().any(|m| m.involves_team("t5") && m.has_both_teams()));
        assert!(playoffs.iter().all(|m| !m.involves_team("t4") || m.involves_team("t5") || m.team_ids().count() == 0));
        assert_numbered(&e);
    }

    #[test]
    fn test_team_referees_in_tournament() {
        let mut e = tournament(8, TournamentOptions::default());
        e.team_referees = true;
        build_event_schedule(&mut e, &SchedulerConfig::default()).unwrap();
        for m in e.matches.values().filter(|m| m.has_both_teams()) {
            let referee = m.team_referee_id.as_deref().unwrap();
            assert!(!m.involves_team(referee));
        }
        assert!(e.matches.values().all(|m| m.buffer_ms() == 0));
    }

    #[test]
    fn test_random_tournaments_are_consistent() {
        use rand::rngs::SmallRng;
        use rand::{Rng, SeedableRng};

        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..40 {
            let teams = rng.random_range(3..=24);
            let options = match rng.random_range(0..3) {
                0 => TournamentOptions::single_elimination(),
                1 => TournamentOptions::double_elimination(false),
                _ => TournamentOptions::double_elimination(true),
            };
            let expected = match (options.double_elimination, options.bracket_reset) {
                (false, _) => teams - 1,
                (true, false) => 2 * teams - 2,
                (true, true) => 2 * teams - 1,
            };
            let mut e = tournament(teams, options);
            for f in 3..=rng.random_range(2..=4) {
                e = e.with_field(Field::new(format!("f{f}"), f));
            }
            build_event_schedule(&mut e, &SchedulerConfig::default()).unwrap();

            assert_eq!(e.matches.len(), expected, "{teams} teams");
            assert_numbered(&e);
            assert!(e.matches.values().all(|m| m.is_scheduled()));
            assert!(e.end >= e.latest_match_end().unwrap());
            for m in e.matches.values() {
                let w = m.window().unwrap();
                for dep in m.dependency_ids() {
                    let d = &e.matches[dep];
                    assert!(d.end.unwrap() + chrono::TimeDelta::milliseconds(d.buffer_ms()) <= w.start);
                }
                for other in e.matches.values().filter(|o| o.id != m.id) {
                    let ow = other.window().unwrap();
                    if other.field_id == m.field_id {
                        assert!(!w.overlaps(&ow), "{} overlaps {} on a field", m.id, other.id);
                    }
                    if m.team_ids().any(|t| other.involves_team(t)) {
                        assert!(!w.overlaps(&ow), "{} overlaps {} for a team", m.id, other.id);
                    }
                }
            }
        }
    }
}

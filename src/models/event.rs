//! Event aggregate.
//!
//! An event owns every team, field, slot, official and match involved in a
//! scheduling pass. The match table is the only source of truth; per-team,
//! per-field and per-official match lists are computed from it on demand.
//!
//! Tournaments and leagues share one record. Type-specific parameters live
//! in the [`EventKind`] variant.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Division, Field, Match, MatchRecord, MatchTable, Official, Team, TimeSlot};

/// Tournament parameters (also used for league playoffs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TournamentOptions {
    /// Build a losers bracket and grand final.
    pub double_elimination: bool,
    /// Add a reset match after the grand final (double elimination only).
    pub bracket_reset: bool,
    /// Sets per winners-bracket match.
    pub winner_set_count: u32,
    /// Sets per losers-bracket match.
    pub loser_set_count: u32,
    /// Points needed to win each winners-bracket set.
    pub winner_points_per_set: Vec<u32>,
    /// Points needed to win each losers-bracket set.
    pub loser_points_per_set: Vec<u32>,
}

impl Default for TournamentOptions {
    fn default() -> Self {
        Self {
            double_elimination: false,
            bracket_reset: false,
            winner_set_count: 1,
            loser_set_count: 1,
            winner_points_per_set: vec![21],
            loser_points_per_set: vec![21],
        }
    }
}

impl TournamentOptions {
    /// Single elimination, one set per match.
    pub fn single_elimination() -> Self {
        Self::default()
    }

    /// Double elimination, optionally with a grand-final reset.
    pub fn double_elimination(bracket_reset: bool) -> Self {
        Self {
            double_elimination: true,
            bracket_reset,
            ..Self::default()
        }
    }
}

/// League parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LeagueOptions {
    /// How many times each pair of teams meets.
    pub games_per_opponent: u32,
    /// Append a playoff bracket after the regular season.
    pub include_playoffs: bool,
    /// Teams per division entering the playoffs.
    pub playoff_team_count: usize,
    /// Playoff bracket format.
    pub playoffs: TournamentOptions,
}

impl Default for LeagueOptions {
    fn default() -> Self {
        Self {
            games_per_opponent: 1,
            include_playoffs: false,
            playoff_team_count: 0,
            playoffs: TournamentOptions::default(),
        }
    }
}

/// Event type with its type-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "UPPERCASE")]
pub enum EventKind {
    /// Elimination bracket.
    Tournament(TournamentOptions),
    /// Round-robin season with optional playoffs.
    League(LeagueOptions),
}

/// How long matches last and how much rest follows them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MatchRules {
    /// Duration is derived from set count instead of a fixed length.
    pub uses_sets: bool,
    /// Minutes per set (set-based matches).
    pub set_duration_minutes: u32,
    /// Minutes per match (timed matches).
    pub match_duration_minutes: u32,
    /// Minimum rest between dependent matches.
    pub rest_time_minutes: u32,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            uses_sets: false,
            set_duration_minutes: 20,
            match_duration_minutes: 60,
            rest_time_minutes: 0,
        }
    }
}

impl MatchRules {
    /// Duration (ms) of a match with `sets` sets.
    pub fn duration_ms(&self, sets: u32) -> i64 {
        let minutes = if self.uses_sets {
            i64::from(self.set_duration_minutes) * i64::from(sets.max(1))
        } else {
            i64::from(self.match_duration_minutes)
        };
        minutes * 60_000
    }

    /// Rest buffer in ms.
    pub fn rest_ms(&self) -> i64 {
        i64::from(self.rest_time_minutes) * 60_000
    }

    /// Length of the points arrays for a match with `sets` sets.
    pub fn score_slots(&self, sets: u32) -> usize {
        if self.uses_sets {
            sets.max(1) as usize
        } else {
            1
        }
    }
}

/// A league or tournament with everything needed to schedule it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Unique event identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Earliest instant matches may start.
    pub start: NaiveDateTime,
    /// Planned end; extended after scheduling to cover every match.
    pub end: NaiveDateTime,
    /// Type-specific parameters.
    pub kind: EventKind,
    /// Divisions in scheduling order.
    pub divisions: Vec<Division>,
    /// Teams by id.
    pub teams: BTreeMap<String, Team>,
    /// Fields by id.
    pub fields: BTreeMap<String, Field>,
    /// Recurring availability. Empty = unconstrained (tournaments only).
    pub time_slots: Vec<TimeSlot>,
    /// Officials.
    pub officials: Vec<Official>,
    /// Matches by stable id.
    pub matches: MatchTable,
    /// Duration and rest rules.
    pub rules: MatchRules,
    /// Desired participant count; placeholders fill any shortfall.
    pub max_participants: Option<usize>,
    /// Assign a non-playing team to referee each match.
    pub team_referees: bool,
}

impl Event {
    /// Creates an empty event.
    pub fn new(id: impl Into<String>, kind: EventKind, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            start,
            end,
            kind,
            divisions: Vec::new(),
            teams: BTreeMap::new(),
            fields: BTreeMap::new(),
            time_slots: Vec::new(),
            officials: Vec::new(),
            matches: MatchTable::new(),
            rules: MatchRules::default(),
            max_participants: None,
            team_referees: false,
        }
    }

    /// Adds a division.
    pub fn with_division(mut self, division: Division) -> Self {
        self.divisions.push(division);
        self
    }

    /// Adds a team.
    pub fn with_team(mut self, team: Team) -> Self {
        self.teams.insert(team.id.clone(), team);
        self
    }

    /// Adds a field.
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.insert(field.id.clone(), field);
        self
    }

    /// Adds a time slot.
    pub fn with_time_slot(mut self, slot: TimeSlot) -> Self {
        self.time_slots.push(slot);
        self
    }

    /// Adds an official.
    pub fn with_official(mut self, official: Official) -> Self {
        self.officials.push(official);
        self
    }

    /// Sets the match rules.
    pub fn with_rules(mut self, rules: MatchRules) -> Self {
        self.rules = rules;
        self
    }

    /// Whether this is a league.
    pub fn is_league(&self) -> bool {
        matches!(self.kind, EventKind::League(_))
    }

    /// Division ids in scheduling order.
    ///
    /// Falls back to the teams' divisions (sorted) when none are declared.
    pub fn division_ids(&self) -> Vec<String> {
        if !self.divisions.is_empty() {
            return self.divisions.iter().map(|d| d.id.clone()).collect();
        }
        let mut ids: Vec<String> = self.teams.values().map(|t| t.division_id.clone()).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Looks up a division.
    pub fn division(&self, id: &str) -> Option<&Division> {
        self.divisions.iter().find(|d| d.id == id)
    }

    /// Teams of a division, best seed first (ascending rank, ties by id).
    pub fn teams_in_division(&self, division_id: &str) -> Vec<&Team> {
        let mut teams: Vec<&Team> = self
            .teams
            .values()
            .filter(|t| t.division_id == division_id)
            .collect();
        teams.sort_by(|a, b| a.seed.cmp(&b.seed).then(a.id.cmp(&b.id)));
        teams
    }

    /// Matches a team plays, in chronological order.
    pub fn matches_for_team(&self, team_id: &str) -> Vec<&Match> {
        self.sorted_matches(|m| m.involves_team(team_id))
    }

    /// Matches placed on a field, in chronological order.
    pub fn matches_for_field(&self, field_id: &str) -> Vec<&Match> {
        self.sorted_matches(|m| m.field_id.as_deref() == Some(field_id))
    }

    /// Matches an official works, in chronological order.
    pub fn matches_for_official(&self, official_id: &str) -> Vec<&Match> {
        self.sorted_matches(|m| m.official_id.as_deref() == Some(official_id))
    }

    fn sorted_matches(&self, pred: impl Fn(&Match) -> bool) -> Vec<&Match> {
        let mut out: Vec<&Match> = self.matches.values().filter(|m| pred(m)).collect();
        out.sort_by(|a, b| a.chronological_key().cmp(&b.chronological_key()));
        out
    }

    /// Latest end across all matches.
    pub fn latest_match_end(&self) -> Option<NaiveDateTime> {
        self.matches.values().filter_map(|m| m.end).max()
    }

    /// Extends `end` so every match fits inside the event window.
    pub fn extend_end_to_matches(&mut self) {
        if let Some(latest) = self.latest_match_end() {
            if latest > self.end {
                self.end = latest;
            }
        }
    }

    /// Serializable records for every match, in chronological order.
    pub fn match_records(&self) -> Vec<MatchRecord> {
        self.sorted_matches(|_| true)
            .into_iter()
            .map(|m| MatchRecord::from_match(&self.id, m))
            .collect()
    }
}

//! Match model.
//!
//! Matches live in a flat [`MatchTable`] keyed by their stable id. The four
//! link fields (`previous_left_id`, `previous_right_id`, `winner_next_id`,
//! `loser_next_id`) are foreign keys into that table, so the bracket graph
//! is plain data: cloneable, serializable and checkable.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::TimeWindow;

/// All matches of an event, keyed by stable id.
pub type MatchTable = BTreeMap<String, Match>;

/// Which input slot of its successor a match feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchSide {
    /// Feeds `team1` / `previous_left_id`.
    Left,
    /// Feeds `team2` / `previous_right_id`.
    Right,
}

impl MatchSide {
    /// The other side.
    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// A single match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// Stable identifier (persisted row key).
    pub id: String,
    /// Chronological number, assigned once the whole schedule is built.
    pub match_id: Option<u32>,
    /// Scheduled start.
    pub start: Option<NaiveDateTime>,
    /// Scheduled end.
    pub end: Option<NaiveDateTime>,
    /// Pinned: rescheduling passes must not move or re-bind it.
    pub locked: bool,
    /// Points per set for team 1.
    pub team1_points: Vec<u32>,
    /// Points per set for team 2.
    pub team2_points: Vec<u32>,
    /// Division the match belongs to.
    pub division_id: String,
    /// Assigned field.
    pub field_id: Option<String>,
    /// Assigned official.
    pub official_id: Option<String>,
    /// Team assigned to referee.
    pub team_referee_id: Option<String>,
    /// First team. `None` = not yet determined.
    pub team1_id: Option<String>,
    /// Second team. `None` = not yet determined.
    pub team2_id: Option<String>,
    /// Minimum rest (ms) after this match before a dependant may start.
    pub buffer_ms: i64,
    /// Slot fed in the winner's next match.
    pub side: Option<MatchSide>,
    /// Part of the losers bracket.
    pub losers_bracket: bool,
    /// Match whose result fills `team1`.
    pub previous_left_id: Option<String>,
    /// Match whose result fills `team2`.
    pub previous_right_id: Option<String>,
    /// Where the winner advances.
    pub winner_next_id: Option<String>,
    /// Where the loser drops (double elimination only).
    pub loser_next_id: Option<String>,
}

impl Match {
    /// Creates an unscheduled match with no teams.
    pub fn new(id: impl Into<String>, division_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            match_id: None,
            start: None,
            end: None,
            locked: false,
            team1_points: Vec::new(),
            team2_points: Vec::new(),
            division_id: division_id.into(),
            field_id: None,
            official_id: None,
            team_referee_id: None,
            team1_id: None,
            team2_id: None,
            buffer_ms: 0,
            side: None,
            losers_bracket: false,
            previous_left_id: None,
            previous_right_id: None,
            winner_next_id: None,
            loser_next_id: None,
        }
    }

    /// Sets both teams.
    pub fn with_teams(mut self, team1: Option<String>, team2: Option<String>) -> Self {
        self.team1_id = team1;
        self.team2_id = team2;
        self
    }

    /// Sets the rest buffer.
    pub fn with_buffer_ms(mut self, buffer_ms: i64) -> Self {
        self.buffer_ms = buffer_ms;
        self
    }

    /// Sizes both points arrays for `sets` sets.
    pub fn with_sets(mut self, sets: usize) -> Self {
        self.team1_points = vec![0; sets];
        self.team2_points = vec![0; sets];
        self
    }

    /// Scheduled interval, if both ends are known.
    pub fn window(&self) -> Option<TimeWindow> {
        match (self.start, self.end) {
            (Some(s), Some(e)) => Some(TimeWindow::new(s, e)),
            _ => None,
        }
    }

    /// Whether the match has a time and a field.
    pub fn is_scheduled(&self) -> bool {
        self.window().is_some() && self.field_id.is_some()
    }

    /// Applies a placement.
    pub fn place(&mut self, field_id: impl Into<String>, window: TimeWindow) {
        self.field_id = Some(field_id.into());
        self.start = Some(window.start);
        self.end = Some(window.end);
    }

    /// Removes time and field.
    pub fn unschedule(&mut self) {
        self.start = None;
        self.end = None;
        self.field_id = None;
    }

    /// Planned duration (ms), if scheduled.
    pub fn duration_ms(&self) -> Option<i64> {
        self.window().map(|w| w.duration_ms())
    }

    /// Matches feeding this one.
    pub fn dependency_ids(&self) -> impl Iterator<Item = &str> {
        self.previous_left_id
            .as_deref()
            .into_iter()
            .chain(self.previous_right_id.as_deref())
    }

    /// Matches this one feeds.
    pub fn dependant_ids(&self) -> impl Iterator<Item = &str> {
        let loser = match (&self.winner_next_id, &self.loser_next_id) {
            (Some(w), Some(l)) if w == l => None,
            (_, l) => l.as_deref(),
        };
        self.winner_next_id.as_deref().into_iter().chain(loser)
    }

    /// Both teams, whichever are known.
    pub fn team_ids(&self) -> impl Iterator<Item = &str> {
        self.team1_id.as_deref().into_iter().chain(self.team2_id.as_deref())
    }

    /// Whether both teams are determined.
    pub fn has_both_teams(&self) -> bool {
        self.team1_id.is_some() && self.team2_id.is_some()
    }

    /// Whether a team plays in this match.
    pub fn involves_team(&self, team_id: &str) -> bool {
        self.team_ids().any(|t| t == team_id)
    }

    /// The input slot a given previous match feeds, if any.
    pub fn slot_fed_by(&self, previous_id: &str) -> Option<MatchSide> {
        if self.previous_left_id.as_deref() == Some(previous_id) {
            Some(MatchSide::Left)
        } else if self.previous_right_id.as_deref() == Some(previous_id) {
            Some(MatchSide::Right)
        } else {
            None
        }
    }

    /// Sets the team in a slot.
    pub fn set_team(&mut self, side: MatchSide, team_id: Option<String>) {
        match side {
            MatchSide::Left => self.team1_id = team_id,
            MatchSide::Right => self.team2_id = team_id,
        }
    }

    /// Sets the previous-match link for a slot.
    pub fn set_previous(&mut self, side: MatchSide, match_id: Option<String>) {
        match side {
            MatchSide::Left => self.previous_left_id = match_id,
            MatchSide::Right => self.previous_right_id = match_id,
        }
    }

    /// Whether both link pointers name the same successor (the grand-final reset).
    pub fn feeds_reset(&self) -> bool {
        self.winner_next_id.is_some() && self.winner_next_id == self.loser_next_id
    }

    /// Ordering key for chronological numbering: start, end, field, id.
    pub fn chronological_key(&self) -> (Option<NaiveDateTime>, Option<NaiveDateTime>, Option<&str>, &str) {
        (self.start, self.end, self.field_id.as_deref(), self.id.as_str())
    }

    /// Rewrites the id and every link through `renames` (old id -> new id).
    pub fn remap_ids(&mut self, renames: &HashMap<String, String>) {
        if let Some(to) = renames.get(&self.id) {
            self.id = to.clone();
        }
        for link in [
            &mut self.previous_left_id,
            &mut self.previous_right_id,
            &mut self.winner_next_id,
            &mut self.loser_next_id,
        ] {
            if let Some(to) = link.as_ref().and_then(|id| renames.get(id)) {
                *link = Some(to.clone());
            }
        }
    }
}

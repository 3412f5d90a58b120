//! Outbound records and non-fatal warnings.
//!
//! `MatchRecord` is the flat, serializable shape callers persist.
//! `ScheduleWarning` reports a locked match that no longer fits the event
//! setup; warnings never abort a pass.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{Match, MatchSide};

/// A persisted view of one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub id: String,
    pub match_id: Option<u32>,
    pub event_id: String,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub division_id: String,
    pub field_id: Option<String>,
    pub team1_id: Option<String>,
    pub team2_id: Option<String>,
    pub official_id: Option<String>,
    pub team_referee_id: Option<String>,
    pub team1_points: Vec<u32>,
    pub team2_points: Vec<u32>,
    pub losers_bracket: bool,
    pub winner_next_match_id: Option<String>,
    pub loser_next_match_id: Option<String>,
    pub previous_left_match_id: Option<String>,
    pub previous_right_match_id: Option<String>,
    pub side: Option<MatchSide>,
    pub locked: bool,
}

impl MatchRecord {
    /// Projects a match.
    pub fn from_match(event_id: &str, m: &Match) -> Self {
        Self {
            id: m.id.clone(),
            match_id: m.match_id,
            event_id: event_id.to_string(),
            start: m.start,
            end: m.end,
            division_id: m.division_id.clone(),
            field_id: m.field_id.clone(),
            team1_id: m.team1_id.clone(),
            team2_id: m.team2_id.clone(),
            official_id: m.official_id.clone(),
            team_referee_id: m.team_referee_id.clone(),
            team1_points: m.team1_points.clone(),
            team2_points: m.team2_points.clone(),
            losers_bracket: m.losers_bracket,
            winner_next_match_id: m.winner_next_id.clone(),
            loser_next_match_id: m.loser_next_id.clone(),
            previous_left_match_id: m.previous_left_id.clone(),
            previous_right_match_id: m.previous_right_id.clone(),
            side: m.side,
            locked: m.locked,
        }
    }
}

/// Why a locked match was flagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningKind {
    /// Interval lies outside the event's start/end.
    OutsideEventWindow,
    /// No configured slot covers the interval on its field.
    OutsideTimeSlots,
    /// Locked but never placed.
    Unscheduled,
}

/// A non-fatal problem with a locked match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleWarning {
    /// Type of warning.
    pub kind: WarningKind,
    /// Stable id of the affected match.
    pub match_id: String,
    /// Human-readable description.
    pub message: String,
}

impl ScheduleWarning {
    /// Locked match outside the event window.
    pub fn outside_event_window(match_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::OutsideEventWindow,
            match_id: match_id.into(),
            message: message.into(),
        }
    }

    /// Locked match not covered by any slot.
    pub fn outside_time_slots(match_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::OutsideTimeSlots,
            match_id: match_id.into(),
            message: message.into(),
        }
    }

    /// Locked match without a time or field.
    pub fn unscheduled(match_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Unscheduled,
            match_id: match_id.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keys() {
        let mut m = Match::new("m1", "open").with_teams(Some("a".into()), Some("b".into()));
        m.match_id = Some(4);
        m.losers_bracket = true;
        m.winner_next_id = Some("m2".into());
        let json = serde_json::to_value(MatchRecord::from_match("e1", &m)).unwrap();
        assert_eq!(json["matchId"], 4);
        assert_eq!(json["eventId"], "e1");
        assert_eq!(json["team1Id"], "a");
        assert_eq!(json["losersBracket"], true);
        assert_eq!(json["winnerNextMatchId"], "m2");
        assert!(json["fieldId"].is_null());
    }

    #[test]
    fn test_warning_factories() {
        let w = ScheduleWarning::outside_event_window("m1", "before start");
        assert_eq!(w.kind, WarningKind::OutsideEventWindow);
        let w = ScheduleWarning::outside_time_slots("m2", "no slot");
        assert_eq!(w.kind, WarningKind::OutsideTimeSlots);
        assert_eq!(w.match_id, "m2");
    }
}

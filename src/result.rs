//! Match Result Finalizer.
//!
//! Applies a completed result to a match: records the points, updates the
//! win/loss counters, moves the winner and loser into the matches they
//! feed, and cascades time changes to dependants when the match ran longer
//! or shorter than planned.

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulingError};
use crate::models::{Event, Match, MatchSide};
use crate::scheduler::reschedule_following_events;

/// A completed result as entered by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// Points per set for team 1.
    pub team1_points: Vec<u32>,
    /// Points per set for team 2.
    pub team2_points: Vec<u32>,
    /// Actual end time, when it differs from the planned one.
    pub actual_end: Option<NaiveDateTime>,
}

impl MatchResult {
    /// A result with the planned end time.
    pub fn new(team1_points: Vec<u32>, team2_points: Vec<u32>) -> Self {
        Self {
            team1_points,
            team2_points,
            actual_end: None,
        }
    }

    /// Records the actual end time.
    pub fn ended_at(mut self, end: NaiveDateTime) -> Self {
        self.actual_end = Some(end);
        self
    }

    /// Sets won by (team 1, team 2). Equal sets count for neither.
    pub fn sets_won(&self) -> (usize, usize) {
        self.team1_points
            .iter()
            .zip(&self.team2_points)
            .fold((0, 0), |(a, b), (p1, p2)| match p1.cmp(p2) {
                std::cmp::Ordering::Greater => (a + 1, b),
                std::cmp::Ordering::Less => (a, b + 1),
                std::cmp::Ordering::Equal => (a, b),
            })
    }
}

/// What finalizing a match changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finalized {
    pub winner_id: String,
    pub loser_id: String,
    /// Matches moved by the time cascade, in the order they moved.
    pub shifted: Vec<String>,
}

/// Applies `result` to the match `match_key`.
///
/// The winner goes to the slot of `winner_next` fed by this match, the
/// loser to the slot of `loser_next`. A grand final won by the
/// winners-bracket champion (team 1) leaves the reset match empty; if the
/// losers-bracket champion wins, both teams meet again in the reset.
pub fn finalize_match(
    event: &mut Event,
    match_key: &str,
    result: MatchResult,
    config: &SchedulerConfig,
) -> Result<Finalized> {
    let m = event
        .matches
        .get(match_key)
        .ok_or_else(|| SchedulingError::UnknownMatch(match_key.to_string()))?;
    let invalid = |reason: &str| SchedulingError::InvalidResult {
        match_id: match_key.to_string(),
        reason: reason.to_string(),
    };

    let (Some(team1), Some(team2)) = (m.team1_id.clone(), m.team2_id.clone()) else {
        return Err(invalid("both teams must be determined"));
    };
    if result.team1_points.is_empty() || result.team1_points.len() != result.team2_points.len() {
        return Err(invalid("points must be given for the same number of sets"));
    }
    let (sets1, sets2) = result.sets_won();
    if sets1 == sets2 {
        return Err(invalid("the result is tied"));
    }
    let (winner, loser, winner_side) = if sets1 > sets2 {
        (team1, team2, MatchSide::Left)
    } else {
        (team2, team1, MatchSide::Right)
    };
    if let (Some(start), Some(end)) = (m.start, result.actual_end) {
        if end <= start {
            return Err(invalid("actual end must be after the start"));
        }
    }

    let end_changed = result.actual_end.is_some_and(|end| m.end != Some(end));
    let grand_final = m.feeds_reset();
    let winner_next = m.winner_next_id.clone();
    let loser_next = m.loser_next_id.clone();
    for next in winner_next.iter().chain(&loser_next) {
        if !event.matches.contains_key(next) {
            return Err(SchedulingError::UnknownMatch(next.clone()));
        }
    }

    if grand_final {
        if let Some(reset) = winner_next.as_deref().and_then(|id| event.matches.get_mut(id)) {
            if winner_side == MatchSide::Left {
                reset.set_team(MatchSide::Left, None);
                reset.set_team(MatchSide::Right, None);
                debug!(match_id = %match_key, "winners-bracket champion took the grand final");
            } else {
                reset.set_team(MatchSide::Left, Some(winner.clone()));
                reset.set_team(MatchSide::Right, Some(loser.clone()));
                debug!(match_id = %match_key, reset = %reset.id, "grand final goes to reset");
            }
        }
    } else {
        advance(event, match_key, winner_next.as_deref(), &winner)?;
        advance(event, match_key, loser_next.as_deref(), &loser)?;
    }

    if let Some(t) = event.teams.get_mut(&winner) {
        t.wins += 1;
    }
    if let Some(t) = event.teams.get_mut(&loser) {
        t.losses += 1;
    }

    if let Some(m) = event.matches.get_mut(match_key) {
        m.team1_points = result.team1_points;
        m.team2_points = result.team2_points;
        if let Some(end) = result.actual_end {
            m.end = Some(end);
        }
    }

    let shifted = if end_changed {
        reschedule_following_events(&mut event.matches, match_key, config)?
    } else {
        Vec::new()
    };
    info!(
        match_id = %match_key,
        winner = %winner,
        shifted = shifted.len(),
        "match finalized"
    );
    Ok(Finalized {
        winner_id: winner,
        loser_id: loser,
        shifted,
    })
}

/// Places `team` into the slot of `next` that `from` feeds.
fn advance(event: &mut Event, from: &str, next: Option<&str>, team: &str) -> Result<()> {
    let Some(next) = next else { return Ok(()) };
    let target: &mut Match = event
        .matches
        .get_mut(next)
        .ok_or_else(|| SchedulingError::UnknownMatch(next.to_string()))?;
    let side = target
        .slot_fed_by(from)
        .ok_or_else(|| SchedulingError::InvalidResult {
            match_id: from.to_string(),
            reason: format!("match '{next}' is not fed by this match"),
        })?;
    target.set_team(side, Some(team.to_string()));
    Ok(())
}

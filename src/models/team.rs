//! Team model.

use serde::{Deserialize, Serialize};

/// Prefix of synthetic team ids injected to reach participant capacity.
pub const PLACEHOLDER_PREFIX: &str = "placeholder-";

/// A competing team.
///
/// Teams do not store their matches; use
/// [`Event::matches_for_team`](super::Event::matches_for_team).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Unique team identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Seed rank. 1 is the strongest team and larger numbers are weaker,
    /// so "best seed first" means ascending `seed`.
    pub seed: u32,
    /// Division the team competes in.
    pub division_id: String,
    /// Completed wins.
    pub wins: u32,
    /// Completed losses.
    pub losses: u32,
    /// Roster.
    pub player_ids: Vec<String>,
    /// Synthetic team standing in for a not-yet-registered participant.
    #[serde(default)]
    pub placeholder: bool,
}

impl Team {
    /// Creates a team.
    pub fn new(id: impl Into<String>, seed: u32, division_id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            seed,
            division_id: division_id.into(),
            wins: 0,
            losses: 0,
            player_ids: Vec::new(),
            placeholder: false,
        }
    }

    /// Creates the `index`-th placeholder team.
    pub fn placeholder(index: usize, seed: u32, division_id: impl Into<String>) -> Self {
        Self {
            name: format!("Team {}", index + 1),
            placeholder: true,
            ..Self::new(format!("{PLACEHOLDER_PREFIX}{index}"), seed, division_id)
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a player to the roster.
    pub fn with_player(mut self, player_id: impl Into<String>) -> Self {
        self.player_ids.push(player_id.into());
        self
    }

    /// Standings order: more wins, then fewer losses, then better seed.
    pub fn standing_cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .wins
            .cmp(&self.wins)
            .then(self.losses.cmp(&other.losses))
            .then(self.seed.cmp(&other.seed))
            .then(self.id.cmp(&other.id))
    }
}

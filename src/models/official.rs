//! Official model.

use serde::{Deserialize, Serialize};

/// A person who can officiate matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Official {
    /// Unique official identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Divisions the official covers. Empty = every division of the event.
    pub division_ids: Vec<String>,
}

impl Official {
    /// Creates an official covering all divisions.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            division_ids: Vec::new(),
        }
    }

    /// Restricts the official to a division.
    pub fn with_division(mut self, division_id: impl Into<String>) -> Self {
        self.division_ids.push(division_id.into());
        self
    }

    /// Whether the official may work a match of this division.
    pub fn covers_division(&self, division_id: &str) -> bool {
        self.division_ids.is_empty() || self.division_ids.iter().any(|d| d == division_id)
    }
}

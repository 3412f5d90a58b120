//! Division model.

use serde::{Deserialize, Serialize};

/// A grouping key for teams, officials, fields and matches.
///
/// Scheduling is partitioned per division: teams only meet teams of their
/// own division, and a match may only be placed on a field serving it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Division {
    /// Unique division identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Fields this division may use. Empty = any field serving the division.
    pub field_ids: Vec<String>,
}

impl Division {
    /// Creates a division with no field restriction.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            field_ids: Vec::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a field to the allowlist.
    pub fn with_field(mut self, field_id: impl Into<String>) -> Self {
        self.field_ids.push(field_id.into());
        self
    }

    /// Whether the allowlist admits a field.
    pub fn allows_field(&self, field_id: &str) -> bool {
        self.field_ids.is_empty() || self.field_ids.iter().any(|f| f == field_id)
    }
}

//! Field (playing resource) model.
//!
//! Fields are the resources matches are packed onto. A field serves a set
//! of divisions and may carry rental reservations that block placement.

use serde::{Deserialize, Serialize};

use super::TimeSlot;

/// A playing field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Unique field identifier.
    pub id: String,
    /// Field number shown to players; also the placement tie-break.
    pub number: u32,
    /// Display name.
    pub name: String,
    /// Divisions served. Empty = all divisions.
    pub division_ids: Vec<String>,
    /// Reservations during which the field is unavailable.
    pub rental_slots: Vec<TimeSlot>,
}

impl Field {
    /// Creates a field serving every division.
    pub fn new(id: impl Into<String>, number: u32) -> Self {
        Self {
            id: id.into(),
            number,
            name: format!("Field {number}"),
            division_ids: Vec::new(),
            rental_slots: Vec::new(),
        }
    }

    /// Adds a served division.
    pub fn with_division(mut self, division_id: impl Into<String>) -> Self {
        self.division_ids.push(division_id.into());
        self
    }

    /// Adds a blocking reservation.
    pub fn with_rental(mut self, slot: TimeSlot) -> Self {
        self.rental_slots.push(slot);
        self
    }

    /// Whether the field serves a division.
    pub fn serves_division(&self, division_id: &str) -> bool {
        self.division_ids.is_empty() || self.division_ids.iter().any(|d| d == division_id)
    }
}

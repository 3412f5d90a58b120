//! Engine limits.
//!
//! Event-specific settings (window, rules, slots) live on
//! [`Event`](crate::models::Event). `SchedulerConfig` carries only the
//! bounds that keep the engine's searches finite.

use serde::{Deserialize, Serialize};

/// Limits and granularity used by the builders and the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// Maximum nesting depth accepted while building a bracket tree.
    pub max_bracket_depth: usize,
    /// Ceiling on matches processed by a single graph traversal or cascade.
    pub max_traversal: usize,
    /// How many days ahead slot and conflict searches may look.
    pub slot_search_days: i64,
    /// Start times are rounded up to a multiple of this many minutes.
    pub granularity_minutes: i64,
}

impl SchedulerConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bracket depth limit.
    pub fn with_max_bracket_depth(mut self, depth: usize) -> Self {
        self.max_bracket_depth = depth;
        self
    }

    /// Sets the traversal ceiling.
    pub fn with_max_traversal(mut self, limit: usize) -> Self {
        self.max_traversal = limit;
        self
    }

    /// Sets the slot search horizon in days.
    pub fn with_slot_search_days(mut self, days: i64) -> Self {
        self.slot_search_days = days;
        self
    }

    /// Sets the rounding granularity in minutes.
    pub fn with_granularity_minutes(mut self, minutes: i64) -> Self {
        self.granularity_minutes = minutes.max(1);
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_bracket_depth: 32,
            max_traversal: 100_000,
            slot_search_days: 731,
            granularity_minutes: 5,
        }
    }
}

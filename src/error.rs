//! Error types for scheduling operations.
//!
//! Every public entry point returns [`Result`]. Errors fall into the
//! categories reported by [`SchedulingError::kind`]; only configuration
//! errors are meant to be surfaced to end users.

use thiserror::Error;

use crate::validation::ValidationError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SchedulingError>;

/// Broad classification of a [`SchedulingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The event setup must change before scheduling can succeed.
    Configuration,
    /// Not enough participants to build the requested structure.
    Capacity,
    /// An internal invariant was violated (a defect, not a user error).
    Structural,
    /// No time slot of sufficient length exists in the search horizon.
    Exhausted,
    /// The caller passed an inconsistent request.
    InvalidInput,
}

/// Errors raised by the builders, the scheduler and the finalizer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulingError {
    #[error("Unable to schedule event because no fields are configured.")]
    NoFieldsConfigured,
    #[error("No fields are available for division '{division}' under the current time slots.")]
    NoFieldsForDivision { division: String },
    #[error("Unable to schedule league because no recurring time slots are configured. Add weekly field availability to continue.")]
    NoRecurringTimeSlots,
    #[error("At least two participants are required, found {found}")]
    NotEnoughParticipants { found: usize },
    #[error("Bracket leaf in division '{division}' needs two teams but only {remaining} remain")]
    NotEnoughTeamsAtLeaf { division: String, remaining: usize },
    #[error("Bracket construction exceeded the depth limit of {limit}")]
    BracketDepthExceeded { limit: usize },
    #[error("Match graph traversal exceeded {limit} processed matches")]
    TraversalLimitExceeded { limit: usize },
    #[error("Double-elimination wiring for match '{match_id}' has no loser chain")]
    MissingLoserChain { match_id: String },
    #[error("Match graph contains a cycle through match '{match_id}'")]
    CyclicMatchGraph { match_id: String },
    #[error("No time slot of {duration_ms}ms is available for division '{division}'")]
    NoSlotAvailable { division: String, duration_ms: i64 },
    #[error("Unknown match: {0}")]
    UnknownMatch(String),
    #[error("Invalid result for match '{match_id}': {reason}")]
    InvalidResult { match_id: String, reason: String },
    #[error("Event failed validation: {0:?}")]
    Validation(Vec<ValidationError>),
}

impl SchedulingError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoFieldsConfigured | Self::NoFieldsForDivision { .. } | Self::NoRecurringTimeSlots => {
                ErrorKind::Configuration
            }
            Self::NotEnoughParticipants { .. } | Self::NotEnoughTeamsAtLeaf { .. } => ErrorKind::Capacity,
            Self::BracketDepthExceeded { .. }
            | Self::TraversalLimitExceeded { .. }
            | Self::MissingLoserChain { .. }
            | Self::CyclicMatchGraph { .. } => ErrorKind::Structural,
            Self::NoSlotAvailable { .. } => ErrorKind::Exhausted,
            Self::UnknownMatch(_) | Self::InvalidResult { .. } | Self::Validation(_) => {
                ErrorKind::InvalidInput
            }
        }
    }

    /// Whether the caller should report this as a fixable setup problem.
    pub fn is_configuration_error(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}

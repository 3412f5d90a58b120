//! Scheduling domain models.
//!
//! Plain data types for competitive events. Behavior is limited to
//! navigation (dependencies, participants, resources) and small
//! constructors; all scheduling logic lives in the engine modules.
//!
//! # Domain Mappings
//!
//! | u-fixture | Scheduling role |
//! |-----------|-----------------|
//! | Match | Activity |
//! | Field | Resource |
//! | TimeSlot | Availability window |
//! | Team / Official | Participant |
//! | Event | Problem instance + solution |

mod calendar;
mod division;
mod event;
mod field;
mod graph;
mod matches;
mod official;
mod record;
mod team;
mod time_slot;

pub use calendar::{add_ms, blocking_end, day_index, round_up, SlotCalendar, TimeWindow};
pub use division::Division;
pub use event::{Event, EventKind, LeagueOptions, MatchRules, TournamentOptions};
pub use field::Field;
pub use graph::{DependencyGraph, Schedulable};
pub use matches::{Match, MatchSide, MatchTable};
pub use official::Official;
pub use record::{MatchRecord, ScheduleWarning, WarningKind};
pub use team::{Team, PLACEHOLDER_PREFIX};
pub use time_slot::{TimeSlot, MINUTES_PER_DAY};

//! Match scheduling for competitive events.
//!
//! Builds elimination brackets and round-robin leagues, packs the resulting
//! matches onto fields and recurring time slots, and keeps the schedule
//! consistent as results come in or event parameters change.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Event`, `Team`, `Field`, `TimeSlot`,
//!   `Official`, `Division`, `Match`, plus the `Schedulable` and
//!   `DependencyGraph` navigation traits
//! - **`scheduler`**: Resource-constrained placement (`Scheduler`) and the
//!   cascading time shift for dependants
//! - **`bracket`**: Single and double elimination brackets, chronological
//!   match numbering
//! - **`builder`**: Full event build: leagues, playoffs, placeholders,
//!   referee assignment
//! - **`reschedule`**: Replanning around locked matches
//! - **`result`**: Applying completed results
//! - **`validation`**: Input integrity checks (duplicate IDs, dangling
//!   references, match-graph cycles, malformed slots)
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use u_fixture::models::{Event, EventKind, Field, Team, TournamentOptions};
//! use u_fixture::{build_event_schedule, SchedulerConfig};
//!
//! let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
//! let mut event = Event::new(
//!     "spring-cup",
//!     EventKind::Tournament(TournamentOptions::single_elimination()),
//!     start,
//!     start,
//! )
//! .with_field(Field::new("court-1", 1));
//! for seed in 1..=4 {
//!     event = event.with_team(Team::new(format!("team-{seed}"), seed, "open"));
//! }
//!
//! build_event_schedule(&mut event, &SchedulerConfig::default()).unwrap();
//! assert_eq!(event.matches.len(), 3);
//! ```
//!
//! # References
//!
//! - Kirkman (1847), "On a problem in combinations"
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"

pub mod bracket;
pub mod builder;
pub mod config;
pub mod error;
pub mod models;
pub mod reschedule;
pub mod result;
pub mod scheduler;
pub mod validation;

pub use builder::build_event_schedule;
pub use config::SchedulerConfig;
pub use error::{ErrorKind, Result, SchedulingError};
pub use reschedule::reschedule_event_matches_preserving_locks;
pub use result::{finalize_match, Finalized, MatchResult};
pub use scheduler::{reschedule_following_events, shift_times, Scheduler};

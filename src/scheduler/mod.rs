//! Resource-constrained placement and cascade rescheduling.
//!
//! # Algorithm
//!
//! `Scheduler` is a greedy, dependency-aware, earliest-available-field
//! heuristic. Items are placed one at a time in the order the caller
//! chooses; each placement is final for the pass. It is not optimal, but
//! it is deterministic and fast.
//!
//! `shift` propagates an actual end time through dependants and field
//! neighbours without re-running placement.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3-4
//! - Kolisch (1996), "Serial and parallel resource-constrained project
//!   scheduling methods revisited"

mod engine;
pub mod shift;

pub use engine::{Placement, Scheduler};
pub use shift::{reschedule_following_events, shift_times};

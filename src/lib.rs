//! Student Retroplanner
//!
//! Backward-planning engine for savings goals of students with an academic
//! calendar:
//! - Estimates weekly earning capacity from events, commitments and energy
//! - Distributes the goal over weeks in proportion to capacity
//! - Shifts work into early high-capacity weeks
//! - Scores feasibility and redistributes shortfalls as catch-up
//! - Projects the plan onto a month/week/day calendar
//!
//! GENERATION:
//! CAPACITY → MILESTONES → FRONT-LOAD → FEASIBILITY → RETROPLAN

pub mod api;
pub mod audit;
pub mod calendar;
pub mod capacity;
pub mod catch_up;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod feasibility;
pub mod milestones;
pub mod models;
pub mod optimizer;
pub mod planner;
pub mod state;

#[cfg(test)]
pub mod test_utils;

pub use error::{Result, RetroplanError};

// Re-export common types
pub use catch_up::{apply_catch_up, CatchUpOutcome};
pub use models::*;
pub use planner::RetroplanGenerator;

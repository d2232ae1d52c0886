//! Error types for the retroplanning engine

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for retroplanning operations
pub type Result<T> = std::result::Result<T, RetroplanError>;

#[derive(Error, Debug)]
pub enum RetroplanError {

    // =============================
    // Validation Errors
    // =============================

    #[error("Planning horizon is empty: deadline {deadline} is not after start {start}")]
    EmptyHorizon { start: NaiveDate, deadline: NaiveDate },

    #[error("Total capacity score is zero across {weeks} week(s)")]
    ZeroCapacity { weeks: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // =============================
    // Service Errors
    // =============================

    #[error("No active retroplan for goal {0}")]
    PlanNotFound(Uuid),

    #[error("State persistence error: {0}")]
    StateError(String),

    #[error("Audit error: {0}")]
    AuditError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("UUID parse error: {0}")]
    UuidError(#[from] uuid::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl RetroplanError {
    /// Errors caused by the caller's input rather than the service
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RetroplanError::EmptyHorizon { .. }
                | RetroplanError::ZeroCapacity { .. }
                | RetroplanError::InvalidInput(_)
        )
    }
}

//! Error taxonomy for the import pipeline.
//!
//! Two failure classes exist: run-fatal errors raised at parse time
//! (`Format`, `LimitExceeded`) and record-level errors that are caught at
//! the record boundary and downgraded to a summary entry (`Validation`,
//! `NotFound`, `Conflict`, `Storage`).

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The payload container or one of its fields cannot be decoded.
    #[error("Invalid import payload: {0}")]
    Format(String),

    /// The payload declares more quizzes than the configured cap allows.
    /// Kept distinct from [`ImportError::Format`] so callers can respond
    /// with an entity-too-large style signal.
    #[error("Import exceeds the maximum of {max} quizzes ({found} declared)")]
    LimitExceeded { max: u32, found: usize },

    /// A record violates a strategy or field requirement.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A named reference could not be resolved and auto-creation is off.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A uniqueness race that persisted through the single retry.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The storage collaborator failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ImportError {
    /// Returns `true` for parse-time errors that abort the whole run
    /// before any record is processed.
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, Self::Format(_) | Self::LimitExceeded { .. })
    }
}

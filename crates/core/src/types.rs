//! Shared type aliases used across the workspace.

/// Identifier for catalog entities (quizzes, questions, categories, tags, users).
pub type DbId = uuid::Uuid;

/// UTC timestamp used across the workspace.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

//! Collaborator contracts the reconciliation engine depends on.
//!
//! The engine never talks to a database directly; it drives a
//! [`CatalogStore`] for persistence and a [`CapabilityProbe`] for the one
//! permission question it asks. `quizmill-db` provides the PostgreSQL
//! implementations.

use async_trait::async_trait;

use quizmill_core::catalog::{CategoryRef, Quiz, TagRef};
use quizmill_core::types::DbId;
use quizmill_core::ImportError;

/// Failures surfaced by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected a write, e.g. two writers racing
    /// on the same tag name.
    #[error("unique violation: {0}")]
    UniqueViolation(String),

    /// Any other backend failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for ImportError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(detail) => ImportError::Conflict(detail),
            StoreError::Backend(detail) => ImportError::Storage(detail),
        }
    }
}

/// Persistence operations the engine needs, plus explicit transaction
/// demarcation. The engine, not the store, decides where record
/// boundaries fall: `begin` / `commit` bracket each non-dry-run record
/// and `rollback` discards exactly that record's writes.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn begin(&mut self) -> Result<(), StoreError>;
    async fn commit(&mut self) -> Result<(), StoreError>;
    async fn rollback(&mut self) -> Result<(), StoreError>;

    /// Load a quiz with its tags and questions.
    async fn find_quiz_by_id(&mut self, id: DbId) -> Result<Option<Quiz>, StoreError>;

    /// Look up a quiz by canonical import hash, scoped to its creator.
    async fn find_quiz_by_import_hash(
        &mut self,
        creator_id: DbId,
        hash: &str,
    ) -> Result<Option<Quiz>, StoreError>;

    async fn quiz_exists(&mut self, id: DbId) -> Result<bool, StoreError>;

    /// Insert or fully replace a quiz and its associations.
    async fn save_quiz(&mut self, quiz: &Quiz) -> Result<(), StoreError>;

    /// Case-insensitive category lookup by normalized name.
    async fn find_category_by_name(
        &mut self,
        normalized: &str,
    ) -> Result<Option<CategoryRef>, StoreError>;

    async fn create_category(&mut self, name: &str) -> Result<CategoryRef, StoreError>;

    /// The fallback category applied when a record names none.
    async fn default_category(&mut self) -> Result<CategoryRef, StoreError>;

    /// Case-insensitive batch tag lookup by normalized names.
    async fn find_tags_by_names(
        &mut self,
        normalized: &[String],
    ) -> Result<Vec<TagRef>, StoreError>;

    async fn create_tag(&mut self, name: &str) -> Result<TagRef, StoreError>;
}

/// Permission question asked once per created quiz.
#[async_trait]
pub trait CapabilityProbe: Send + Sync {
    async fn has_moderation_capability(&self, actor_id: DbId) -> Result<bool, StoreError>;
}

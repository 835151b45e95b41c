//! Quizmill import reconciliation engine.
//!
//! Exposes the engine and its collaborator contracts so integration tests
//! and the storage crate can both access them:
//!
//! - [`ImportService`] — parses a payload and reconciles each record
//!   against the catalog under the selected strategy.
//! - [`CatalogStore`] / [`CapabilityProbe`] — the persistence and
//!   permission seams, implemented by `quizmill-db` in production.
//! - [`ReferenceResolver`] — run-scoped category/tag name resolution.

pub mod engine;
pub mod resolver;
pub mod store;

pub use engine::ImportService;
pub use resolver::{normalize_name, ReferenceResolver};
pub use store::{CapabilityProbe, CatalogStore, StoreError};

//! Quizmill import domain library.
//!
//! Pure building blocks shared by the reconciliation engine and the
//! storage layer:
//!
//! - [`record`] — the canonical [`ImportRecord`] both channels decode into.
//! - [`tabular`] / [`document`] — the XLSX workbook and JSON parsers.
//! - [`cells`] — uniform scalar cell decoding rules.
//! - [`hashing`] — canonical JSON digests for change detection and
//!   duplicate matching.
//! - [`review`] — the visibility / review status rules.
//! - [`summary`] — outcome aggregation for one run.
//! - [`error`] — the [`ImportError`] taxonomy.
//!
//! No database or async code lives here.

pub mod catalog;
pub mod cells;
pub mod document;
pub mod error;
pub mod hashing;
pub mod options;
pub mod record;
pub mod review;
pub mod summary;
pub mod tabular;
pub mod types;

pub use catalog::{CategoryRef, Quiz, QuizQuestion, QuizStatus, TagRef};
pub use error::ImportError;
pub use options::{ImportFormat, ImportOptions, ImportStrategy};
pub use record::{Difficulty, ImportRecord, QuestionRecord, QuestionType, Visibility};
pub use summary::{ImportSummary, RecordOutcome, SummaryBuilder};

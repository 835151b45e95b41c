//! Persisted catalog types as the import engine sees them.
//!
//! These are engine-side views, not database rows; `quizmill-db` maps its
//! row structs into them when loading a quiz with associations.

use serde::{Deserialize, Serialize};

use crate::record::{Difficulty, QuestionType, Visibility};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Quiz status
// ---------------------------------------------------------------------------

/// Review-workflow status of a persisted quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuizStatus {
    Draft,
    PendingReview,
    Published,
}

impl QuizStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::PendingReview => "PENDING_REVIEW",
            Self::Published => "PUBLISHED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(Self::Draft),
            "PENDING_REVIEW" => Some(Self::PendingReview),
            "PUBLISHED" => Some(Self::Published),
            _ => None,
        }
    }

    pub const ALL: &'static [&'static str] = &["DRAFT", "PENDING_REVIEW", "PUBLISHED"];
}

impl std::fmt::Display for QuizStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

/// A resolved category reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: DbId,
    pub name: String,
}

/// A resolved tag reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    pub id: DbId,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Quiz
// ---------------------------------------------------------------------------

/// A question owned by a persisted quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: DbId,
    pub question_type: QuestionType,
    pub difficulty: Option<Difficulty>,
    pub text: String,
    pub hint: Option<String>,
    pub explanation: Option<String>,
    pub attachment_url: Option<String>,
    pub content: serde_json::Value,
}

/// A persisted quiz with its associations loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: DbId,
    pub creator_id: DbId,
    pub category: CategoryRef,
    pub tags: Vec<TagRef>,
    pub title: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub difficulty: Difficulty,
    pub estimated_time_minutes: Option<i32>,
    pub questions: Vec<QuizQuestion>,
    pub status: QuizStatus,
    /// Digest over substantive fields; gates review transitions.
    pub content_hash: String,
    /// Digest over formatting-only fields; tracked, never gating.
    pub presentation_hash: String,
    /// Canonical record hash, scoped per creator, written by the
    /// hash-matching strategies only.
    pub import_content_hash: Option<String>,
    pub reviewed_at: Option<Timestamp>,
    pub reviewed_by: Option<DbId>,
    pub rejection_reason: Option<String>,
}

impl Quiz {
    /// Drop review metadata, e.g. when a published quiz re-enters review.
    pub fn clear_review_metadata(&mut self) {
        self.reviewed_at = None;
        self.reviewed_by = None;
        self.rejection_reason = None;
    }
}

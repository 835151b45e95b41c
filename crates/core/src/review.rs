//! Pure review-workflow rules.
//!
//! The state machine, as the reconciliation engine applies it:
//!
//! - DRAFT --(moderator, PUBLIC request at create)--> PUBLISHED
//! - PUBLISHED --(reconciled content change)--> PENDING_REVIEW
//! - PENDING_REVIEW --(any reconciled update)--> DRAFT
//! - a non-moderator's PUBLIC request lands in PRIVATE/DRAFT
//!
//! No transition deletes a quiz.

use crate::catalog::QuizStatus;
use crate::record::Visibility;

/// Effective visibility and status for a newly created quiz.
///
/// PUBLIC is reachable only for a moderation-capable actor; anyone else
/// requesting it is coerced to PRIVATE. New PUBLISHED status exists only
/// on this path.
pub fn initial_state(requested: Visibility, moderator: bool) -> (Visibility, QuizStatus) {
    match (requested, moderator) {
        (Visibility::Public, true) => (Visibility::Public, QuizStatus::Published),
        (Visibility::Public, false) => (Visibility::Private, QuizStatus::Draft),
        (Visibility::Private, _) => (Visibility::Private, QuizStatus::Draft),
    }
}

/// Status after a reconciled update of an existing quiz.
///
/// A PENDING_REVIEW quiz drops to DRAFT on any update, even a
/// content-unchanged one.
pub fn status_after_merge(current: QuizStatus, content_changed: bool) -> QuizStatus {
    match current {
        QuizStatus::Published if content_changed => QuizStatus::PendingReview,
        QuizStatus::Published => QuizStatus::Published,
        QuizStatus::PendingReview => QuizStatus::Draft,
        QuizStatus::Draft => QuizStatus::Draft,
    }
}

//! Quiz and quiz-question rows, plus the mapping into the engine-side
//! [`Quiz`] view.
//!
//! Enum columns are stored as their canonical upper-case strings; a value
//! that no longer parses is reported as a corrupt-row error rather than
//! silently defaulted.

use sqlx::FromRow;

use quizmill_core::catalog::{CategoryRef, Quiz, QuizQuestion, QuizStatus, TagRef};
use quizmill_core::record::{Difficulty, QuestionType, Visibility};
use quizmill_core::types::{DbId, Timestamp};

/// A row from the `quizzes` table joined with its category name.
#[derive(Debug, Clone, FromRow)]
pub struct QuizRow {
    pub id: DbId,
    pub creator_id: DbId,
    pub category_id: DbId,
    pub category_name: String,
    pub title: String,
    pub description: Option<String>,
    pub visibility: String,
    pub difficulty: String,
    pub estimated_time_minutes: Option<i32>,
    pub status: String,
    pub content_hash: String,
    pub presentation_hash: String,
    pub import_content_hash: Option<String>,
    pub reviewed_at: Option<Timestamp>,
    pub reviewed_by: Option<DbId>,
    pub rejection_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `quiz_questions` table.
#[derive(Debug, Clone, FromRow)]
pub struct QuizQuestionRow {
    pub id: DbId,
    pub quiz_id: DbId,
    pub question_type: String,
    pub difficulty: Option<String>,
    pub text: String,
    pub hint: Option<String>,
    pub explanation: Option<String>,
    pub attachment_url: Option<String>,
    pub content: serde_json::Value,
    pub position: i32,
}

fn corrupt(column: &str, value: &str) -> String {
    format!("corrupt {column} value '{value}'")
}

impl QuizRow {
    /// Assemble the engine-side view from this row and its associations.
    pub fn into_quiz(
        self,
        tags: Vec<TagRef>,
        questions: Vec<QuizQuestion>,
    ) -> Result<Quiz, String> {
        let visibility = Visibility::from_str(&self.visibility)
            .ok_or_else(|| corrupt("visibility", &self.visibility))?;
        let difficulty = Difficulty::from_str(&self.difficulty)
            .ok_or_else(|| corrupt("difficulty", &self.difficulty))?;
        let status =
            QuizStatus::from_str(&self.status).ok_or_else(|| corrupt("status", &self.status))?;

        Ok(Quiz {
            id: self.id,
            creator_id: self.creator_id,
            category: CategoryRef {
                id: self.category_id,
                name: self.category_name,
            },
            tags,
            title: self.title,
            description: self.description,
            visibility,
            difficulty,
            estimated_time_minutes: self.estimated_time_minutes,
            questions,
            status,
            content_hash: self.content_hash,
            presentation_hash: self.presentation_hash,
            import_content_hash: self.import_content_hash,
            reviewed_at: self.reviewed_at,
            reviewed_by: self.reviewed_by,
            rejection_reason: self.rejection_reason,
        })
    }
}

impl QuizQuestionRow {
    pub fn into_question(self) -> Result<QuizQuestion, String> {
        let question_type = QuestionType::from_str(&self.question_type)
            .ok_or_else(|| corrupt("question_type", &self.question_type))?;
        let difficulty = match self.difficulty.as_deref() {
            Some(value) => {
                Some(Difficulty::from_str(value).ok_or_else(|| corrupt("difficulty", value))?)
            }
            None => None,
        };

        Ok(QuizQuestion {
            id: self.id,
            question_type,
            difficulty,
            text: self.text,
            hint: self.hint,
            explanation: self.explanation,
            attachment_url: self.attachment_url,
            content: self.content,
        })
    }
}

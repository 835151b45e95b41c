//! Repository for the `quizzes` table and its association tables.
//!
//! `save` fully replaces a quiz: the row is upserted by id and the tag and
//! question associations are rewritten, so the persisted state always
//! mirrors the reconciled [`Quiz`] exactly. Callers run it inside the
//! engine's per-record transaction.

use sqlx::PgConnection;

use quizmill_core::catalog::Quiz;
use quizmill_core::types::DbId;

use crate::models::quiz::{QuizQuestionRow, QuizRow};
use crate::models::reference::TagRow;

/// Column list for `quizzes` queries, joined with the category name.
const QUIZ_COLUMNS: &str = "\
    q.id, q.creator_id, q.category_id, c.name AS category_name, q.title, \
    q.description, q.visibility, q.difficulty, q.estimated_time_minutes, \
    q.status, q.content_hash, q.presentation_hash, q.import_content_hash, \
    q.reviewed_at, q.reviewed_by, q.rejection_reason, q.created_at, q.updated_at";

/// Column list for `quiz_questions` queries.
const QUESTION_COLUMNS: &str = "\
    id, quiz_id, question_type, difficulty, text, hint, explanation, \
    attachment_url, content, position";

pub struct QuizRepo;

impl QuizRepo {
    pub async fn find_row_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<QuizRow>, sqlx::Error> {
        let query = format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes q \
             JOIN categories c ON c.id = q.category_id \
             WHERE q.id = $1"
        );
        sqlx::query_as::<_, QuizRow>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Import-hash lookup, scoped to the creator.
    pub async fn find_row_by_import_hash(
        conn: &mut PgConnection,
        creator_id: DbId,
        hash: &str,
    ) -> Result<Option<QuizRow>, sqlx::Error> {
        let query = format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes q \
             JOIN categories c ON c.id = q.category_id \
             WHERE q.creator_id = $1 AND q.import_content_hash = $2"
        );
        sqlx::query_as::<_, QuizRow>(&query)
            .bind(creator_id)
            .bind(hash)
            .fetch_optional(conn)
            .await
    }

    pub async fn exists(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM quizzes WHERE id = $1)")
            .bind(id)
            .fetch_one(conn)
            .await
    }

    /// Tags of a quiz in their attached order.
    pub async fn tags_for(
        conn: &mut PgConnection,
        quiz_id: DbId,
    ) -> Result<Vec<TagRow>, sqlx::Error> {
        sqlx::query_as::<_, TagRow>(
            "SELECT t.id, t.name, t.created_at FROM tags t \
             JOIN quiz_tags qt ON qt.tag_id = t.id \
             WHERE qt.quiz_id = $1 \
             ORDER BY qt.position",
        )
        .bind(quiz_id)
        .fetch_all(conn)
        .await
    }

    /// Questions of a quiz in their stored order.
    pub async fn questions_for(
        conn: &mut PgConnection,
        quiz_id: DbId,
    ) -> Result<Vec<QuizQuestionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {QUESTION_COLUMNS} FROM quiz_questions \
             WHERE quiz_id = $1 \
             ORDER BY position"
        );
        sqlx::query_as::<_, QuizQuestionRow>(&query)
            .bind(quiz_id)
            .fetch_all(conn)
            .await
    }

    /// Upsert the quiz row and rewrite its tag and question associations.
    pub async fn save(conn: &mut PgConnection, quiz: &Quiz) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO quizzes (id, creator_id, category_id, title, description, \
                 visibility, difficulty, estimated_time_minutes, status, content_hash, \
                 presentation_hash, import_content_hash, reviewed_at, reviewed_by, \
                 rejection_reason) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             ON CONFLICT (id) DO UPDATE SET \
                 category_id = EXCLUDED.category_id, \
                 title = EXCLUDED.title, \
                 description = EXCLUDED.description, \
                 visibility = EXCLUDED.visibility, \
                 difficulty = EXCLUDED.difficulty, \
                 estimated_time_minutes = EXCLUDED.estimated_time_minutes, \
                 status = EXCLUDED.status, \
                 content_hash = EXCLUDED.content_hash, \
                 presentation_hash = EXCLUDED.presentation_hash, \
                 import_content_hash = EXCLUDED.import_content_hash, \
                 reviewed_at = EXCLUDED.reviewed_at, \
                 reviewed_by = EXCLUDED.reviewed_by, \
                 rejection_reason = EXCLUDED.rejection_reason, \
                 updated_at = now()",
        )
        .bind(quiz.id)
        .bind(quiz.creator_id)
        .bind(quiz.category.id)
        .bind(&quiz.title)
        .bind(&quiz.description)
        .bind(quiz.visibility.as_str())
        .bind(quiz.difficulty.as_str())
        .bind(quiz.estimated_time_minutes)
        .bind(quiz.status.as_str())
        .bind(&quiz.content_hash)
        .bind(&quiz.presentation_hash)
        .bind(&quiz.import_content_hash)
        .bind(quiz.reviewed_at)
        .bind(quiz.reviewed_by)
        .bind(&quiz.rejection_reason)
        .execute(&mut *conn)
        .await?;

        sqlx::query("DELETE FROM quiz_tags WHERE quiz_id = $1")
            .bind(quiz.id)
            .execute(&mut *conn)
            .await?;
        for (position, tag) in quiz.tags.iter().enumerate() {
            sqlx::query("INSERT INTO quiz_tags (quiz_id, tag_id, position) VALUES ($1, $2, $3)")
                .bind(quiz.id)
                .bind(tag.id)
                .bind(position as i32)
                .execute(&mut *conn)
                .await?;
        }

        sqlx::query("DELETE FROM quiz_questions WHERE quiz_id = $1")
            .bind(quiz.id)
            .execute(&mut *conn)
            .await?;
        for (position, question) in quiz.questions.iter().enumerate() {
            sqlx::query(
                "INSERT INTO quiz_questions (id, quiz_id, question_type, difficulty, \
                     text, hint, explanation, attachment_url, content, position) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(question.id)
            .bind(quiz.id)
            .bind(question.question_type.as_str())
            .bind(question.difficulty.map(|d| d.as_str()))
            .bind(&question.text)
            .bind(&question.hint)
            .bind(&question.explanation)
            .bind(&question.attachment_url)
            .bind(&question.content)
            .bind(position as i32)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }
}

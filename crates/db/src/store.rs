//! PostgreSQL implementation of the engine's collaborator contracts.
//!
//! [`PgCatalogStore`] carries the pool plus an optional open transaction.
//! While the engine holds a transaction open, every operation runs on it;
//! otherwise a pooled connection is acquired per call.

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::debug;

use quizmill_core::catalog::{CategoryRef, Quiz, TagRef};
use quizmill_core::types::DbId;
use quizmill_importer::store::{CapabilityProbe, CatalogStore, StoreError};

use crate::repositories::{CategoryRepo, QuizRepo, TagRepo};

/// Map a sqlx failure into the storage contract. PostgreSQL class `23505`
/// is the unique violation the resolver retries on.
fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some("23505") {
            return StoreError::UniqueViolation(db_err.message().to_string());
        }
    }
    StoreError::Backend(err.to_string())
}

enum ConnHandle<'a> {
    Tx(&'a mut PgConnection),
    Pooled(PoolConnection<Postgres>),
}

impl ConnHandle<'_> {
    fn as_mut(&mut self) -> &mut PgConnection {
        match self {
            Self::Tx(conn) => conn,
            Self::Pooled(conn) => &mut *conn,
        }
    }
}

pub struct PgCatalogStore {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, tx: None }
    }

    async fn conn(&mut self) -> Result<ConnHandle<'_>, StoreError> {
        match self.tx {
            Some(ref mut tx) => Ok(ConnHandle::Tx(&mut **tx)),
            None => {
                let conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
                Ok(ConnHandle::Pooled(conn))
            }
        }
    }
}

async fn load_quiz(
    conn: &mut PgConnection,
    row: crate::models::quiz::QuizRow,
) -> Result<Quiz, StoreError> {
    let quiz_id = row.id;
    let tags: Vec<TagRef> = QuizRepo::tags_for(conn, quiz_id)
        .await
        .map_err(map_sqlx_error)?
        .into_iter()
        .map(TagRef::from)
        .collect();
    let questions = QuizRepo::questions_for(conn, quiz_id)
        .await
        .map_err(map_sqlx_error)?
        .into_iter()
        .map(|q| q.into_question())
        .collect::<Result<Vec<_>, _>>()
        .map_err(StoreError::Backend)?;
    row.into_quiz(tags, questions).map_err(StoreError::Backend)
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn begin(&mut self) -> Result<(), StoreError> {
        if self.tx.is_some() {
            return Err(StoreError::Backend("transaction already open".to_string()));
        }
        self.tx = Some(self.pool.begin().await.map_err(map_sqlx_error)?);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        match self.tx.take() {
            Some(tx) => tx.commit().await.map_err(map_sqlx_error),
            None => Err(StoreError::Backend("no open transaction".to_string())),
        }
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        match self.tx.take() {
            Some(tx) => {
                debug!("rolling back record transaction");
                tx.rollback().await.map_err(map_sqlx_error)
            }
            None => Err(StoreError::Backend("no open transaction".to_string())),
        }
    }

    async fn find_quiz_by_id(&mut self, id: DbId) -> Result<Option<Quiz>, StoreError> {
        let mut handle = self.conn().await?;
        let conn = handle.as_mut();
        match QuizRepo::find_row_by_id(conn, id).await.map_err(map_sqlx_error)? {
            Some(row) => Ok(Some(load_quiz(conn, row).await?)),
            None => Ok(None),
        }
    }

    async fn find_quiz_by_import_hash(
        &mut self,
        creator_id: DbId,
        hash: &str,
    ) -> Result<Option<Quiz>, StoreError> {
        let mut handle = self.conn().await?;
        let conn = handle.as_mut();
        match QuizRepo::find_row_by_import_hash(conn, creator_id, hash)
            .await
            .map_err(map_sqlx_error)?
        {
            Some(row) => Ok(Some(load_quiz(conn, row).await?)),
            None => Ok(None),
        }
    }

    async fn quiz_exists(&mut self, id: DbId) -> Result<bool, StoreError> {
        let mut handle = self.conn().await?;
        QuizRepo::exists(handle.as_mut(), id)
            .await
            .map_err(map_sqlx_error)
    }

    async fn save_quiz(&mut self, quiz: &Quiz) -> Result<(), StoreError> {
        let mut handle = self.conn().await?;
        QuizRepo::save(handle.as_mut(), quiz)
            .await
            .map_err(map_sqlx_error)
    }

    async fn find_category_by_name(
        &mut self,
        normalized: &str,
    ) -> Result<Option<CategoryRef>, StoreError> {
        let mut handle = self.conn().await?;
        Ok(CategoryRepo::find_by_name(handle.as_mut(), normalized)
            .await
            .map_err(map_sqlx_error)?
            .map(CategoryRef::from))
    }

    async fn create_category(&mut self, name: &str) -> Result<CategoryRef, StoreError> {
        let mut handle = self.conn().await?;
        Ok(CategoryRepo::create(handle.as_mut(), name)
            .await
            .map_err(map_sqlx_error)?
            .into())
    }

    async fn default_category(&mut self) -> Result<CategoryRef, StoreError> {
        let mut handle = self.conn().await?;
        CategoryRepo::default_category(handle.as_mut())
            .await
            .map_err(map_sqlx_error)?
            .map(CategoryRef::from)
            .ok_or_else(|| StoreError::Backend("default category is not seeded".to_string()))
    }

    async fn find_tags_by_names(
        &mut self,
        normalized: &[String],
    ) -> Result<Vec<TagRef>, StoreError> {
        let mut handle = self.conn().await?;
        Ok(TagRepo::find_by_names(handle.as_mut(), normalized)
            .await
            .map_err(map_sqlx_error)?
            .into_iter()
            .map(TagRef::from)
            .collect())
    }

    async fn create_tag(&mut self, name: &str) -> Result<TagRef, StoreError> {
        let mut handle = self.conn().await?;
        Ok(TagRepo::create(handle.as_mut(), name)
            .await
            .map_err(map_sqlx_error)?
            .into())
    }
}

/// Answers the moderation question from the `users.role` column.
pub struct PgCapabilityProbe {
    pool: PgPool,
}

impl PgCapabilityProbe {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CapabilityProbe for PgCapabilityProbe {
    async fn has_moderation_capability(&self, actor_id: DbId) -> Result<bool, StoreError> {
        let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
            .bind(actor_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(matches!(role.as_deref(), Some("MODERATOR") | Some("ADMIN")))
    }
}

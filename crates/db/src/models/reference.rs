//! Category and tag rows.

use sqlx::FromRow;

use quizmill_core::catalog::{CategoryRef, TagRef};
use quizmill_core::types::{DbId, Timestamp};

/// A row from the `categories` table.
#[derive(Debug, Clone, FromRow)]
pub struct CategoryRow {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
}

impl From<CategoryRow> for CategoryRef {
    fn from(row: CategoryRow) -> Self {
        CategoryRef {
            id: row.id,
            name: row.name,
        }
    }
}

/// A row from the `tags` table.
#[derive(Debug, Clone, FromRow)]
pub struct TagRow {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
}

impl From<TagRow> for TagRef {
    fn from(row: TagRow) -> Self {
        TagRef {
            id: row.id,
            name: row.name,
        }
    }
}

//! Repository for the `categories` table.

use sqlx::PgConnection;

use crate::models::reference::CategoryRow;

/// Column list for `categories` queries.
const CATEGORY_COLUMNS: &str = "id, name, created_at";

/// Name of the seeded fallback category.
pub const DEFAULT_CATEGORY_NAME: &str = "general";

pub struct CategoryRepo;

impl CategoryRepo {
    /// Case-insensitive lookup by normalized (lower-cased, trimmed) name.
    pub async fn find_by_name(
        conn: &mut PgConnection,
        normalized: &str,
    ) -> Result<Option<CategoryRow>, sqlx::Error> {
        let query = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE LOWER(name) = $1");
        sqlx::query_as::<_, CategoryRow>(&query)
            .bind(normalized)
            .fetch_optional(conn)
            .await
    }

    /// Insert a category, preserving the caller's display casing. A
    /// concurrent insert of the same normalized name surfaces as a unique
    /// violation for the resolver's retry path.
    pub async fn create(conn: &mut PgConnection, name: &str) -> Result<CategoryRow, sqlx::Error> {
        let query =
            format!("INSERT INTO categories (name) VALUES ($1) RETURNING {CATEGORY_COLUMNS}");
        sqlx::query_as::<_, CategoryRow>(&query)
            .bind(name)
            .fetch_one(conn)
            .await
    }

    /// The seeded fallback category.
    pub async fn default_category(
        conn: &mut PgConnection,
    ) -> Result<Option<CategoryRow>, sqlx::Error> {
        Self::find_by_name(conn, DEFAULT_CATEGORY_NAME).await
    }
}

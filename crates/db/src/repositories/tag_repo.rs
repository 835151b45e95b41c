//! Repository for the `tags` table.

use sqlx::PgConnection;

use crate::models::reference::TagRow;

/// Column list for `tags` queries.
const TAG_COLUMNS: &str = "id, name, created_at";

pub struct TagRepo;

impl TagRepo {
    /// Case-insensitive batch lookup by normalized names.
    pub async fn find_by_names(
        conn: &mut PgConnection,
        normalized: &[String],
    ) -> Result<Vec<TagRow>, sqlx::Error> {
        let query = format!("SELECT {TAG_COLUMNS} FROM tags WHERE LOWER(name) = ANY($1)");
        sqlx::query_as::<_, TagRow>(&query)
            .bind(normalized)
            .fetch_all(conn)
            .await
    }

    /// Insert a tag, preserving the caller's display casing. A concurrent
    /// insert of the same normalized name surfaces as a unique violation
    /// for the resolver's retry path.
    pub async fn create(conn: &mut PgConnection, name: &str) -> Result<TagRow, sqlx::Error> {
        let query = format!("INSERT INTO tags (name) VALUES ($1) RETURNING {TAG_COLUMNS}");
        sqlx::query_as::<_, TagRow>(&query)
            .bind(name)
            .fetch_one(conn)
            .await
    }
}

//! PostgreSQL implementation of the GroupViewStore port.
//!
//! The materialized view is stored as one JSONB document per group plus a
//! version column for the optimistic check. Since the log can rebuild any
//! document, the table carries no schema beyond that.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use crate::domain::foundation::{ErrorCode, GroupError, GroupId, UserId};
use crate::domain::group::Group;
use crate::ports::GroupViewStore;

/// PostgreSQL implementation of the GroupViewStore port.
///
/// Uses sqlx for type-safe database operations with connection pooling.
pub struct PostgresGroupViewStore {
    pool: PgPool,
}

impl PostgresGroupViewStore {
    /// Creates a new PostgresGroupViewStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `group_views` table if it does not exist.
    ///
    /// # Errors
    ///
    /// `StorageError` if the DDL fails.
    pub async fn ensure_schema(&self) -> Result<(), GroupError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS group_views (
                group_id TEXT PRIMARY KEY,
                document JSONB NOT NULL,
                version BIGINT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| GroupError::storage(format!("Failed to create group_views table: {}", e)))?;

        Ok(())
    }
}

/// Database row representation of a group view.
#[derive(Debug, sqlx::FromRow)]
struct GroupViewRow {
    document: JsonValue,
    version: i64,
}

impl TryFrom<GroupViewRow> for Group {
    type Error = GroupError;

    fn try_from(row: GroupViewRow) -> Result<Self, Self::Error> {
        let mut group: Group = serde_json::from_value(row.document)
            .map_err(|e| GroupError::storage(format!("Invalid group document: {}", e)))?;
        // The version column is authoritative; older documents may predate
        // the embedded field.
        group.version = row.version as u64;
        Ok(group)
    }
}

fn encode_document(group: &Group) -> Result<JsonValue, GroupError> {
    serde_json::to_value(group)
        .map_err(|e| GroupError::storage(format!("group serialization failed: {}", e)))
}

fn version_conflict(group_id: &GroupId, expected_version: u64) -> GroupError {
    GroupError::new(
        ErrorCode::VersionConflict,
        format!(
            "Group '{}' was modified concurrently (write expected version {})",
            group_id, expected_version
        ),
    )
}

#[async_trait]
impl GroupViewStore for PostgresGroupViewStore {
    async fn get(&self, group_id: &GroupId) -> Result<Option<Group>, GroupError> {
        let row: Option<GroupViewRow> = sqlx::query_as(
            r#"
            SELECT document, version FROM group_views WHERE group_id = $1
            "#,
        )
        .bind(group_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GroupError::storage(format!("Failed to load group view: {}", e)))?;

        row.map(Group::try_from).transpose()
    }

    async fn put(&self, group: &Group, expected_version: u64) -> Result<(), GroupError> {
        let document = encode_document(group)?;

        if expected_version == 0 {
            let result = sqlx::query(
                r#"
                INSERT INTO group_views (group_id, document, version)
                VALUES ($1, $2, $3)
                ON CONFLICT (group_id) DO NOTHING
                "#,
            )
            .bind(group.group_id.as_str())
            .bind(&document)
            .bind(group.version as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| GroupError::storage(format!("Failed to insert group view: {}", e)))?;

            if result.rows_affected() == 0 {
                return Err(version_conflict(&group.group_id, expected_version));
            }
            return Ok(());
        }

        let result = sqlx::query(
            r#"
            UPDATE group_views
            SET document = $2, version = $3
            WHERE group_id = $1 AND version = $4
            "#,
        )
        .bind(group.group_id.as_str())
        .bind(&document)
        .bind(group.version as i64)
        .bind(expected_version as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| GroupError::storage(format!("Failed to update group view: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(version_conflict(&group.group_id, expected_version));
        }
        Ok(())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Group>, GroupError> {
        let rows: Vec<GroupViewRow> = sqlx::query_as(
            r#"
            SELECT document, version FROM group_views
            WHERE EXISTS (
                SELECT 1 FROM jsonb_array_elements(document->'members') AS member
                WHERE member->>'user_id' = $1
            )
            ORDER BY document->>'created_at' ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GroupError::storage(format!("Failed to list groups for user: {}", e)))?;

        rows.into_iter().map(Group::try_from).collect()
    }

    async fn search_public(&self, query: &str) -> Result<Vec<Group>, GroupError> {
        let rows: Vec<GroupViewRow> = sqlx::query_as(
            r#"
            SELECT document, version FROM group_views
            WHERE document->>'visibility' = 'Public'
              AND document->>'name' ILIKE '%' || $1 || '%'
            ORDER BY document->>'name' ASC
            "#,
        )
        .bind(query)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GroupError::storage(format!("Failed to search groups: {}", e)))?;

        rows.into_iter().map(Group::try_from).collect()
    }
}

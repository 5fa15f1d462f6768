//! PostgreSQL implementation of the EventLog port.
//!
//! Events live in an append-only `group_events` table. Per-group sequence
//! numbers are assigned inside the INSERT from the current per-group maximum;
//! a unique index on `(group_id, sequence)` turns a concurrent append into a
//! retryable storage error instead of a duplicate sequence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::domain::foundation::{EventId, GroupError, GroupId, Timestamp};
use crate::domain::group::{GroupEvent, StoredEvent};
use crate::ports::EventLog;

/// PostgreSQL implementation of the EventLog port.
///
/// Uses sqlx for type-safe database operations with connection pooling.
pub struct PostgresEventLog {
    pool: PgPool,
}

impl PostgresEventLog {
    /// Creates a new PostgresEventLog with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `group_events` table and its indexes if they do not exist.
    ///
    /// # Errors
    ///
    /// `StorageError` if the DDL fails.
    pub async fn ensure_schema(&self) -> Result<(), GroupError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS group_events (
                id BIGSERIAL PRIMARY KEY,
                event_id UUID NOT NULL UNIQUE,
                group_id TEXT NOT NULL,
                sequence BIGINT NOT NULL,
                event_type TEXT NOT NULL,
                payload JSONB NOT NULL,
                recorded_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| GroupError::storage(format!("Failed to create group_events table: {}", e)))?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS group_events_group_sequence
            ON group_events (group_id, sequence)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| GroupError::storage(format!("Failed to create event index: {}", e)))?;

        Ok(())
    }
}

/// Database row representation of a stored event.
#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    event_id: Uuid,
    group_id: String,
    sequence: i64,
    event_type: String,
    payload: JsonValue,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for StoredEvent {
    type Error = GroupError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(StoredEvent {
            event_id: EventId::from_uuid(row.event_id),
            group_id: GroupId::new(row.group_id)
                .map_err(|e| GroupError::storage(format!("Invalid group_id in row: {}", e)))?,
            sequence: row.sequence as u64,
            event_type: row.event_type,
            payload: row.payload,
            recorded_at: Timestamp::from_datetime(row.recorded_at),
        })
    }
}

#[async_trait]
impl EventLog for PostgresEventLog {
    async fn append(&self, event: &GroupEvent) -> Result<StoredEvent, GroupError> {
        let payload = event
            .payload()
            .map_err(|e| GroupError::storage(format!("event serialization failed: {}", e)))?;
        let event_id = EventId::new();
        let recorded_at = Timestamp::now();

        let sequence: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO group_events (event_id, group_id, sequence, event_type, payload, recorded_at)
            SELECT $1, $2, COALESCE(MAX(sequence), 0) + 1, $3, $4, $5
            FROM group_events WHERE group_id = $2
            RETURNING sequence
            "#,
        )
        .bind(event_id.as_uuid())
        .bind(event.group_id().as_str())
        .bind(event.event_type())
        .bind(&payload)
        .bind(recorded_at.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| GroupError::storage(format!("Failed to append event: {}", e)))?;

        debug!(
            group_id = %event.group_id(),
            sequence,
            event_type = %event.event_type(),
            "event appended"
        );
        Ok(StoredEvent {
            event_id,
            group_id: event.group_id().clone(),
            sequence: sequence as u64,
            event_type: event.event_type().to_string(),
            payload,
            recorded_at,
        })
    }

    async fn events(&self, group_id: &GroupId) -> Result<Vec<StoredEvent>, GroupError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT event_id, group_id, sequence, event_type, payload, recorded_at
            FROM group_events
            WHERE group_id = $1
            ORDER BY sequence ASC
            "#,
        )
        .bind(group_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GroupError::storage(format!("Failed to load events: {}", e)))?;

        rows.into_iter().map(StoredEvent::try_from).collect()
    }

    async fn events_after(
        &self,
        group_id: &GroupId,
        after: u64,
    ) -> Result<Vec<StoredEvent>, GroupError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT event_id, group_id, sequence, event_type, payload, recorded_at
            FROM group_events
            WHERE group_id = $1 AND sequence > $2
            ORDER BY sequence ASC
            "#,
        )
        .bind(group_id.as_str())
        .bind(after as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GroupError::storage(format!("Failed to load events: {}", e)))?;

        rows.into_iter().map(StoredEvent::try_from).collect()
    }

    async fn events_by_type(
        &self,
        group_id: &GroupId,
        event_type: &str,
    ) -> Result<Vec<StoredEvent>, GroupError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT event_id, group_id, sequence, event_type, payload, recorded_at
            FROM group_events
            WHERE group_id = $1 AND event_type = $2
            ORDER BY sequence ASC
            "#,
        )
        .bind(group_id.as_str())
        .bind(event_type)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GroupError::storage(format!("Failed to load events: {}", e)))?;

        rows.into_iter().map(StoredEvent::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_row_converts_to_stored_event() {
        let row = EventRow {
            event_id: Uuid::new_v4(),
            group_id: "group_1700000000000_abcd1234".to_string(),
            sequence: 7,
            event_type: "MemberAdded".to_string(),
            payload: json!({"user_id": "user-b"}),
            recorded_at: Utc::now(),
        };
        let stored = StoredEvent::try_from(row).unwrap();
        assert_eq!(stored.sequence, 7);
        assert_eq!(stored.event_type, "MemberAdded");
    }

    #[test]
    fn event_row_with_blank_group_id_is_rejected() {
        let row = EventRow {
            event_id: Uuid::new_v4(),
            group_id: "  ".to_string(),
            sequence: 1,
            event_type: "MemberAdded".to_string(),
            payload: json!({}),
            recorded_at: Utc::now(),
        };
        assert!(StoredEvent::try_from(row).is_err());
    }
}

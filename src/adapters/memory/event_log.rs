//! In-memory event log for tests and single-process deployments.
//!
//! Synchronous and deterministic: sequence numbers are assigned under one
//! lock in insertion order, which makes replay order reproducible in tests.
//!
//! # Panics
//!
//! Methods panic if internal locks are poisoned. Acceptable for test code;
//! production deployments should use the Postgres adapter.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

use crate::domain::foundation::{EventId, GroupError, GroupId, Timestamp};
use crate::domain::group::{GroupEvent, StoredEvent};
use crate::ports::EventLog;

/// In-memory implementation of the EventLog port.
pub struct InMemoryEventLog {
    events: RwLock<HashMap<GroupId, Vec<StoredEvent>>>,
}

impl InMemoryEventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
        }
    }

    /// Number of events recorded for a group (for test assertions).
    pub fn event_count(&self, group_id: &GroupId) -> usize {
        self.events
            .read()
            .expect("InMemoryEventLog: lock poisoned")
            .get(group_id)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Event types recorded for a group, in order (for test assertions).
    pub fn event_types(&self, group_id: &GroupId) -> Vec<String> {
        self.events
            .read()
            .expect("InMemoryEventLog: lock poisoned")
            .get(group_id)
            .map(|events| events.iter().map(|e| e.event_type.clone()).collect())
            .unwrap_or_default()
    }
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, event: &GroupEvent) -> Result<StoredEvent, GroupError> {
        let payload = event
            .payload()
            .map_err(|e| GroupError::storage(format!("event serialization failed: {}", e)))?;

        let mut events = self
            .events
            .write()
            .expect("InMemoryEventLog: lock poisoned");
        let group_events = events.entry(event.group_id().clone()).or_default();

        let stored = StoredEvent {
            event_id: EventId::new(),
            group_id: event.group_id().clone(),
            sequence: group_events.len() as u64 + 1,
            event_type: event.event_type().to_string(),
            payload,
            recorded_at: Timestamp::now(),
        };
        debug!(
            group_id = %stored.group_id,
            sequence = stored.sequence,
            event_type = %stored.event_type,
            "event appended"
        );
        group_events.push(stored.clone());
        Ok(stored)
    }

    async fn events(&self, group_id: &GroupId) -> Result<Vec<StoredEvent>, GroupError> {
        Ok(self
            .events
            .read()
            .expect("InMemoryEventLog: lock poisoned")
            .get(group_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn events_after(
        &self,
        group_id: &GroupId,
        after: u64,
    ) -> Result<Vec<StoredEvent>, GroupError> {
        Ok(self
            .events(group_id)
            .await?
            .into_iter()
            .filter(|e| e.sequence > after)
            .collect())
    }

    async fn events_by_type(
        &self,
        group_id: &GroupId,
        event_type: &str,
    ) -> Result<Vec<StoredEvent>, GroupError> {
        Ok(self
            .events(group_id)
            .await?
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Amount, UserId};
    use crate::domain::group::events::ContributionMade;

    fn contribution(group: &str, user: &str, amount: f64) -> GroupEvent {
        GroupEvent::ContributionMade(ContributionMade {
            group_id: GroupId::new(group).unwrap(),
            user_id: UserId::new(user).unwrap(),
            amount: Amount::new(amount).unwrap(),
            contributed_at: Timestamp::now(),
        })
    }

    #[tokio::test]
    async fn append_assigns_increasing_sequences() {
        let log = InMemoryEventLog::new();
        let gid = GroupId::new("group_1").unwrap();
        let first = log.append(&contribution("group_1", "a", 10.0)).await.unwrap();
        let second = log.append(&contribution("group_1", "b", 20.0)).await.unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);

        let events = log.events(&gid).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].sequence, 1);
        assert_eq!(events[1].sequence, 2);
    }

    #[tokio::test]
    async fn events_after_returns_only_the_tail() {
        let log = InMemoryEventLog::new();
        let gid = GroupId::new("group_1").unwrap();
        log.append(&contribution("group_1", "a", 10.0)).await.unwrap();
        log.append(&contribution("group_1", "b", 20.0)).await.unwrap();
        log.append(&contribution("group_1", "c", 30.0)).await.unwrap();

        let tail = log.events_after(&gid, 1).await.unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].sequence, 2);

        assert!(log.events_after(&gid, 3).await.unwrap().is_empty());
        assert_eq!(log.events_after(&gid, 0).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn logs_for_different_groups_are_independent() {
        let log = InMemoryEventLog::new();
        log.append(&contribution("group_1", "a", 10.0)).await.unwrap();
        log.append(&contribution("group_2", "a", 10.0)).await.unwrap();

        assert_eq!(log.event_count(&GroupId::new("group_1").unwrap()), 1);
        assert_eq!(log.event_count(&GroupId::new("group_2").unwrap()), 1);
        let events = log.events(&GroupId::new("group_2").unwrap()).await.unwrap();
        assert_eq!(events[0].sequence, 1);
    }

    #[tokio::test]
    async fn events_by_type_preserves_order() {
        let log = InMemoryEventLog::new();
        let gid = GroupId::new("group_1").unwrap();
        log.append(&contribution("group_1", "a", 10.0)).await.unwrap();
        log.append(&contribution("group_1", "b", 20.0)).await.unwrap();

        let events = log.events_by_type(&gid, "ContributionMade").await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].sequence < events[1].sequence);

        let none = log.events_by_type(&gid, "PayoutProcessed").await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn events_for_unknown_group_is_empty() {
        let log = InMemoryEventLog::new();
        let events = log.events(&GroupId::new("missing").unwrap()).await.unwrap();
        assert!(events.is_empty());
    }
}

//! EventLog port - the append-only store of group domain events.
//!
//! This is the durability boundary and the source of truth: once `append`
//! returns, the event is authoritative and the materialized view must
//! eventually reflect it. Events are never mutated or removed.

use async_trait::async_trait;

use crate::domain::foundation::{GroupError, GroupId};
use crate::domain::group::{GroupEvent, StoredEvent};

/// Port for the per-group ordered event store.
///
/// Implementations must guarantee:
/// - `append` assigns each event a per-group sequence number that is
///   strictly increasing in insertion order, so replay has a stable total
///   order even when timestamps tie
/// - `events` / `events_by_type` return events oldest first
/// - durability on successful `append` return
///
/// Failures are surfaced as `StorageError`, which callers may retry.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Appends one immutable event to the group's log and returns the
    /// stored record, including its assigned sequence number.
    ///
    /// # Errors
    ///
    /// `StorageError` on storage-layer failure only; the log performs no
    /// domain validation.
    async fn append(&self, event: &GroupEvent) -> Result<StoredEvent, GroupError>;

    /// All events for a group, oldest first.
    async fn events(&self, group_id: &GroupId) -> Result<Vec<StoredEvent>, GroupError>;

    /// Events with a sequence number greater than `after`, oldest first.
    ///
    /// This is how the view maintainer asks "is the log ahead of this
    /// view"; `after == 0` is equivalent to [`events`](Self::events).
    async fn events_after(
        &self,
        group_id: &GroupId,
        after: u64,
    ) -> Result<Vec<StoredEvent>, GroupError>;

    /// Events of one type for a group, oldest first.
    async fn events_by_type(
        &self,
        group_id: &GroupId,
        event_type: &str,
    ) -> Result<Vec<StoredEvent>, GroupError>;
}

//! View maintenance: loading, updating, and rebuilding the materialized view.
//!
//! The view store is a cache over the event log. Every command handler goes
//! through [`ViewMaintainer`] so that a missing or dropped view is
//! transparently rebuilt by replay, and every persisted mutation carries the
//! optimistic version bump.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::foundation::{GroupError, GroupId};
use crate::domain::group::{Group, GroupEvent, Projector};
use crate::ports::{EventLog, GroupViewStore};

/// Keeps the materialized view consistent with the event log.
pub struct ViewMaintainer {
    event_log: Arc<dyn EventLog>,
    view_store: Arc<dyn GroupViewStore>,
}

impl ViewMaintainer {
    pub fn new(event_log: Arc<dyn EventLog>, view_store: Arc<dyn GroupViewStore>) -> Self {
        Self {
            event_log,
            view_store,
        }
    }

    /// Loads the view for a group, replaying the log on a cache miss.
    ///
    /// A cached view records the sequence of the last event folded into it;
    /// if the log has moved past that (a crash or persist failure between
    /// append and put), the tail is folded in here before the view is
    /// returned, so callers never validate against state the log has
    /// already contradicted. Repairs are persisted best-effort.
    ///
    /// Returns `None` when the log holds no applicable events for the group
    /// either, meaning the group does not exist.
    ///
    /// # Errors
    ///
    /// `StorageError` from either port.
    pub async fn load(&self, group_id: &GroupId) -> Result<Option<Group>, GroupError> {
        if let Some(group) = self.view_store.get(group_id).await? {
            let tail = self
                .event_log
                .events_after(group_id, group.last_sequence)
                .await?;
            if tail.is_empty() {
                return Ok(Some(group));
            }
            info!(
                group_id = %group_id,
                behind = tail.len(),
                "view behind log, catching up"
            );
            let expected_version = group.version;
            let mut caught_up = tail
                .iter()
                .fold(Some(group), Projector::apply_stored)
                .ok_or_else(|| GroupError::storage("catch-up fold produced no view"))?;
            caught_up.version = expected_version + 1;
            self.persist_repair(&caught_up, expected_version).await;
            return Ok(Some(caught_up));
        }

        let events = self.event_log.events(group_id).await?;
        if events.is_empty() {
            return Ok(None);
        }
        info!(group_id = %group_id, events = events.len(), "view missing, rebuilding from log");
        let Some(mut group) = Projector::replay(&events) else {
            return Ok(None);
        };
        group.version = 1;
        self.persist_repair(&group, 0).await;
        Ok(Some(group))
    }

    /// Best-effort persistence of a repaired view.
    ///
    /// Failures are logged, not surfaced: the caller already holds a
    /// correct view and the next load repairs again.
    async fn persist_repair(&self, group: &Group, expected_version: u64) {
        if let Err(err) = self.view_store.put(group, expected_version).await {
            warn!(
                group_id = %group.group_id,
                error = %err,
                "repaired view not persisted"
            );
        }
    }

    /// Appends events to the log, folds them into the view, and persists the
    /// result under the optimistic version check.
    ///
    /// `state` is the current view, or `None` when the first event creates
    /// the group. The events become authoritative as soon as their append
    /// returns; a failure persisting the view afterwards leaves a stale
    /// cache, which the next [`load`](Self::load) detects by sequence and
    /// catches up from the log.
    ///
    /// # Errors
    ///
    /// - `StorageError` on append or persistence failure
    /// - `VersionConflict` if another writer updated the view concurrently
    pub async fn commit(
        &self,
        state: Option<Group>,
        events: &[GroupEvent],
    ) -> Result<Group, GroupError> {
        let expected_version = state.as_ref().map(|g| g.version).unwrap_or(0);
        let mut state = state;
        for event in events {
            let stored = self.event_log.append(event).await?;
            state = Projector::apply_stored(state, &stored);
        }
        let mut group = state.ok_or_else(|| {
            GroupError::storage("projection produced no group from committed events")
        })?;
        group.version = expected_version + 1;
        self.view_store.put(&group, expected_version).await?;
        Ok(group)
    }

    /// Discards the cached view and rebuilds it from the full log.
    ///
    /// Returns the rebuilt view, or `None` when the log holds no applicable
    /// events.
    ///
    /// # Errors
    ///
    /// - `StorageError` from either port
    /// - `VersionConflict` if a writer raced the rebuild
    pub async fn rebuild(&self, group_id: &GroupId) -> Result<Option<Group>, GroupError> {
        let events = self.event_log.events(group_id).await?;
        let Some(mut group) = Projector::replay(&events) else {
            return Ok(None);
        };

        let expected_version = self
            .view_store
            .get(group_id)
            .await?
            .map(|g| g.version)
            .unwrap_or(0);
        group.version = expected_version + 1;
        self.view_store.put(&group, expected_version).await?;
        info!(group_id = %group_id, events = events.len(), "view rebuilt from log");
        Ok(Some(group))
    }
}

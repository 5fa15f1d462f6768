//! In-memory materialized-view store for tests and single-process use.
//!
//! # Panics
//!
//! Methods panic if internal locks are poisoned. Acceptable for test code;
//! production deployments should use the Postgres adapter.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::foundation::{ErrorCode, GroupError, GroupId, UserId};
use crate::domain::group::{Group, Visibility};
use crate::ports::GroupViewStore;

/// In-memory implementation of the GroupViewStore port.
pub struct InMemoryGroupViewStore {
    groups: RwLock<HashMap<GroupId, Group>>,
}

impl InMemoryGroupViewStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored views (for test assertions).
    pub fn len(&self) -> usize {
        self.groups
            .read()
            .expect("InMemoryGroupViewStore: lock poisoned")
            .len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryGroupViewStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GroupViewStore for InMemoryGroupViewStore {
    async fn get(&self, group_id: &GroupId) -> Result<Option<Group>, GroupError> {
        Ok(self
            .groups
            .read()
            .expect("InMemoryGroupViewStore: lock poisoned")
            .get(group_id)
            .cloned())
    }

    async fn put(&self, group: &Group, expected_version: u64) -> Result<(), GroupError> {
        let mut groups = self
            .groups
            .write()
            .expect("InMemoryGroupViewStore: lock poisoned");

        let stored_version = groups.get(&group.group_id).map(|g| g.version).unwrap_or(0);
        if stored_version != expected_version {
            return Err(GroupError::new(
                ErrorCode::VersionConflict,
                format!(
                    "Group '{}' version is {} but write expected {}",
                    group.group_id, stored_version, expected_version
                ),
            ));
        }
        groups.insert(group.group_id.clone(), group.clone());
        Ok(())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Group>, GroupError> {
        Ok(self
            .groups
            .read()
            .expect("InMemoryGroupViewStore: lock poisoned")
            .values()
            .filter(|g| g.is_member(user_id))
            .cloned()
            .collect())
    }

    async fn search_public(&self, query: &str) -> Result<Vec<Group>, GroupError> {
        let query = query.to_lowercase();
        Ok(self
            .groups
            .read()
            .expect("InMemoryGroupViewStore: lock poisoned")
            .values()
            .filter(|g| {
                g.visibility == Visibility::Public && g.name.to_lowercase().contains(&query)
            })
            .cloned()
            .collect())
    }
}

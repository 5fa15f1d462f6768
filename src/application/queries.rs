//! Read-side queries over the materialized view.
//!
//! Queries never touch the per-group command locks; they read whatever the
//! view store currently holds (rebuilding on a cache miss via the
//! maintainer).

use std::sync::Arc;

use crate::application::projection::ViewMaintainer;
use crate::domain::foundation::{GroupError, GroupId, UserId};
use crate::domain::group::{Group, JoinRequest};
use crate::ports::GroupViewStore;

/// Read-only access to group views.
pub struct GroupQueries {
    views: Arc<ViewMaintainer>,
    view_store: Arc<dyn GroupViewStore>,
}

impl GroupQueries {
    pub fn new(views: Arc<ViewMaintainer>, view_store: Arc<dyn GroupViewStore>) -> Self {
        Self { views, view_store }
    }

    /// The full view of one group.
    ///
    /// # Errors
    ///
    /// `GroupNotFound` if neither the store nor the log knows the group.
    pub async fn get_group(&self, group_id: &GroupId) -> Result<Group, GroupError> {
        self.views
            .load(group_id)
            .await?
            .ok_or_else(|| GroupError::group_not_found(group_id))
    }

    /// All groups the user belongs to.
    pub async fn get_user_groups(&self, user_id: &UserId) -> Result<Vec<Group>, GroupError> {
        self.view_store.list_for_user(user_id).await
    }

    /// Public groups whose name matches the query, case-insensitively.
    pub async fn search_public_groups(&self, query: &str) -> Result<Vec<Group>, GroupError> {
        self.view_store.search_public(query).await
    }

    /// Join requests still awaiting a decision.
    ///
    /// # Errors
    ///
    /// `GroupNotFound` if the group does not exist.
    pub async fn pending_join_requests(
        &self,
        group_id: &GroupId,
    ) -> Result<Vec<JoinRequest>, GroupError> {
        let group = self.get_group(group_id).await?;
        Ok(group.pending_requests().into_iter().cloned().collect())
    }
}

//! RequestJoinHandler - command handler for a user asking to join a group.
//!
//! Preconditions run in the order the upstream service checked them: group
//! visibility, existing membership, duplicate pending request, capacity,
//! rejection cooldown, lifetime rejection ban. The cooldown and ban counters
//! read `JoinRequestRejected` events straight from the log because terminal
//! request states in the view do not carry rejection timestamps.

use std::sync::Arc;

use tracing::info;

use crate::application::projection::ViewMaintainer;
use crate::config::EngineConfig;
use crate::domain::foundation::{
    ErrorCode, GroupError, GroupId, RequestId, Timestamp, UserId,
};
use crate::domain::group::events::JoinRequestCreated;
use crate::domain::group::{GroupEvent, JoinRequest, Visibility};
use crate::ports::EventLog;

/// Command for a user requesting to join a group.
#[derive(Debug, Clone)]
pub struct RequestJoinCommand {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub username: String,
}

/// Handler for join requests.
pub struct RequestJoinHandler {
    views: Arc<ViewMaintainer>,
    event_log: Arc<dyn EventLog>,
    policy: EngineConfig,
}

impl RequestJoinHandler {
    pub fn new(
        views: Arc<ViewMaintainer>,
        event_log: Arc<dyn EventLog>,
        policy: EngineConfig,
    ) -> Self {
        Self {
            views,
            event_log,
            policy,
        }
    }

    /// Records a `JoinRequestCreated` after all preconditions pass and
    /// returns the new request.
    ///
    /// # Errors
    ///
    /// - `GroupNotFound` if the group does not exist
    /// - `PermissionDenied` for private groups
    /// - `AlreadyMember`, `DuplicatePendingRequest`, `GroupFull`
    /// - `RecentlyRejected` within the cooldown window
    /// - `JoinBanned` at or past the rejection threshold
    /// - `StorageError` / `VersionConflict` from persistence
    pub async fn handle(&self, cmd: RequestJoinCommand) -> Result<JoinRequest, GroupError> {
        let group = self
            .views
            .load(&cmd.group_id)
            .await?
            .ok_or_else(|| GroupError::group_not_found(&cmd.group_id))?;

        if group.visibility != Visibility::Public {
            return Err(GroupError::new(
                ErrorCode::PermissionDenied,
                "Cannot request to join private groups",
            ));
        }
        if group.is_member(&cmd.user_id) {
            return Err(GroupError::new(
                ErrorCode::AlreadyMember,
                "User is already a member of this group",
            ));
        }
        if group.has_pending_request(&cmd.user_id) {
            return Err(GroupError::new(
                ErrorCode::DuplicatePendingRequest,
                "User already has a pending request for this group",
            ));
        }
        if group.is_full() {
            return Err(GroupError::new(ErrorCode::GroupFull, "Group is full"));
        }

        let rejections = self.rejections_for(&cmd.group_id, &cmd.user_id).await?;
        let cutoff = Timestamp::now().minus_days(i64::from(self.policy.cooldown_days));
        if rejections.iter().any(|at| at.is_after(&cutoff)) {
            return Err(GroupError::new(
                ErrorCode::RecentlyRejected,
                "You were recently rejected from this group. Please wait before requesting again.",
            )
            .with_detail("cooldown_days", self.policy.cooldown_days.to_string()));
        }
        if rejections.len() as u32 >= self.policy.ban_threshold {
            return Err(GroupError::new(
                ErrorCode::JoinBanned,
                "You have been rejected from this group multiple times and cannot request to join again.",
            )
            .with_detail("rejections", rejections.len().to_string()));
        }

        let request_id = RequestId::new();
        let event = GroupEvent::JoinRequestCreated(JoinRequestCreated {
            group_id: cmd.group_id.clone(),
            request_id,
            user_id: cmd.user_id.clone(),
            username: cmd.username,
            requested_at: Timestamp::now(),
        });

        let group = self.views.commit(Some(group), &[event]).await?;
        info!(
            group_id = %cmd.group_id,
            user_id = %cmd.user_id,
            request_id = %request_id,
            "join request created"
        );
        group
            .request(&request_id)
            .cloned()
            .ok_or_else(|| GroupError::storage("created request missing from updated view"))
    }

    /// Rejection timestamps for the user in this group, oldest first.
    async fn rejections_for(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<Vec<Timestamp>, GroupError> {
        let events = self
            .event_log
            .events_by_type(group_id, "JoinRequestRejected")
            .await?;

        let mut rejected_at = Vec::new();
        for stored in &events {
            // Malformed historical payloads are skipped, matching replay.
            if let Ok(GroupEvent::JoinRequestRejected(p)) = stored.decode() {
                if &p.user_id == user_id {
                    rejected_at.push(p.rejected_at);
                }
            }
        }
        Ok(rejected_at)
    }
}

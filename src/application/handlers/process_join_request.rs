//! ProcessJoinRequestHandler - admin decision on a pending join request.
//!
//! Accepting emits `MemberAdded` then `JoinRequestProcessed`; rejecting
//! emits `JoinRequestRejected` then `JoinRequestProcessed`. Both events of a
//! decision are appended in that order so a replayed log tells the same
//! story the live path did.

use std::sync::Arc;

use tracing::info;

use crate::application::projection::ViewMaintainer;
use crate::domain::foundation::{ErrorCode, GroupError, GroupId, RequestId, Timestamp, UserId};
use crate::domain::group::events::{JoinRequestProcessed, JoinRequestRejected, MemberAdded};
use crate::domain::group::{Group, GroupEvent, JoinAction, JoinRequestState, MemberRole};

/// Command to accept or reject a join request.
#[derive(Debug, Clone)]
pub struct ProcessJoinRequestCommand {
    pub group_id: GroupId,
    pub request_id: RequestId,
    pub action: JoinAction,
    pub processed_by: UserId,
}

/// Result of a processed join request.
#[derive(Debug, Clone)]
pub struct ProcessJoinRequestResult {
    pub group: Group,
    pub request_id: RequestId,
    pub action: JoinAction,
}

/// Handler for processing join requests.
pub struct ProcessJoinRequestHandler {
    views: Arc<ViewMaintainer>,
}

impl ProcessJoinRequestHandler {
    pub fn new(views: Arc<ViewMaintainer>) -> Self {
        Self { views }
    }

    /// Applies the decision and returns the updated view.
    ///
    /// # Errors
    ///
    /// - `GroupNotFound` / `RequestNotFound`
    /// - `PermissionDenied` unless the caller is the group admin or a member
    ///   with a moderating role
    /// - `RequestAlreadyProcessed` for terminal requests
    /// - `GroupFull` / `AlreadyMember` when accepting would break those
    ///   invariants (capacity may have filled since the request was made)
    /// - `StorageError` / `VersionConflict` from persistence
    pub async fn handle(
        &self,
        cmd: ProcessJoinRequestCommand,
    ) -> Result<ProcessJoinRequestResult, GroupError> {
        let group = self
            .views
            .load(&cmd.group_id)
            .await?
            .ok_or_else(|| GroupError::group_not_found(&cmd.group_id))?;

        if !group.can_moderate(&cmd.processed_by) {
            return Err(GroupError::new(
                ErrorCode::PermissionDenied,
                "Only group admins can process join requests",
            ));
        }

        let request = group
            .request(&cmd.request_id)
            .ok_or_else(|| {
                GroupError::new(ErrorCode::RequestNotFound, "Join request not found")
                    .with_detail("request_id", cmd.request_id.to_string())
            })?
            .clone();
        if request.state != JoinRequestState::Waiting {
            return Err(GroupError::new(
                ErrorCode::RequestAlreadyProcessed,
                "Join request already processed",
            )
            .with_detail("state", format!("{:?}", request.state)));
        }

        let now = Timestamp::now();
        let processed = GroupEvent::JoinRequestProcessed(JoinRequestProcessed {
            group_id: cmd.group_id.clone(),
            request_id: cmd.request_id,
            user_id: request.user_id.clone(),
            action: cmd.action,
            processed_by: cmd.processed_by.clone(),
            processed_at: now,
        });

        let events = match cmd.action {
            JoinAction::Accept => {
                if group.is_full() {
                    return Err(GroupError::new(ErrorCode::GroupFull, "Group is full"));
                }
                if group.is_member(&request.user_id) {
                    return Err(GroupError::new(
                        ErrorCode::AlreadyMember,
                        "User is already a member of this group",
                    ));
                }
                vec![
                    GroupEvent::MemberAdded(MemberAdded {
                        group_id: cmd.group_id.clone(),
                        user_id: request.user_id.clone(),
                        username: request.username.clone(),
                        role: MemberRole::Member,
                        added_at: now,
                    }),
                    processed,
                ]
            }
            JoinAction::Reject => vec![
                GroupEvent::JoinRequestRejected(JoinRequestRejected {
                    group_id: cmd.group_id.clone(),
                    user_id: request.user_id.clone(),
                    rejected_by: cmd.processed_by.clone(),
                    rejected_at: now,
                }),
                processed,
            ],
        };

        let group = self.views.commit(Some(group), &events).await?;
        info!(
            group_id = %cmd.group_id,
            request_id = %cmd.request_id,
            action = %cmd.action,
            processed_by = %cmd.processed_by,
            user_id = %request.user_id,
            "join request processed"
        );
        Ok(ProcessJoinRequestResult {
            group,
            request_id: cmd.request_id,
            action: cmd.action,
        })
    }
}

//! CreateGroupHandler - command handler for creating a savings group.

use std::sync::Arc;

use tracing::info;

use crate::application::projection::ViewMaintainer;
use crate::domain::foundation::{Amount, GroupError, GroupId, Timestamp, UserId};
use crate::domain::group::events::GroupCreated;
use crate::domain::group::{Frequency, Group, GroupEvent, Visibility};

/// Command to create a new group.
///
/// `member_ids` lists initial members beyond the admin; the admin is always
/// the first member regardless of whether the caller included them.
#[derive(Debug, Clone)]
pub struct CreateGroupCommand {
    pub admin_id: UserId,
    pub admin_username: String,
    pub name: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub min_contribution: Amount,
    pub max_members: u32,
    pub contribution_frequency: Frequency,
    pub payout_frequency: Frequency,
    pub member_ids: Vec<UserId>,
}

/// Handler for creating groups.
pub struct CreateGroupHandler {
    views: Arc<ViewMaintainer>,
}

impl CreateGroupHandler {
    pub fn new(views: Arc<ViewMaintainer>) -> Self {
        Self { views }
    }

    /// Validates the command, records `GroupCreated`, and returns the fresh
    /// view.
    ///
    /// The group starts with a zero balance; the founder's own contribution
    /// is recorded later like any other contribution.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` for an empty name, a non-positive minimum
    ///   contribution, a zero member cap, or more initial members than the
    ///   cap allows
    /// - `StorageError` / `VersionConflict` from persistence
    pub async fn handle(&self, cmd: CreateGroupCommand) -> Result<Group, GroupError> {
        if cmd.name.trim().is_empty() {
            return Err(GroupError::validation("name", "Group name is required"));
        }
        if cmd.min_contribution.is_zero() {
            return Err(GroupError::validation(
                "min_contribution",
                "Minimum contribution must be greater than 0",
            ));
        }
        if cmd.max_members == 0 {
            return Err(GroupError::validation(
                "max_members",
                "Maximum members must be greater than 0",
            ));
        }

        // Admin first, then the other initial members in the order given,
        // duplicates dropped.
        let mut member_ids = vec![cmd.admin_id.clone()];
        for id in &cmd.member_ids {
            if !member_ids.contains(id) {
                member_ids.push(id.clone());
            }
        }
        if member_ids.len() as u32 > cmd.max_members {
            return Err(GroupError::validation(
                "member_ids",
                "Number of initial members cannot exceed maximum members",
            ));
        }

        let group_id = GroupId::generate();
        let event = GroupEvent::GroupCreated(GroupCreated {
            group_id: group_id.clone(),
            admin_id: cmd.admin_id,
            admin_username: cmd.admin_username,
            name: cmd.name,
            description: cmd.description,
            visibility: cmd.visibility,
            min_contribution: cmd.min_contribution,
            max_members: cmd.max_members,
            contribution_frequency: cmd.contribution_frequency,
            payout_frequency: cmd.payout_frequency,
            member_ids,
            created_at: Timestamp::now(),
        });

        let group = self.views.commit(None, &[event]).await?;
        info!(group_id = %group.group_id, name = %group.name, "group created");
        Ok(group)
    }
}

//! RecordContributionHandler - records a member's contribution to the pool.

use std::sync::Arc;

use tracing::info;

use crate::application::projection::ViewMaintainer;
use crate::domain::foundation::{Amount, ErrorCode, GroupError, GroupId, Timestamp, UserId};
use crate::domain::group::events::ContributionMade;
use crate::domain::group::{Group, GroupEvent};

/// Command to record a contribution.
#[derive(Debug, Clone)]
pub struct RecordContributionCommand {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub amount: Amount,
}

/// Handler for recording contributions.
pub struct RecordContributionHandler {
    views: Arc<ViewMaintainer>,
}

impl RecordContributionHandler {
    pub fn new(views: Arc<ViewMaintainer>) -> Self {
        Self { views }
    }

    /// Records a `ContributionMade`, crediting the pool balance and the
    /// member's running total.
    ///
    /// # Errors
    ///
    /// - `GroupNotFound` / `MemberNotFound`
    /// - `ValidationFailed` when the amount is below the group minimum
    /// - `StorageError` / `VersionConflict` from persistence
    pub async fn handle(&self, cmd: RecordContributionCommand) -> Result<Group, GroupError> {
        let group = self
            .views
            .load(&cmd.group_id)
            .await?
            .ok_or_else(|| GroupError::group_not_found(&cmd.group_id))?;

        if !group.is_member(&cmd.user_id) {
            return Err(GroupError::new(
                ErrorCode::MemberNotFound,
                "Only members can contribute to a group",
            )
            .with_detail("user_id", cmd.user_id.to_string()));
        }
        if cmd.amount.value() < group.min_contribution.value() {
            return Err(GroupError::validation(
                "amount",
                format!(
                    "Contribution {} is below the group minimum of {}",
                    cmd.amount, group.min_contribution
                ),
            ));
        }

        let event = GroupEvent::ContributionMade(ContributionMade {
            group_id: cmd.group_id.clone(),
            user_id: cmd.user_id.clone(),
            amount: cmd.amount,
            contributed_at: Timestamp::now(),
        });

        let group = self.views.commit(Some(group), &[event]).await?;
        info!(
            group_id = %cmd.group_id,
            user_id = %cmd.user_id,
            amount = %cmd.amount,
            "contribution recorded"
        );
        Ok(group)
    }
}

//! PayoutEngine - deterministic round-robin payout rotation.
//!
//! The rotation order is seeded lazily from member join order and advanced
//! by `PayoutProcessed` events in the projector; this engine only decides
//! who is next and records the fact. Late joiners are appended to the end of
//! an initialized order and existing members never move.

use std::sync::Arc;

use tracing::info;

use crate::application::projection::ViewMaintainer;
use crate::domain::foundation::{Amount, ErrorCode, GroupError, GroupId, Timestamp, UserId};
use crate::domain::group::events::PayoutProcessed;
use crate::domain::group::{Frequency, Group, GroupEvent, MemberRole};

/// Who receives the next payout, with the rotation context around it.
///
/// Mirrors the read-model shape the upstream service exposed.
#[derive(Debug, Clone)]
pub struct NextPayee {
    pub group_id: GroupId,
    pub group_name: String,
    pub recipient_id: UserId,
    pub recipient_username: String,
    pub recipient_role: MemberRole,
    /// Position in the rotation, already reduced modulo the order length.
    pub current_position: u32,
    pub total_members: u32,
    pub group_balance: Amount,
    pub last_payout_recipient: Option<UserId>,
    pub last_payout_date: Option<Timestamp>,
    pub payout_frequency: Frequency,
    pub next_payout_date: Timestamp,
}

/// Command to record a payout to the member currently due.
#[derive(Debug, Clone)]
pub struct RecordPayoutCommand {
    pub group_id: GroupId,
    /// The recipient the caller believes is due. Guards against paying the
    /// wrong member off a stale read.
    pub recipient_id: UserId,
    pub amount: Amount,
}

/// Rotation queries and payout recording.
pub struct PayoutEngine {
    views: Arc<ViewMaintainer>,
}

impl PayoutEngine {
    pub fn new(views: Arc<ViewMaintainer>) -> Self {
        Self { views }
    }

    /// The member currently due a payout.
    ///
    /// # Errors
    ///
    /// - `GroupNotFound`
    /// - `NoMembers` for a group with an empty member list
    /// - `StorageError` from persistence
    pub async fn next_payee(&self, group_id: &GroupId) -> Result<NextPayee, GroupError> {
        let group = self
            .views
            .load(group_id)
            .await?
            .ok_or_else(|| GroupError::group_not_found(group_id))?;
        Self::next_payee_of(&group)
    }

    /// Records a `PayoutProcessed` for the member currently due and returns
    /// the rotation state after the advance.
    ///
    /// # Errors
    ///
    /// - `GroupNotFound` / `NoMembers`
    /// - `ValidationFailed` for a zero amount
    /// - `RecipientMismatch` when the caller's recipient is not the member
    ///   currently due
    /// - `StorageError` / `VersionConflict` from persistence
    pub async fn record_payout(&self, cmd: RecordPayoutCommand) -> Result<NextPayee, GroupError> {
        let group = self
            .views
            .load(&cmd.group_id)
            .await?
            .ok_or_else(|| GroupError::group_not_found(&cmd.group_id))?;

        if cmd.amount.is_zero() {
            return Err(GroupError::validation(
                "amount",
                "Payout amount must be greater than 0",
            ));
        }

        let due = Self::next_payee_of(&group)?;
        if due.recipient_id != cmd.recipient_id {
            return Err(GroupError::new(
                ErrorCode::RecipientMismatch,
                format!(
                    "Recipient '{}' is not next in the rotation; '{}' is due",
                    cmd.recipient_id, due.recipient_id
                ),
            )
            .with_detail("expected", due.recipient_id.to_string()));
        }

        let event = GroupEvent::PayoutProcessed(PayoutProcessed {
            group_id: cmd.group_id.clone(),
            recipient_id: cmd.recipient_id.clone(),
            amount: cmd.amount,
            payout_date: Timestamp::now(),
        });

        let group = self.views.commit(Some(group), &[event]).await?;
        info!(
            group_id = %cmd.group_id,
            recipient_id = %cmd.recipient_id,
            amount = %cmd.amount,
            position = group.current_payout_position,
            "payout recorded"
        );
        Self::next_payee_of(&group)
    }

    fn next_payee_of(group: &Group) -> Result<NextPayee, GroupError> {
        let order = group.effective_payout_order();
        let recipient = group.next_payee().ok_or_else(|| {
            GroupError::new(ErrorCode::NoMembers, "Group has no members to pay out to")
        })?;

        let anchor = group.last_payout_date.unwrap_or(group.created_at);
        Ok(NextPayee {
            group_id: group.group_id.clone(),
            group_name: group.name.clone(),
            recipient_id: recipient.user_id.clone(),
            recipient_username: recipient.username.clone(),
            recipient_role: recipient.role,
            current_position: group.current_payout_position % order.len() as u32,
            total_members: group.members.len() as u32,
            group_balance: group.balance,
            last_payout_recipient: group.last_payout_recipient.clone(),
            last_payout_date: group.last_payout_date,
            payout_frequency: group.payout_frequency,
            next_payout_date: anchor.add_days(group.payout_frequency.interval_days()),
        })
    }
}

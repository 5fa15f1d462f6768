//! Group aggregate entity.
//!
//! The Group is the consistency boundary of the engine: capacity, one
//! pending request per user, and payout-rotation determinism must all hold
//! within a single Group, and all mutating commands for one group are
//! serialized by the application layer.
//!
//! This materialized view is a cache. The event log is the source of truth
//! and the projector can always rebuild this struct from it.
//!
//! # Invariants
//!
//! - `members.len() <= max_members` at all times
//! - `members` unique by user id; the admin is a member with role `founder`
//!   from creation
//! - `payout_order`, once initialized, is a permutation of current member ids
//! - `balance` only changes through `ContributionMade` / `PayoutProcessed`
//!   events, never at creation

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Amount, GroupId, RequestId, Timestamp, UserId};

use super::{Frequency, JoinRequestState, MemberRole, Visibility};

/// A user's membership in a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: UserId,
    pub username: String,
    pub role: MemberRole,

    /// Running total of recorded contributions.
    pub contribution: Amount,

    pub joined_at: Timestamp,
    pub last_active: Timestamp,
}

impl Member {
    /// Creates a member joining at the given time with a zero contribution
    /// total.
    pub fn new(
        user_id: UserId,
        username: impl Into<String>,
        role: MemberRole,
        joined_at: Timestamp,
    ) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
            contribution: Amount::ZERO,
            joined_at,
            last_active: joined_at,
        }
    }
}

/// A request to join a group.
///
/// Created in state `waiting`, transitioned exactly once by an admin
/// decision, and never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRequest {
    pub request_id: RequestId,
    pub user_id: UserId,
    pub username: String,
    pub state: JoinRequestState,
    pub requested_at: Timestamp,
}

/// Materialized view of one savings group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub group_id: GroupId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub admin_id: UserId,
    pub visibility: Visibility,
    pub min_contribution: Amount,
    pub max_members: u32,
    pub contribution_frequency: Frequency,
    pub payout_frequency: Frequency,

    /// Pooled funds, maintained as a running total of contributions minus
    /// payouts.
    pub balance: Amount,

    /// Members in join order. Join order doubles as the seed for the payout
    /// rotation.
    pub members: Vec<Member>,

    /// All join requests ever made, including terminal ones.
    pub requests: Vec<JoinRequest>,

    /// Rotation order, lazily initialized from `members` on first use and
    /// kept a permutation of member ids from then on.
    #[serde(default)]
    pub payout_order: Vec<UserId>,

    /// Index into `payout_order`, always taken modulo its length.
    #[serde(default)]
    pub current_payout_position: u32,

    #[serde(default)]
    pub last_payout_recipient: Option<UserId>,
    #[serde(default)]
    pub last_payout_date: Option<Timestamp>,

    pub created_at: Timestamp,

    /// Sequence number of the last log event folded into this view. Lets
    /// the view maintainer detect a view the log has moved past and catch
    /// it up before any command validates against it.
    #[serde(default)]
    pub last_sequence: u64,

    /// Optimistic-concurrency counter for the view store, bumped on every
    /// persisted mutation. Not part of the event-derived state.
    #[serde(default)]
    pub version: u64,
}

impl Group {
    /// Whether the user holds a membership.
    pub fn is_member(&self, user_id: &UserId) -> bool {
        self.members.iter().any(|m| &m.user_id == user_id)
    }

    /// Looks up a member by user id.
    pub fn member(&self, user_id: &UserId) -> Option<&Member> {
        self.members.iter().find(|m| &m.user_id == user_id)
    }

    /// Whether the group has reached capacity.
    pub fn is_full(&self) -> bool {
        self.members.len() as u32 >= self.max_members
    }

    /// Whether the user may process join requests: the group admin, or any
    /// member with a moderating role.
    pub fn can_moderate(&self, user_id: &UserId) -> bool {
        if &self.admin_id == user_id {
            return true;
        }
        self.member(user_id)
            .map(|m| m.role.can_moderate())
            .unwrap_or(false)
    }

    /// Whether the user has a request in state `waiting`.
    pub fn has_pending_request(&self, user_id: &UserId) -> bool {
        self.requests
            .iter()
            .any(|r| &r.user_id == user_id && r.state == JoinRequestState::Waiting)
    }

    /// Looks up a request by id regardless of state.
    pub fn request(&self, request_id: &RequestId) -> Option<&JoinRequest> {
        self.requests.iter().find(|r| &r.request_id == request_id)
    }

    /// Requests currently awaiting a decision.
    pub fn pending_requests(&self) -> Vec<&JoinRequest> {
        self.requests
            .iter()
            .filter(|r| r.state == JoinRequestState::Waiting)
            .collect()
    }

    /// The rotation order in effect: the stored one if initialized,
    /// otherwise derived from members in join order.
    ///
    /// Derivation is a pure function of `members`, which is what makes the
    /// lazy initialization replay-safe: a rebuilt view that has not seen a
    /// payout yet derives exactly the order the live view persisted.
    pub fn effective_payout_order(&self) -> Vec<UserId> {
        if self.payout_order.is_empty() {
            self.members.iter().map(|m| m.user_id.clone()).collect()
        } else {
            self.payout_order.clone()
        }
    }

    /// The member next in line for a payout, or `None` for an empty group.
    pub fn next_payee(&self) -> Option<&Member> {
        let order = self.effective_payout_order();
        if order.is_empty() {
            return None;
        }
        let position = self.current_payout_position as usize % order.len();
        self.member(&order[position])
    }
}

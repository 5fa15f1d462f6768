//! Group domain events.
//!
//! Events are named in past tense: they record facts that already happened.
//! Each variant carries a versionable payload struct, and the conversion to
//! and from stored form goes through an explicit `(event_type, payload)`
//! pair so that the log can hold event types this build does not know about.
//! Replay skips those rather than failing (see the projector).

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::foundation::{
    Amount, EventId, GroupId, RequestId, Timestamp, UserId, ValidationError,
};

use super::{Frequency, MemberRole, Visibility};

/// Decision taken on a join request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinAction {
    Accept,
    Reject,
}

impl fmt::Display for JoinAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinAction::Accept => write!(f, "accept"),
            JoinAction::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for JoinAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accept" => Ok(JoinAction::Accept),
            "reject" => Ok(JoinAction::Reject),
            other => Err(ValidationError::invalid_value(
                "action",
                format!("Action must be 'accept' or 'reject', got '{}'", other),
            )),
        }
    }
}

/// Payload of `GroupCreated`.
///
/// `member_ids` is the full initial member list with the admin first;
/// everyone else joins with role `member`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupCreated {
    pub group_id: GroupId,
    pub admin_id: UserId,
    pub admin_username: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub visibility: Visibility,
    pub min_contribution: Amount,
    pub max_members: u32,
    pub contribution_frequency: Frequency,
    pub payout_frequency: Frequency,
    pub member_ids: Vec<UserId>,
    pub created_at: Timestamp,
}

/// Payload of `JoinRequestCreated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRequestCreated {
    pub group_id: GroupId,
    pub request_id: RequestId,
    pub user_id: UserId,
    pub username: String,
    pub requested_at: Timestamp,
}

/// Payload of `JoinRequestProcessed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRequestProcessed {
    pub group_id: GroupId,
    pub request_id: RequestId,
    pub user_id: UserId,
    pub action: JoinAction,
    pub processed_by: UserId,
    pub processed_at: Timestamp,
}

/// Payload of `JoinRequestRejected`.
///
/// Recorded alongside `JoinRequestProcessed` on rejection. This is the
/// event the cooldown and lifetime-ban counters read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRequestRejected {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub rejected_by: UserId,
    pub rejected_at: Timestamp,
}

/// Payload of `MemberAdded`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberAdded {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub username: String,
    pub role: MemberRole,
    pub added_at: Timestamp,
}

/// Payload of `PayoutProcessed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutProcessed {
    pub group_id: GroupId,
    pub recipient_id: UserId,
    pub amount: Amount,
    pub payout_date: Timestamp,
}

/// Payload of `ContributionMade`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionMade {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub amount: Amount,
    pub contributed_at: Timestamp,
}

/// Payload of `UserLeftGroup`.
///
/// Member removal is not implemented in this engine; the variant exists so
/// logs written by older services still decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLeftGroup {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub left_at: Timestamp,
}

/// An event as it sits in the log: decoded-on-demand payload plus the
/// ordering metadata the store assigned at append time.
///
/// `sequence` is a per-group monotonically increasing number. Timestamps may
/// tie (or arrive with coarse precision from older producers), so replay
/// orders by sequence, never by timestamp alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: EventId,
    pub group_id: GroupId,
    pub sequence: u64,
    pub event_type: String,
    pub payload: JsonValue,
    pub recorded_at: Timestamp,
}

impl StoredEvent {
    /// Decodes the payload into a typed event.
    ///
    /// # Errors
    ///
    /// See [`GroupEvent::decode`].
    pub fn decode(&self) -> Result<GroupEvent, EventDecodeError> {
        GroupEvent::decode(&self.event_type, &self.payload)
    }
}

/// A fact recorded in a group's event log.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupEvent {
    GroupCreated(GroupCreated),
    JoinRequestCreated(JoinRequestCreated),
    JoinRequestProcessed(JoinRequestProcessed),
    JoinRequestRejected(JoinRequestRejected),
    MemberAdded(MemberAdded),
    PayoutProcessed(PayoutProcessed),
    ContributionMade(ContributionMade),
    UserLeftGroup(UserLeftGroup),
}

/// Failure to turn a stored `(event_type, payload)` pair back into a
/// `GroupEvent`.
#[derive(Debug, Error)]
pub enum EventDecodeError {
    /// The event type is not known to this build. Replay skips these.
    #[error("unknown event type '{0}'")]
    UnknownType(String),

    /// The type is known but the payload does not deserialize.
    #[error("malformed payload for '{event_type}': {source}")]
    MalformedPayload {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

impl GroupEvent {
    /// Stable type string used in the log.
    pub fn event_type(&self) -> &'static str {
        match self {
            GroupEvent::GroupCreated(_) => "GroupCreated",
            GroupEvent::JoinRequestCreated(_) => "JoinRequestCreated",
            GroupEvent::JoinRequestProcessed(_) => "JoinRequestProcessed",
            GroupEvent::JoinRequestRejected(_) => "JoinRequestRejected",
            GroupEvent::MemberAdded(_) => "MemberAdded",
            GroupEvent::PayoutProcessed(_) => "PayoutProcessed",
            GroupEvent::ContributionMade(_) => "ContributionMade",
            GroupEvent::UserLeftGroup(_) => "UserLeftGroup",
        }
    }

    /// The group this event belongs to.
    pub fn group_id(&self) -> &GroupId {
        match self {
            GroupEvent::GroupCreated(p) => &p.group_id,
            GroupEvent::JoinRequestCreated(p) => &p.group_id,
            GroupEvent::JoinRequestProcessed(p) => &p.group_id,
            GroupEvent::JoinRequestRejected(p) => &p.group_id,
            GroupEvent::MemberAdded(p) => &p.group_id,
            GroupEvent::PayoutProcessed(p) => &p.group_id,
            GroupEvent::ContributionMade(p) => &p.group_id,
            GroupEvent::UserLeftGroup(p) => &p.group_id,
        }
    }

    /// Serializes the payload for storage.
    pub fn payload(&self) -> Result<JsonValue, serde_json::Error> {
        match self {
            GroupEvent::GroupCreated(p) => serde_json::to_value(p),
            GroupEvent::JoinRequestCreated(p) => serde_json::to_value(p),
            GroupEvent::JoinRequestProcessed(p) => serde_json::to_value(p),
            GroupEvent::JoinRequestRejected(p) => serde_json::to_value(p),
            GroupEvent::MemberAdded(p) => serde_json::to_value(p),
            GroupEvent::PayoutProcessed(p) => serde_json::to_value(p),
            GroupEvent::ContributionMade(p) => serde_json::to_value(p),
            GroupEvent::UserLeftGroup(p) => serde_json::to_value(p),
        }
    }

    /// Decodes a stored `(event_type, payload)` pair.
    ///
    /// # Errors
    ///
    /// - `UnknownType` if `event_type` is not one this build handles
    /// - `MalformedPayload` if the payload fails to deserialize
    pub fn decode(event_type: &str, payload: &JsonValue) -> Result<Self, EventDecodeError> {
        fn parse<T: serde::de::DeserializeOwned>(
            event_type: &str,
            payload: &JsonValue,
        ) -> Result<T, EventDecodeError> {
            serde_json::from_value(payload.clone()).map_err(|source| {
                EventDecodeError::MalformedPayload {
                    event_type: event_type.to_string(),
                    source,
                }
            })
        }

        match event_type {
            "GroupCreated" => Ok(GroupEvent::GroupCreated(parse(event_type, payload)?)),
            "JoinRequestCreated" => {
                Ok(GroupEvent::JoinRequestCreated(parse(event_type, payload)?))
            }
            "JoinRequestProcessed" => {
                Ok(GroupEvent::JoinRequestProcessed(parse(event_type, payload)?))
            }
            "JoinRequestRejected" => {
                Ok(GroupEvent::JoinRequestRejected(parse(event_type, payload)?))
            }
            "MemberAdded" => Ok(GroupEvent::MemberAdded(parse(event_type, payload)?)),
            "PayoutProcessed" => Ok(GroupEvent::PayoutProcessed(parse(event_type, payload)?)),
            "ContributionMade" => Ok(GroupEvent::ContributionMade(parse(event_type, payload)?)),
            "UserLeftGroup" => Ok(GroupEvent::UserLeftGroup(parse(event_type, payload)?)),
            other => Err(EventDecodeError::UnknownType(other.to_string())),
        }
    }
}

//! Enumerated value objects for the Group aggregate.
//!
//! String forms match the wire values of the upstream services exactly
//! ("Public", "Bi-weekly", "founder", ...) so historical event payloads
//! decode without translation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Whether a group accepts join requests from anyone or only invitees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "Public"),
            Visibility::Private => write!(f, "Private"),
        }
    }
}

impl FromStr for Visibility {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Public" => Ok(Visibility::Public),
            "Private" => Ok(Visibility::Private),
            other => Err(ValidationError::invalid_value(
                "visibility",
                format!("Visibility must be 'Public' or 'Private', got '{}'", other),
            )),
        }
    }
}

/// Contribution and payout cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    Weekly,
    #[serde(rename = "Bi-weekly")]
    BiWeekly,
    Monthly,
}

impl Frequency {
    /// Cadence length in days, used to project the next payout date.
    /// Monthly is approximated as 30 days.
    pub fn interval_days(&self) -> i64 {
        match self {
            Frequency::Weekly => 7,
            Frequency::BiWeekly => 14,
            Frequency::Monthly => 30,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Weekly => write!(f, "Weekly"),
            Frequency::BiWeekly => write!(f, "Bi-weekly"),
            Frequency::Monthly => write!(f, "Monthly"),
        }
    }
}

impl FromStr for Frequency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Weekly" => Ok(Frequency::Weekly),
            "Bi-weekly" => Ok(Frequency::BiWeekly),
            "Monthly" => Ok(Frequency::Monthly),
            other => Err(ValidationError::invalid_value(
                "frequency",
                format!(
                    "Invalid frequency '{}'. Must be: Monthly, Bi-weekly, or Weekly",
                    other
                ),
            )),
        }
    }
}

/// Role of a member within a group.
///
/// The creating admin is always the `Founder`; accepted requesters join as
/// `Member`. `Admin` exists for members later promoted to moderate requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Founder,
    Admin,
    Member,
}

impl MemberRole {
    /// Whether this role may process join requests.
    pub fn can_moderate(&self) -> bool {
        matches!(self, MemberRole::Founder | MemberRole::Admin)
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberRole::Founder => write!(f, "founder"),
            MemberRole::Admin => write!(f, "admin"),
            MemberRole::Member => write!(f, "member"),
        }
    }
}

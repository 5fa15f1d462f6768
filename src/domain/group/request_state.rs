//! Join request lifecycle state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// State of a join request.
///
/// `waiting → accepted` and `waiting → rejected` are the only valid
/// transitions; both targets are terminal. Requests are never deleted, so a
/// rejected request remains as input to cooldown and ban accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinRequestState {
    Waiting,
    Accepted,
    Rejected,
}

impl StateMachine for JoinRequestState {
    fn can_transition_to(&self, target: &Self) -> bool {
        matches!(
            (self, target),
            (JoinRequestState::Waiting, JoinRequestState::Accepted)
                | (JoinRequestState::Waiting, JoinRequestState::Rejected)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        match self {
            JoinRequestState::Waiting => {
                vec![JoinRequestState::Accepted, JoinRequestState::Rejected]
            }
            JoinRequestState::Accepted | JoinRequestState::Rejected => vec![],
        }
    }
}

impl fmt::Display for JoinRequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinRequestState::Waiting => write!(f, "waiting"),
            JoinRequestState::Accepted => write!(f, "accepted"),
            JoinRequestState::Rejected => write!(f, "rejected"),
        }
    }
}

//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types that form the
//! vocabulary of the group-savings domain.

mod amount;
mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use amount::Amount;
pub use errors::{ErrorCode, GroupError, ValidationError};
pub use ids::{EventId, GroupId, RequestId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;

//! Group domain module.
//!
//! The event-sourced heart of the engine: the Group aggregate, its domain
//! events, the join-request state machine, and the projector that folds the
//! event log into the materialized view.
//!
//! # Module Structure
//!
//! - `aggregate` - Group aggregate, Member and JoinRequest entities
//! - `events` - GroupEvent variants and stored-event envelope
//! - `projector` - event fold / replay
//! - `request_state` - JoinRequestState state machine
//! - `types` - Visibility, Frequency, MemberRole value objects

mod aggregate;
pub mod events;
mod projector;
mod request_state;
mod types;

pub use aggregate::{Group, JoinRequest, Member};
pub use events::{EventDecodeError, GroupEvent, JoinAction, StoredEvent};
pub use projector::Projector;
pub use request_state::JoinRequestState;
pub use types::{Frequency, MemberRole, Visibility};

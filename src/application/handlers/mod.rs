//! Command handlers.
//!
//! Each handler owns one write path: validate against the current view,
//! append the resulting events, fold them into the view, persist.

mod create_group;
mod payout;
mod process_join_request;
mod record_contribution;
mod request_join;

pub use create_group::{CreateGroupCommand, CreateGroupHandler};
pub use payout::{NextPayee, PayoutEngine, RecordPayoutCommand};
pub use process_join_request::{
    ProcessJoinRequestCommand, ProcessJoinRequestHandler, ProcessJoinRequestResult,
};
pub use record_contribution::{RecordContributionCommand, RecordContributionHandler};
pub use request_join::{RequestJoinCommand, RequestJoinHandler};

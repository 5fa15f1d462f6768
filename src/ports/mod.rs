//! Ports - interfaces between the domain and external collaborators.
//!
//! Adapters implement these traits; the application layer depends only on
//! the traits.

mod event_log;
mod view_store;

pub use event_log::EventLog;
pub use view_store::GroupViewStore;

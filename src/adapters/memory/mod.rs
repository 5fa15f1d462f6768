//! In-memory adapters backing the ports for tests and single-process use.

mod event_log;
mod view_store;

pub use event_log::InMemoryEventLog;
pub use view_store::InMemoryGroupViewStore;

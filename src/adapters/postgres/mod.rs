//! PostgreSQL adapters backing the ports.

mod event_log;
mod view_store;

pub use event_log::PostgresEventLog;
pub use view_store::PostgresGroupViewStore;

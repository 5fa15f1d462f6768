//! Application layer: command handlers, queries, view maintenance, and the
//! engine facade.

pub mod engine;
pub mod handlers;
pub mod projection;
pub mod queries;

pub use engine::GroupEngine;
pub use projection::ViewMaintainer;
pub use queries::GroupQueries;

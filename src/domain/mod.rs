//! Domain layer - aggregates, events, and shared primitives.

pub mod foundation;
pub mod group;

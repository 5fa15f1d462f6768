//! Stokvel Engine - event-sourced group membership and payout rotation.
//!
//! The append-only event log is the source of truth for every savings group;
//! the materialized `Group` view is a cache the projector can rebuild from
//! the log at any time. The engine covers group creation, the join-request
//! workflow (cooldown and rejection ban included), contributions, and the
//! deterministic round-robin payout rotation.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

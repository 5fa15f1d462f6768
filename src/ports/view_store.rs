//! GroupViewStore port - persistence for the materialized Group view.
//!
//! The view is a cache derived from the event log; the store holds nothing
//! the log cannot reproduce. Writes are whole-document replaces guarded by
//! an optimistic version check so that concurrent writers (other processes
//! sharing the same store) cannot silently lose updates.

use async_trait::async_trait;

use crate::domain::foundation::{GroupError, GroupId, UserId};
use crate::domain::group::Group;

/// Port for materialized-view persistence.
///
/// Implementations must ensure:
/// - `put` replaces the stored document only when the stored version equals
///   `expected_version`, returning `VersionConflict` otherwise
/// - a fresh group (no stored document) is written with
///   `expected_version == 0`
/// - reads see only fully applied writes, never a half-written document
#[async_trait]
pub trait GroupViewStore: Send + Sync {
    /// Point lookup by group id. Returns `None` if no view exists.
    async fn get(&self, group_id: &GroupId) -> Result<Option<Group>, GroupError>;

    /// Replaces the view, guarded by the optimistic version check.
    ///
    /// The stored document's version becomes `group.version`; callers bump
    /// it before persisting.
    ///
    /// # Errors
    ///
    /// - `VersionConflict` if the stored version differs from
    ///   `expected_version` (retryable)
    /// - `StorageError` on persistence failure (retryable)
    async fn put(&self, group: &Group, expected_version: u64) -> Result<(), GroupError>;

    /// All groups the user is a member of.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Group>, GroupError>;

    /// Public groups whose name contains the query, case-insensitively.
    async fn search_public(&self, query: &str) -> Result<Vec<Group>, GroupError>;
}

//! GroupEngine - the facade tying ports, config, and handlers together.
//!
//! Mutating commands for one group are serialized through an async lock
//! registry, which upholds the single-writer-per-group assumption the
//! handlers' read-validate-append-project sequence relies on. Commands for
//! different groups run concurrently; queries bypass the locks entirely.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::application::handlers::{
    CreateGroupCommand, CreateGroupHandler, NextPayee, PayoutEngine, ProcessJoinRequestCommand,
    ProcessJoinRequestHandler, ProcessJoinRequestResult, RecordContributionCommand,
    RecordContributionHandler, RecordPayoutCommand, RequestJoinCommand, RequestJoinHandler,
};
use crate::application::projection::ViewMaintainer;
use crate::application::queries::GroupQueries;
use crate::config::EngineConfig;
use crate::domain::foundation::{GroupError, GroupId, UserId};
use crate::domain::group::{Group, JoinRequest};
use crate::ports::{EventLog, GroupViewStore};

/// The engine facade. One instance per process, cheap to share via `Arc`.
pub struct GroupEngine {
    views: Arc<ViewMaintainer>,
    create_group: CreateGroupHandler,
    request_join: RequestJoinHandler,
    process_join_request: ProcessJoinRequestHandler,
    record_contribution: RecordContributionHandler,
    payouts: PayoutEngine,
    queries: GroupQueries,
    locks: Mutex<HashMap<GroupId, Arc<tokio::sync::Mutex<()>>>>,
}

impl GroupEngine {
    pub fn new(
        event_log: Arc<dyn EventLog>,
        view_store: Arc<dyn GroupViewStore>,
        config: EngineConfig,
    ) -> Self {
        let views = Arc::new(ViewMaintainer::new(event_log.clone(), view_store.clone()));
        Self {
            create_group: CreateGroupHandler::new(views.clone()),
            request_join: RequestJoinHandler::new(views.clone(), event_log, config),
            process_join_request: ProcessJoinRequestHandler::new(views.clone()),
            record_contribution: RecordContributionHandler::new(views.clone()),
            payouts: PayoutEngine::new(views.clone()),
            queries: GroupQueries::new(views.clone(), view_store),
            views,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The async mutex serializing commands for one group.
    ///
    /// Idle entries are swept on access: a strong count of one means no
    /// task holds or awaits that lock, so dropping it cannot unserialize
    /// anything.
    fn lock_for(&self, group_id: &GroupId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().expect("GroupEngine: lock registry poisoned");
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(group_id.clone()).or_default().clone()
    }

    #[cfg(test)]
    fn lock_registry_len(&self) -> usize {
        self.locks
            .lock()
            .expect("GroupEngine: lock registry poisoned")
            .len()
    }

    /// Creates a group. No lock needed: the group id is freshly generated.
    pub async fn create_group(&self, cmd: CreateGroupCommand) -> Result<Group, GroupError> {
        self.create_group.handle(cmd).await
    }

    /// Records a user's request to join a group.
    pub async fn request_join(&self, cmd: RequestJoinCommand) -> Result<JoinRequest, GroupError> {
        let lock = self.lock_for(&cmd.group_id);
        let _guard = lock.lock().await;
        self.request_join.handle(cmd).await
    }

    /// Accepts or rejects a pending join request.
    pub async fn process_join_request(
        &self,
        cmd: ProcessJoinRequestCommand,
    ) -> Result<ProcessJoinRequestResult, GroupError> {
        let lock = self.lock_for(&cmd.group_id);
        let _guard = lock.lock().await;
        self.process_join_request.handle(cmd).await
    }

    /// Records a member's contribution.
    pub async fn record_contribution(
        &self,
        cmd: RecordContributionCommand,
    ) -> Result<Group, GroupError> {
        let lock = self.lock_for(&cmd.group_id);
        let _guard = lock.lock().await;
        self.record_contribution.handle(cmd).await
    }

    /// Records a payout to the member currently due.
    pub async fn record_payout(&self, cmd: RecordPayoutCommand) -> Result<NextPayee, GroupError> {
        let lock = self.lock_for(&cmd.group_id);
        let _guard = lock.lock().await;
        self.payouts.record_payout(cmd).await
    }

    /// The member currently due a payout. Read-only, no lock.
    pub async fn next_payee(&self, group_id: &GroupId) -> Result<NextPayee, GroupError> {
        self.payouts.next_payee(group_id).await
    }

    /// Rebuilds a group's view from its full event log.
    pub async fn rebuild_view(&self, group_id: &GroupId) -> Result<Option<Group>, GroupError> {
        let lock = self.lock_for(group_id);
        let _guard = lock.lock().await;
        self.views.rebuild(group_id).await
    }

    pub async fn get_group(&self, group_id: &GroupId) -> Result<Group, GroupError> {
        self.queries.get_group(group_id).await
    }

    pub async fn get_user_groups(&self, user_id: &UserId) -> Result<Vec<Group>, GroupError> {
        self.queries.get_user_groups(user_id).await
    }

    pub async fn search_public_groups(&self, query: &str) -> Result<Vec<Group>, GroupError> {
        self.queries.search_public_groups(query).await
    }

    pub async fn pending_join_requests(
        &self,
        group_id: &GroupId,
    ) -> Result<Vec<JoinRequest>, GroupError> {
        self.queries.pending_join_requests(group_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryEventLog, InMemoryGroupViewStore};
    use crate::domain::foundation::Amount;
    use crate::domain::group::{Frequency, JoinAction, Visibility};

    fn engine() -> Arc<GroupEngine> {
        Arc::new(GroupEngine::new(
            Arc::new(InMemoryEventLog::new()),
            Arc::new(InMemoryGroupViewStore::new()),
            EngineConfig::default(),
        ))
    }

    fn create_command(name: &str, max_members: u32) -> CreateGroupCommand {
        CreateGroupCommand {
            admin_id: UserId::new("admin").unwrap(),
            admin_username: "Ayanda".to_string(),
            name: name.to_string(),
            description: None,
            visibility: Visibility::Public,
            min_contribution: Amount::new(100.0).unwrap(),
            max_members,
            contribution_frequency: Frequency::Monthly,
            payout_frequency: Frequency::Monthly,
            member_ids: vec![],
        }
    }

    #[tokio::test]
    async fn full_join_flow_through_the_facade() {
        let engine = engine();
        let group = engine.create_group(create_command("Circle", 5)).await.unwrap();

        let request = engine
            .request_join(RequestJoinCommand {
                group_id: group.group_id.clone(),
                user_id: UserId::new("thabo").unwrap(),
                username: "THABO".to_string(),
            })
            .await
            .unwrap();

        let result = engine
            .process_join_request(ProcessJoinRequestCommand {
                group_id: group.group_id.clone(),
                request_id: request.request_id,
                action: JoinAction::Accept,
                processed_by: UserId::new("admin").unwrap(),
            })
            .await
            .unwrap();

        assert!(result.group.is_member(&UserId::new("thabo").unwrap()));
        assert!(engine
            .pending_join_requests(&group.group_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn concurrent_accepts_cannot_overfill_a_group() {
        let engine = engine();
        let group = engine.create_group(create_command("Tiny", 2)).await.unwrap();

        let mut request_ids = Vec::new();
        for user in ["b", "c", "d"] {
            let request = engine
                .request_join(RequestJoinCommand {
                    group_id: group.group_id.clone(),
                    user_id: UserId::new(user).unwrap(),
                    username: user.to_uppercase(),
                })
                .await
                .unwrap();
            request_ids.push(request.request_id);
        }

        let mut tasks = Vec::new();
        for request_id in request_ids {
            let engine = engine.clone();
            let group_id = group.group_id.clone();
            tasks.push(tokio::spawn(async move {
                engine
                    .process_join_request(ProcessJoinRequestCommand {
                        group_id,
                        request_id,
                        action: JoinAction::Accept,
                        processed_by: UserId::new("admin").unwrap(),
                    })
                    .await
            }));
        }

        let mut accepted = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                accepted += 1;
            }
        }

        // Capacity 2 with the admin seated: exactly one accept can land.
        assert_eq!(accepted, 1);
        let group = engine.get_group(&group.group_id).await.unwrap();
        assert_eq!(group.members.len(), 2);
    }

    #[tokio::test]
    async fn idle_group_locks_are_swept_from_the_registry() {
        let engine = engine();
        for name in ["First", "Second", "Third"] {
            let group = engine.create_group(create_command(name, 5)).await.unwrap();
            engine
                .request_join(RequestJoinCommand {
                    group_id: group.group_id.clone(),
                    user_id: UserId::new("thabo").unwrap(),
                    username: "THABO".to_string(),
                })
                .await
                .unwrap();
        }

        // Each lock_for sweeps idle entries before inserting its own, so
        // only the most recent command's entry can remain.
        assert!(engine.lock_registry_len() <= 1);
    }

    #[tokio::test]
    async fn rebuild_view_matches_incrementally_maintained_view() {
        let engine = engine();
        let group = engine.create_group(create_command("Circle", 5)).await.unwrap();

        engine
            .record_contribution(RecordContributionCommand {
                group_id: group.group_id.clone(),
                user_id: UserId::new("admin").unwrap(),
                amount: Amount::new(400.0).unwrap(),
            })
            .await
            .unwrap();

        let live = engine.get_group(&group.group_id).await.unwrap();
        let rebuilt = engine.rebuild_view(&group.group_id).await.unwrap().unwrap();

        // Version is store bookkeeping; the event-derived state must match.
        let mut live = live;
        let mut rebuilt = rebuilt;
        live.version = 0;
        rebuilt.version = 0;
        assert_eq!(live, rebuilt);
    }
}

//! End-to-end lifecycle tests against the engine facade with in-memory
//! adapters: create a group, request and process joins, contribute, run the
//! payout rotation, and rebuild the view from the log.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use stokvel_engine::adapters::memory::{InMemoryEventLog, InMemoryGroupViewStore};
use stokvel_engine::application::handlers::{
    CreateGroupCommand, ProcessJoinRequestCommand, RecordContributionCommand, RecordPayoutCommand,
    RequestJoinCommand,
};
use stokvel_engine::application::GroupEngine;
use stokvel_engine::config::EngineConfig;
use stokvel_engine::domain::foundation::{Amount, ErrorCode, GroupError, GroupId, UserId};
use stokvel_engine::domain::group::{
    Frequency, Group, JoinAction, JoinRequestState, MemberRole, Visibility,
};
use stokvel_engine::ports::GroupViewStore;

// =============================================================================
// Test Infrastructure
// =============================================================================

struct TestEngine {
    engine: Arc<GroupEngine>,
    log: Arc<InMemoryEventLog>,
}

fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn test_engine() -> TestEngine {
    test_engine_with(EngineConfig::default())
}

fn test_engine_with(config: EngineConfig) -> TestEngine {
    init_tracing();
    let log = Arc::new(InMemoryEventLog::new());
    let store = Arc::new(InMemoryGroupViewStore::new());
    TestEngine {
        engine: Arc::new(GroupEngine::new(log.clone(), store, config)),
        log,
    }
}

fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

/// View store that can be armed to fail its next put, modeling an outage
/// between a successful log append and the view write.
struct FlakyViewStore {
    inner: InMemoryGroupViewStore,
    put_failures: AtomicUsize,
}

impl FlakyViewStore {
    fn new() -> Self {
        Self {
            inner: InMemoryGroupViewStore::new(),
            put_failures: AtomicUsize::new(0),
        }
    }

    fn fail_next_put(&self) {
        self.put_failures.store(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl GroupViewStore for FlakyViewStore {
    async fn get(&self, group_id: &GroupId) -> Result<Option<Group>, GroupError> {
        self.inner.get(group_id).await
    }

    async fn put(&self, group: &Group, expected_version: u64) -> Result<(), GroupError> {
        let remaining = self.put_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.put_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(GroupError::storage("injected view store outage"));
        }
        self.inner.put(group, expected_version).await
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Group>, GroupError> {
        self.inner.list_for_user(user_id).await
    }

    async fn search_public(&self, query: &str) -> Result<Vec<Group>, GroupError> {
        self.inner.search_public(query).await
    }
}

fn create_command(admin: &str, max_members: u32) -> CreateGroupCommand {
    CreateGroupCommand {
        admin_id: user(admin),
        admin_username: admin.to_uppercase(),
        name: "Umgalelo Savings Circle".to_string(),
        description: Some("Monthly rotating savings".to_string()),
        visibility: Visibility::Public,
        min_contribution: Amount::new(100.0).unwrap(),
        max_members,
        contribution_frequency: Frequency::Monthly,
        payout_frequency: Frequency::Monthly,
        member_ids: vec![],
    }
}

async fn join(engine: &GroupEngine, group: &Group, who: &str) {
    let request = engine
        .request_join(RequestJoinCommand {
            group_id: group.group_id.clone(),
            user_id: user(who),
            username: who.to_uppercase(),
        })
        .await
        .unwrap();
    engine
        .process_join_request(ProcessJoinRequestCommand {
            group_id: group.group_id.clone(),
            request_id: request.request_id,
            action: JoinAction::Accept,
            processed_by: group.admin_id.clone(),
        })
        .await
        .unwrap();
}

// =============================================================================
// Creation
// =============================================================================

#[tokio::test]
async fn created_group_has_only_the_founder_and_no_requests() {
    let t = test_engine();
    let group = t.engine.create_group(create_command("alice", 10)).await.unwrap();

    assert_eq!(group.members.len(), 1);
    assert_eq!(group.members[0].user_id, user("alice"));
    assert_eq!(group.members[0].role, MemberRole::Founder);
    assert!(group.requests.is_empty());
    assert!(group.balance.is_zero());
}

// =============================================================================
// Join-request workflow
// =============================================================================

#[tokio::test]
async fn second_request_before_processing_is_a_conflict() {
    let t = test_engine();
    let group = t.engine.create_group(create_command("alice", 10)).await.unwrap();

    let request = t
        .engine
        .request_join(RequestJoinCommand {
            group_id: group.group_id.clone(),
            user_id: user("bob"),
            username: "BOB".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(request.state, JoinRequestState::Waiting);

    let err = t
        .engine
        .request_join(RequestJoinCommand {
            group_id: group.group_id.clone(),
            user_id: user("bob"),
            username: "BOB".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::DuplicatePendingRequest);
}

#[tokio::test]
async fn accepting_twice_fails_on_the_terminal_request() {
    let t = test_engine();
    let group = t.engine.create_group(create_command("alice", 10)).await.unwrap();

    let request = t
        .engine
        .request_join(RequestJoinCommand {
            group_id: group.group_id.clone(),
            user_id: user("bob"),
            username: "BOB".to_string(),
        })
        .await
        .unwrap();

    let cmd = ProcessJoinRequestCommand {
        group_id: group.group_id.clone(),
        request_id: request.request_id,
        action: JoinAction::Accept,
        processed_by: user("alice"),
    };
    let result = t.engine.process_join_request(cmd.clone()).await.unwrap();
    assert!(result.group.is_member(&user("bob")));
    assert_eq!(
        result.group.request(&request.request_id).unwrap().state,
        JoinRequestState::Accepted
    );

    let err = t.engine.process_join_request(cmd).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::RequestAlreadyProcessed);
}

#[tokio::test]
async fn rejected_user_is_blocked_until_the_cooldown_elapses() {
    // cooldown_days = 0 models an elapsed window without clock control.
    let strict = test_engine();
    let lenient = test_engine_with(EngineConfig {
        cooldown_days: 0,
        ban_threshold: 3,
    });

    for (t, expect_blocked) in [(&strict, true), (&lenient, false)] {
        let group = t.engine.create_group(create_command("alice", 10)).await.unwrap();
        let request = t
            .engine
            .request_join(RequestJoinCommand {
                group_id: group.group_id.clone(),
                user_id: user("carol"),
                username: "CAROL".to_string(),
            })
            .await
            .unwrap();
        t.engine
            .process_join_request(ProcessJoinRequestCommand {
                group_id: group.group_id.clone(),
                request_id: request.request_id,
                action: JoinAction::Reject,
                processed_by: user("alice"),
            })
            .await
            .unwrap();

        let retry = t
            .engine
            .request_join(RequestJoinCommand {
                group_id: group.group_id.clone(),
                user_id: user("carol"),
                username: "CAROL".to_string(),
            })
            .await;

        if expect_blocked {
            assert_eq!(retry.unwrap_err().code, ErrorCode::RecentlyRejected);
        } else {
            assert_eq!(retry.unwrap().state, JoinRequestState::Waiting);
        }
    }
}

#[tokio::test]
async fn third_rejection_bans_the_user_for_good() {
    let t = test_engine_with(EngineConfig {
        cooldown_days: 0,
        ban_threshold: 3,
    });
    let group = t.engine.create_group(create_command("alice", 10)).await.unwrap();

    for _ in 0..3 {
        let request = t
            .engine
            .request_join(RequestJoinCommand {
                group_id: group.group_id.clone(),
                user_id: user("carol"),
                username: "CAROL".to_string(),
            })
            .await
            .unwrap();
        t.engine
            .process_join_request(ProcessJoinRequestCommand {
                group_id: group.group_id.clone(),
                request_id: request.request_id,
                action: JoinAction::Reject,
                processed_by: user("alice"),
            })
            .await
            .unwrap();
    }

    let err = t
        .engine
        .request_join(RequestJoinCommand {
            group_id: group.group_id.clone(),
            user_id: user("carol"),
            username: "CAROL".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::JoinBanned);
}

#[tokio::test]
async fn full_group_rejects_requests_without_recording_anything() {
    let t = test_engine();
    let group = t.engine.create_group(create_command("alice", 2)).await.unwrap();
    join(&t.engine, &group, "bob").await;

    let events_before = t.log.event_count(&group.group_id);
    let err = t
        .engine
        .request_join(RequestJoinCommand {
            group_id: group.group_id.clone(),
            user_id: user("dave"),
            username: "DAVE".to_string(),
        })
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::GroupFull);
    assert_eq!(t.log.event_count(&group.group_id), events_before);
}

#[tokio::test]
async fn join_request_survives_a_view_persist_failure() {
    init_tracing();
    let log = Arc::new(InMemoryEventLog::new());
    let store = Arc::new(FlakyViewStore::new());
    let engine = GroupEngine::new(log.clone(), store.clone(), EngineConfig::default());
    let group = engine.create_group(create_command("alice", 10)).await.unwrap();

    store.fail_next_put();
    let err = engine
        .request_join(RequestJoinCommand {
            group_id: group.group_id.clone(),
            user_id: user("bob"),
            username: "BOB".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::StorageError);
    // The event reached the log even though the view write did not.
    assert_eq!(log.event_count(&group.group_id), 2);

    // A retry catches the view up from the log and sees the appended
    // request instead of creating a second one.
    let retry = engine
        .request_join(RequestJoinCommand {
            group_id: group.group_id.clone(),
            user_id: user("bob"),
            username: "BOB".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(retry.code, ErrorCode::DuplicatePendingRequest);

    let rebuilt = engine.rebuild_view(&group.group_id).await.unwrap().unwrap();
    let waiting = rebuilt
        .requests
        .iter()
        .filter(|r| r.user_id == user("bob") && r.state == JoinRequestState::Waiting)
        .count();
    assert_eq!(waiting, 1);
}

// =============================================================================
// Payout rotation
// =============================================================================

#[tokio::test]
async fn rotation_follows_join_order_and_wraps() {
    let t = test_engine();
    let group = t.engine.create_group(create_command("alice", 10)).await.unwrap();
    join(&t.engine, &group, "bob").await;
    join(&t.engine, &group, "carol").await;

    for who in ["alice", "bob", "carol"] {
        t.engine
            .record_contribution(RecordContributionCommand {
                group_id: group.group_id.clone(),
                user_id: user(who),
                amount: Amount::new(500.0).unwrap(),
            })
            .await
            .unwrap();
    }

    let next = t.engine.next_payee(&group.group_id).await.unwrap();
    assert_eq!(next.recipient_id, user("alice"));
    assert_eq!(next.current_position, 0);

    let after_alice = t
        .engine
        .record_payout(RecordPayoutCommand {
            group_id: group.group_id.clone(),
            recipient_id: user("alice"),
            amount: Amount::new(1500.0).unwrap(),
        })
        .await
        .unwrap();
    assert_eq!(after_alice.recipient_id, user("bob"));
    assert_eq!(after_alice.current_position, 1);
    assert!(after_alice.group_balance.is_zero());

    for who in ["bob", "carol"] {
        t.engine
            .record_payout(RecordPayoutCommand {
                group_id: group.group_id.clone(),
                recipient_id: user(who),
                amount: Amount::new(100.0).unwrap(),
            })
            .await
            .unwrap();
    }

    let wrapped = t.engine.next_payee(&group.group_id).await.unwrap();
    assert_eq!(wrapped.recipient_id, user("alice"));
    assert_eq!(wrapped.current_position, 0);
}

// =============================================================================
// Replay and rebuild
// =============================================================================

#[tokio::test]
async fn rebuild_is_idempotent_and_matches_the_live_view() {
    let t = test_engine();
    let group = t.engine.create_group(create_command("alice", 10)).await.unwrap();
    join(&t.engine, &group, "bob").await;
    t.engine
        .record_contribution(RecordContributionCommand {
            group_id: group.group_id.clone(),
            user_id: user("bob"),
            amount: Amount::new(250.0).unwrap(),
        })
        .await
        .unwrap();

    let live = t.engine.get_group(&group.group_id).await.unwrap();
    let first = t.engine.rebuild_view(&group.group_id).await.unwrap().unwrap();
    let second = t.engine.rebuild_view(&group.group_id).await.unwrap().unwrap();

    let strip = |mut g: Group| {
        g.version = 0;
        g
    };
    assert_eq!(strip(live.clone()), strip(first.clone()));
    assert_eq!(strip(first), strip(second));
}

#[tokio::test]
async fn view_survives_a_dropped_cache() {
    let log = Arc::new(InMemoryEventLog::new());
    let store = Arc::new(InMemoryGroupViewStore::new());
    let engine = GroupEngine::new(log.clone(), store, EngineConfig::default());
    let group = engine.create_group(create_command("alice", 10)).await.unwrap();
    join(&engine, &group, "bob").await;

    // Same log, empty view store: the engine must answer from replay.
    let fresh_store = Arc::new(InMemoryGroupViewStore::new());
    let recovered = GroupEngine::new(log, fresh_store, EngineConfig::default());

    let rebuilt = recovered.get_group(&group.group_id).await.unwrap();
    assert_eq!(rebuilt.members.len(), 2);
    assert!(rebuilt.is_member(&user("bob")));
}

#[tokio::test]
async fn unknown_group_is_reported_not_found_everywhere() {
    let t = test_engine();
    let missing = GroupId::new("group_missing").unwrap();

    assert_eq!(
        t.engine.get_group(&missing).await.unwrap_err().code,
        ErrorCode::GroupNotFound
    );
    assert_eq!(
        t.engine.next_payee(&missing).await.unwrap_err().code,
        ErrorCode::GroupNotFound
    );
    assert!(t.engine.rebuild_view(&missing).await.unwrap().is_none());
}

//! Session reload, polling and coalescing.

mod support;

use std::{sync::Arc, time::Duration};

use chrono::NaiveDate;
use rstest::{fixture, rstest};
use tokio::sync::watch;
use tourlane_core::{
    Plan, PlanId, UserId,
    test_support::sample_plan,
};
use tourlane_data::{Database, SqlitePlanStore};
use tourlane_sync::{
    BroadcastHub, ChangeFeed, ChangeNotice, PlanSource, ReconcileStrategy, SessionId,
    SyncConfig, SyncError, SyncSession,
};

use support::{MemorySource, block_on, with_extra_place};

#[fixture]
fn plan() -> Plan {
    sample_plan(2, &["대전역", "성심당"], None)
}

async fn open(
    id: u64,
    hub: &Arc<BroadcastHub>,
    source: &Arc<MemorySource>,
    plan: PlanId,
) -> SyncSession {
    SyncSession::open(SessionId(id), plan, hub.clone(), source.clone())
        .await
        .expect("open session")
}

#[rstest]
fn notices_from_others_trigger_a_reload(plan: Plan) {
    let hub = Arc::new(BroadcastHub::default());
    let source = Arc::new(MemorySource::with_plan(plan.clone()));
    block_on(async {
        let session = open(1, &hub, &source, plan.id()).await;
        source.store(with_extra_place(&plan, "엑스포과학공원"));

        let reloaded = session
            .handle_notice(ChangeNotice {
                plan_id: plan.id(),
                publisher: Some(SessionId(2)),
            })
            .await
            .expect("reload");
        assert!(reloaded);
        assert_eq!(session.current().place_count(), 3);
        assert_eq!(session.reload_count(), 1);
    });
}

#[rstest]
fn own_and_foreign_plan_notices_are_ignored(plan: Plan) {
    let hub = Arc::new(BroadcastHub::default());
    let source = Arc::new(MemorySource::with_plan(plan.clone()));
    block_on(async {
        let session = open(1, &hub, &source, plan.id()).await;
        let own = ChangeNotice {
            plan_id: plan.id(),
            publisher: Some(SessionId(1)),
        };
        let foreign = ChangeNotice {
            plan_id: PlanId(99),
            publisher: None,
        };
        assert!(!session.handle_notice(own).await.expect("own notice"));
        assert!(!session.handle_notice(foreign).await.expect("foreign notice"));
        assert_eq!(source.fetches(), 1);
    });
}

#[rstest]
fn polling_reloads_only_on_place_count_change(plan: Plan) {
    let hub = Arc::new(BroadcastHub::default());
    let source = Arc::new(MemorySource::with_plan(plan.clone()));
    block_on(async {
        let session = open(1, &hub, &source, plan.id()).await;
        assert!(!session.poll_once().await.expect("unchanged poll"));

        source.store(with_extra_place(&plan, "한밭수목원"));
        assert!(session.poll_once().await.expect("changed poll"));
        assert_eq!(session.current().place_count(), 3);
        assert!(!session.poll_once().await.expect("settled poll"));
    });
}

#[rstest]
fn concurrent_reloads_are_coalesced(plan: Plan) {
    let hub = Arc::new(BroadcastHub::default());
    let source = Arc::new(MemorySource::with_plan(plan.clone()).slow(Duration::from_millis(200)));
    block_on(async {
        let session = open(1, &hub, &source, plan.id()).await;
        let (first, second, third) =
            tokio::join!(session.reload(), session.reload(), session.reload());
        let ran = [
            first.expect("first"),
            second.expect("second"),
            third.expect("third"),
        ];
        assert_eq!(ran.iter().filter(|ran| **ran).count(), 1);
        // The open, the first reload and one follow-up for both queued calls.
        assert_eq!(source.fetches(), 3);
        assert_eq!(session.reload_count(), 2);

        assert!(session.reload().await.expect("flag cleared"));
    });
}

#[rstest]
fn notices_during_a_poll_are_not_lost(plan: Plan) {
    let hub = Arc::new(BroadcastHub::default());
    let source = Arc::new(MemorySource::with_plan(plan.clone()).slow(Duration::from_millis(200)));
    block_on(async {
        let session = open(1, &hub, &source, plan.id()).await;
        let mut renamed = plan.clone();
        renamed.title = "대전 이틀 코스".to_owned();

        let edit = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            source.store(renamed.clone());
            session
                .handle_notice(ChangeNotice {
                    plan_id: plan.id(),
                    publisher: Some(SessionId(2)),
                })
                .await
        };
        let (polled, noticed) = tokio::join!(session.poll_once(), edit);

        assert!(!noticed.expect("notice"), "the poll held the reload slot");
        assert!(polled.expect("poll"));
        assert_eq!(session.current().title, "대전 이틀 코스");
        assert_eq!(session.current().place_count(), plan.place_count());
        assert_eq!(source.fetches(), 3);
    });
}

#[rstest]
fn failed_reloads_keep_the_local_plan(plan: Plan) {
    let hub = Arc::new(BroadcastHub::default());
    let source = Arc::new(MemorySource::with_plan(plan.clone()));
    block_on(async {
        let session = open(1, &hub, &source, plan.id()).await;
        source.forget(plan.id());

        let error = session.reload().await.expect_err("plan gone");
        assert!(matches!(error, SyncError::Gone(id) if id == plan.id()));
        assert_eq!(session.current(), plan);
        assert!(matches!(session.poll_once().await, Err(SyncError::Gone(_))));
    });
}

#[rstest]
fn commit_notifies_other_sessions(plan: Plan) {
    let hub = Arc::new(BroadcastHub::default());
    let source = Arc::new(MemorySource::with_plan(plan.clone()));
    block_on(async {
        let editor = open(1, &hub, &source, plan.id()).await;
        let mut listener = hub.subscribe(plan.id());

        let edited = with_extra_place(&editor.current(), "성심당 본점");
        source.store(edited.clone());
        assert_eq!(editor.commit(edited), 1);
        assert_eq!(editor.current().place_count(), 3);
        let notice = listener.recv().await.expect("notice delivered");
        assert_eq!(notice.publisher, Some(SessionId(1)));
    });
}

#[rstest]
fn run_loop_follows_notices_and_polls(plan: Plan) {
    let hub = Arc::new(BroadcastHub::default());
    let source = Arc::new(MemorySource::with_plan(plan.clone()));
    block_on(async {
        let editor = open(1, &hub, &source, plan.id()).await;
        let viewer = Arc::new(open(2, &hub, &source, plan.id()).await.with_config(SyncConfig {
            poll_interval: Duration::from_secs(5),
        }));
        let (stop, shutdown) = watch::channel(false);
        let follower = tokio::spawn({
            let viewer = viewer.clone();
            async move { viewer.run(shutdown).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let edited = with_extra_place(&editor.current(), "엑스포과학공원");
        source.store(edited.clone());
        editor.commit(edited.clone());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(viewer.current().place_count(), 3);

        source.store(with_extra_place(&edited, "한밭수목원"));
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(viewer.current().place_count(), 4);

        stop.send(true).expect("viewer listening");
        follower.await.expect("run loop exits");
    });
}

#[rstest]
fn shutdown_before_start_returns_immediately(plan: Plan) {
    let hub = Arc::new(BroadcastHub::default());
    let source = Arc::new(MemorySource::with_plan(plan.clone()));
    block_on(async {
        let session = open(1, &hub, &source, plan.id()).await;
        let (_stop, shutdown) = watch::channel(true);
        session.run(shutdown).await;
        assert_eq!(hub.channel_count(), 0);
    });
}

struct KeepTitle;

impl ReconcileStrategy for KeepTitle {
    fn reconcile(&self, current: &Plan, mut fetched: Plan) -> Plan {
        fetched.title.clone_from(&current.title);
        fetched
    }
}

#[rstest]
fn custom_strategies_shape_the_reload(plan: Plan) {
    let hub = Arc::new(BroadcastHub::default());
    let source = Arc::new(MemorySource::with_plan(plan.clone()));
    block_on(async {
        let session = open(1, &hub, &source, plan.id())
            .await
            .with_strategy(Arc::new(KeepTitle));
        let mut renamed = with_extra_place(&plan, "엑스포과학공원");
        renamed.title = "다른 제목".to_owned();
        source.store(renamed);

        assert!(session.reload().await.expect("reload"));
        let current = session.current();
        assert_eq!(current.title, plan.title);
        assert_eq!(current.place_count(), 3);
    });
}

#[rstest]
fn sqlite_store_serves_as_plan_source() {
    let store = SqlitePlanStore::new(Database::open_in_memory().expect("database"));
    let day = NaiveDate::from_ymd_opt(2026, 5, 1).expect("valid date");
    let plan = store
        .create_plan(UserId(1), "대전 하루", day, day)
        .expect("create plan");
    block_on(async {
        let fetched = store.fetch_plan(plan.id()).await.expect("fetch plan");
        assert_eq!(fetched.id(), plan.id());
        let missing = store.fetch_plan(PlanId(77)).await;
        assert!(matches!(missing, Err(SyncError::Gone(PlanId(77)))));
    });
}

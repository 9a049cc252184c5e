//! A viewing session that keeps one plan converged with its source.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use log::{debug, info, warn};
use tokio::{
    sync::{
        broadcast::{self, error::RecvError},
        watch,
    },
    time::MissedTickBehavior,
};
use tourlane_core::{Plan, PlanId};

use crate::{ChangeFeed, ChangeNotice, FullReload, PlanSource, ReconcileStrategy, SessionId, SyncError};

/// Interval of the fallback poll.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Tunables for a [`SyncSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// How often the session polls the source for missed changes.
    pub poll_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Local copy of a shared plan kept in sync with a [`PlanSource`].
///
/// Local edits go through [`SyncSession::commit`], which announces them to
/// other sessions. [`SyncSession::run`] drives the notice and poll triggers
/// until shut down; both end in the same coalesced reload.
pub struct SyncSession {
    id: SessionId,
    plan_id: PlanId,
    feed: Arc<dyn ChangeFeed>,
    source: Arc<dyn PlanSource>,
    strategy: Arc<dyn ReconcileStrategy>,
    config: SyncConfig,
    state: watch::Sender<Plan>,
    reloading: AtomicBool,
    /// A reload was requested while another was in flight.
    requested: AtomicBool,
    reloads: AtomicUsize,
}

impl SyncSession {
    /// Fetch the plan and open a session on it.
    ///
    /// # Errors
    ///
    /// Returns the source's error when the initial fetch fails.
    pub async fn open(
        id: SessionId,
        plan_id: PlanId,
        feed: Arc<dyn ChangeFeed>,
        source: Arc<dyn PlanSource>,
    ) -> Result<Self, SyncError> {
        let plan = source.fetch_plan(plan_id).await?;
        let (state, _) = watch::channel(plan);
        debug!("{id} opened plan {plan_id}");
        Ok(Self {
            id,
            plan_id,
            feed,
            source,
            strategy: Arc::new(FullReload),
            config: SyncConfig::default(),
            state,
            reloading: AtomicBool::new(false),
            requested: AtomicBool::new(false),
            reloads: AtomicUsize::new(0),
        })
    }

    /// Use `strategy` to merge fetched plans.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Arc<dyn ReconcileStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Override the session tunables.
    #[must_use]
    pub const fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Plan this session follows.
    #[must_use]
    pub const fn plan_id(&self) -> PlanId {
        self.plan_id
    }

    /// Snapshot of the local plan.
    #[must_use]
    pub fn current(&self) -> Plan {
        self.state.borrow().clone()
    }

    /// Receiver notified whenever the local plan is replaced.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Plan> {
        self.state.subscribe()
    }

    /// Reloads completed so far.
    #[must_use]
    pub fn reload_count(&self) -> usize {
        self.reloads.load(Ordering::Relaxed)
    }

    /// Adopt a locally edited plan that has already been persisted and tell
    /// the other sessions. Returns how many sessions were notified.
    pub fn commit(&self, plan: Plan) -> usize {
        self.state.send_replace(plan);
        self.feed.publish(ChangeNotice {
            plan_id: self.plan_id,
            publisher: Some(self.id),
        })
    }

    /// Refetch and reconcile the plan. Returns `false` when another reload
    /// was already in flight; that reload fetches once more before it
    /// finishes, so requests made during a fetch are never lost.
    ///
    /// # Errors
    ///
    /// Returns the source's error; the local plan is left untouched.
    pub async fn reload(&self) -> Result<bool, SyncError> {
        self.requested.store(true, Ordering::Release);
        let Some(guard) = self.begin_reload() else {
            debug!("{}: reload already in flight; queued another", self.id);
            return Ok(false);
        };
        self.drain(guard).await
    }

    /// React to a change notice. Notices for other plans and the session's
    /// own notices are ignored.
    ///
    /// # Errors
    ///
    /// Returns the source's error when the reload fails.
    pub async fn handle_notice(&self, notice: ChangeNotice) -> Result<bool, SyncError> {
        if notice.plan_id != self.plan_id || notice.publisher == Some(self.id) {
            return Ok(false);
        }
        self.reload().await
    }

    /// Fetch the plan and reload when its place count differs from the
    /// local copy.
    ///
    /// # Errors
    ///
    /// Returns the source's error.
    pub async fn poll_once(&self) -> Result<bool, SyncError> {
        let Some(guard) = self.begin_reload() else {
            return Ok(false);
        };
        let fetched = self.source.fetch_plan(self.plan_id).await?;
        let known = self.state.borrow().place_count();
        let changed = fetched.place_count() != known;
        if changed {
            info!(
                "{}: poll found {} places where {known} were known",
                self.id,
                fetched.place_count()
            );
            self.install(fetched);
        }
        let reloaded = self.drain(guard).await?;
        Ok(changed || reloaded)
    }

    /// Follow notices and poll until `shutdown` turns `true` or its sender
    /// is dropped. Failed reloads are logged and retried by later triggers.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if *shutdown.borrow() {
            return;
        }
        let mut notices = Some(self.feed.subscribe(self.plan_id));
        let mut poll = tokio::time::interval(self.config.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        poll.tick().await;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                received = next_notice(&mut notices) => match received {
                    Ok(notice) => self.report("notice", self.handle_notice(notice).await),
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("{}: missed {skipped} notices", self.id);
                        self.report("lagged feed", self.reload().await);
                    }
                    Err(RecvError::Closed) => {
                        warn!("{}: change feed closed; relying on polling", self.id);
                        notices = None;
                    }
                },
                _ = poll.tick() => self.report("poll", self.poll_once().await),
            }
        }
        debug!("{} stopped following plan {}", self.id, self.plan_id);
    }

    /// Serve every queued reload request, then release `guard`. A request
    /// that lands after the last fetch but before the release is picked up
    /// by taking the guard again.
    async fn drain(&self, mut guard: ReloadGuard<'_>) -> Result<bool, SyncError> {
        let mut reloaded = false;
        loop {
            while self.requested.swap(false, Ordering::AcqRel) {
                let fetched = self.source.fetch_plan(self.plan_id).await?;
                self.install(fetched);
                reloaded = true;
            }
            drop(guard);
            if !self.requested.load(Ordering::Acquire) {
                return Ok(reloaded);
            }
            match self.begin_reload() {
                Some(next) => guard = next,
                None => return Ok(reloaded),
            }
        }
    }

    fn install(&self, fetched: Plan) {
        self.state.send_modify(|current| {
            *current = self.strategy.reconcile(current, fetched);
        });
        self.reloads.fetch_add(1, Ordering::Relaxed);
    }

    fn begin_reload(&self) -> Option<ReloadGuard<'_>> {
        self.reloading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ReloadGuard(&self.reloading))
    }

    fn report(&self, trigger: &str, result: Result<bool, SyncError>) {
        match result {
            Ok(true) => debug!("{}: reloaded plan {} after {trigger}", self.id, self.plan_id),
            Ok(false) => {}
            Err(error) => warn!("{}: reload after {trigger} failed: {error}", self.id),
        }
    }
}

/// Clears the in-flight flag when a reload ends, however it ends.
struct ReloadGuard<'a>(&'a AtomicBool);

impl Drop for ReloadGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

async fn next_notice(
    notices: &mut Option<broadcast::Receiver<ChangeNotice>>,
) -> Result<ChangeNotice, RecvError> {
    match notices {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

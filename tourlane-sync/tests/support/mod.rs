//! In-memory plan source shared by the synchronisation tests.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tourlane_core::{DayId, NewPlace, Plan, PlanId};
use tourlane_sync::{PlanSource, SyncError};

/// Plan source holding plans in memory, counting fetches and optionally
/// delaying each one.
#[derive(Default)]
pub struct MemorySource {
    plans: Mutex<HashMap<PlanId, Plan>>,
    fetches: AtomicUsize,
    delay: Option<Duration>,
}

impl MemorySource {
    pub fn with_plan(plan: Plan) -> Self {
        let source = Self::default();
        source.store(plan);
        source
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn store(&self, plan: Plan) {
        self.plans.lock().expect("plans lock").insert(plan.id(), plan);
    }

    pub fn forget(&self, id: PlanId) {
        self.plans.lock().expect("plans lock").remove(&id);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlanSource for MemorySource {
    async fn fetch_plan(&self, id: PlanId) -> Result<Plan, SyncError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.plans
            .lock()
            .expect("plans lock")
            .get(&id)
            .cloned()
            .ok_or(SyncError::Gone(id))
    }
}

/// Copy of `plan` with one more place on day one.
pub fn with_extra_place(plan: &Plan, name: &str) -> Plan {
    let mut edited = plan.clone();
    edited
        .add_place(DayId(1), NewPlace::new(name, ""), None)
        .expect("day one exists");
    edited
}

pub fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("runtime")
        .block_on(future)
}

use async_trait::async_trait;
use tourlane_core::{Plan, PlanId};
use tourlane_data::{SqlitePlanStore, StoreError};

use crate::SyncError;

/// Where sessions fetch the authoritative plan from.
#[async_trait]
pub trait PlanSource: Send + Sync {
    /// Fetch the whole plan.
    async fn fetch_plan(&self, id: PlanId) -> Result<Plan, SyncError>;
}

#[async_trait]
impl PlanSource for SqlitePlanStore {
    async fn fetch_plan(&self, id: PlanId) -> Result<Plan, SyncError> {
        let store = self.clone();
        match tokio::task::spawn_blocking(move || store.load_plan(id)).await? {
            Ok(plan) => Ok(plan),
            Err(StoreError::PlanNotFound(missing)) => Err(SyncError::Gone(missing)),
            Err(other) => Err(other.into()),
        }
    }
}

use thiserror::Error;
use tourlane_core::PlanId;
use tourlane_data::StoreError;

/// Errors raised while synchronising a plan.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The plan could not be read from the store.
    #[error("failed to fetch plan")]
    Store(#[from] StoreError),
    /// The blocking fetch task panicked or was cancelled.
    #[error("plan fetch task failed")]
    Task(#[from] tokio::task::JoinError),
    /// The source no longer holds the plan.
    #[error("plan {0} is no longer available")]
    Gone(PlanId),
}

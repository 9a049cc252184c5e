//! Collaboration synchronisation for shared plans.
//!
//! Every session viewing a shared plan keeps a local copy and converges on
//! the stored state by full reload. Reloads are triggered by change notices
//! published on the plan's [`ChangeFeed`] channel and by a fixed-interval
//! poll that compares place counts, covering lost notices. Both paths funnel
//! through one coalesced reload: requests made while a reload is in flight
//! collapse into a single follow-up fetch. Conflicts resolve as last write
//! wins at plan granularity.

mod error;
mod feed;
mod reconcile;
mod session;
mod source;

pub use error::SyncError;
pub use feed::{BroadcastHub, ChangeFeed, ChangeNotice, DEFAULT_CHANNEL_CAPACITY, SessionId};
pub use reconcile::{FullReload, ReconcileStrategy};
pub use session::{DEFAULT_POLL_INTERVAL, SyncConfig, SyncSession};
pub use source::PlanSource;

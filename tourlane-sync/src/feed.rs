//! Publish/subscribe channel for plan change notices.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use log::trace;
use tokio::sync::broadcast;
use tourlane_core::PlanId;

/// Buffered notices per plan before slow subscribers start lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// Identifier of one viewing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// A plan changed. Receivers reload the whole plan and never read more
/// than the plan id from a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeNotice {
    /// Plan that changed.
    pub plan_id: PlanId,
    /// Session that made the change, when known.
    pub publisher: Option<SessionId>,
}

/// Change channel scoped by plan id.
pub trait ChangeFeed: Send + Sync {
    /// Announce a change. Returns how many subscribers were reached.
    fn publish(&self, notice: ChangeNotice) -> usize;

    /// Subscribe to notices for `plan`.
    fn subscribe(&self, plan: PlanId) -> broadcast::Receiver<ChangeNotice>;
}

/// In-process [`ChangeFeed`] with one broadcast channel per plan.
///
/// # Examples
/// ```
/// use tourlane_core::PlanId;
/// use tourlane_sync::{BroadcastHub, ChangeFeed, ChangeNotice};
///
/// let hub = BroadcastHub::default();
/// let mut receiver = hub.subscribe(PlanId(7));
/// let reached = hub.publish(ChangeNotice { plan_id: PlanId(7), publisher: None });
/// assert_eq!(reached, 1);
/// assert_eq!(receiver.try_recv().map(|notice| notice.plan_id), Ok(PlanId(7)));
/// ```
#[derive(Debug, Clone)]
pub struct BroadcastHub {
    channels: Arc<Mutex<HashMap<PlanId, broadcast::Sender<ChangeNotice>>>>,
    capacity: usize,
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl BroadcastHub {
    /// Hub whose channels buffer `capacity` notices.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Number of plans with a live channel.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl ChangeFeed for BroadcastHub {
    fn publish(&self, notice: ChangeNotice) -> usize {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = channels.get(&notice.plan_id) else {
            trace!("no subscribers for plan {}", notice.plan_id);
            return 0;
        };
        if let Ok(reached) = sender.send(notice) {
            reached
        } else {
            channels.remove(&notice.plan_id);
            0
        }
    }

    fn subscribe(&self, plan: PlanId) -> broadcast::Receiver<ChangeNotice> {
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(plan)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }
}

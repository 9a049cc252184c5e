use tourlane_core::Plan;

/// How a session merges a freshly fetched plan into its local copy.
pub trait ReconcileStrategy: Send + Sync {
    /// Produce the new local plan from the current copy and the fetched one.
    fn reconcile(&self, current: &Plan, fetched: Plan) -> Plan;
}

/// Replace the local copy wholesale; last write wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullReload;

impl ReconcileStrategy for FullReload {
    fn reconcile(&self, _current: &Plan, fetched: Plan) -> Plan {
        fetched
    }
}

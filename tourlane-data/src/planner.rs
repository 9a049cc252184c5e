//! Concurrent resolution of a plan's pending and failed edges.
//!
//! [`ItineraryPlanner::refresh`] snapshots the plan's edge tickets, resolves
//! them all concurrently and writes each result back by edge identity.
//! Results for edges that changed while in flight are discarded by the
//! itinerary, so arrival order does not matter.

use std::{sync::Arc, time::Duration};

use futures_util::future::join_all;
use log::{debug, info, warn};
use tourlane_core::{ApplyOutcome, EdgeResolution, EdgeTicket, Plan, RouteError};

use crate::{ResolvedRoute, RouteResolver};

/// Default deadline for resolving a single edge, geocoding included.
pub const DEFAULT_EDGE_TIMEOUT: Duration = Duration::from_secs(20);

/// Counts from one [`ItineraryPlanner::refresh`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Results written to their edge.
    pub applied: usize,
    /// Results discarded because the edge changed meanwhile.
    pub stale: usize,
    /// Written results that were failures.
    pub failed: usize,
}

/// Drives edge resolution for plans.
#[derive(Debug, Clone)]
pub struct ItineraryPlanner {
    routes: Arc<RouteResolver>,
    edge_timeout: Duration,
}

impl ItineraryPlanner {
    /// Create a planner with [`DEFAULT_EDGE_TIMEOUT`].
    #[must_use]
    pub const fn new(routes: Arc<RouteResolver>) -> Self {
        Self {
            routes,
            edge_timeout: DEFAULT_EDGE_TIMEOUT,
        }
    }

    /// Set the per-edge deadline.
    #[must_use]
    pub const fn with_edge_timeout(mut self, edge_timeout: Duration) -> Self {
        self.edge_timeout = edge_timeout;
        self
    }

    /// The route resolver used for each edge.
    #[must_use]
    pub fn routes(&self) -> &RouteResolver {
        &self.routes
    }

    /// Resolve every pending or failed edge of `plan` and apply the results.
    pub async fn refresh(&self, plan: &mut Plan) -> RefreshReport {
        let tickets = plan.edge_tickets();
        if tickets.is_empty() {
            return RefreshReport::default();
        }
        debug!("plan {}: resolving {} edges", plan.id(), tickets.len());

        let resolved = self.resolve_tickets(tickets).await;
        let mut report = RefreshReport::default();
        for (ticket, resolution) in resolved {
            let failed = resolution.result.is_err();
            match plan.apply_resolution(&ticket, resolution) {
                ApplyOutcome::Applied => {
                    report.applied += 1;
                    if failed {
                        report.failed += 1;
                    }
                }
                ApplyOutcome::Stale => {
                    debug!("discarding stale result for edge {}", ticket.key);
                    report.stale += 1;
                }
            }
        }
        info!(
            "plan {}: applied {} edges ({} failed), discarded {} stale",
            plan.id(),
            report.applied,
            report.failed,
            report.stale
        );
        report
    }

    /// Resolve `tickets` concurrently. Results come back in ticket order.
    pub async fn resolve_tickets(
        &self,
        tickets: Vec<EdgeTicket>,
    ) -> Vec<(EdgeTicket, EdgeResolution)> {
        let resolutions = join_all(tickets.iter().map(|ticket| self.resolve_ticket(ticket))).await;
        tickets.into_iter().zip(resolutions).collect()
    }

    /// Resolve one ticket within the edge deadline.
    pub async fn resolve_ticket(&self, ticket: &EdgeTicket) -> EdgeResolution {
        let result = tokio::time::timeout(self.edge_timeout, self.resolve_route(ticket))
            .await
            .unwrap_or_else(|_| {
                warn!(
                    "edge {} exceeded its {}s deadline",
                    ticket.key,
                    self.edge_timeout.as_secs()
                );
                Err(RouteError::Timeout {
                    timeout_secs: self.edge_timeout.as_secs(),
                })
            });

        match result {
            Ok(route) => EdgeResolution {
                origin_coord: ticket.origin.coord.is_none().then_some(route.origin),
                destination_coord: ticket.destination.coord.is_none().then_some(route.destination),
                result: Ok(route.outcome),
            },
            Err(error) => EdgeResolution::from_result(Err(error)),
        }
    }

    /// Route between the ticket's waypoints, retrying once with the relaxed
    /// query when exactly one side fails to geocode.
    async fn resolve_route(&self, ticket: &EdgeTicket) -> Result<ResolvedRoute, RouteError> {
        match self
            .routes
            .resolve_between(&ticket.origin, &ticket.destination, ticket.mode)
            .await
        {
            Err(RouteError::PartialFailure {
                failed, resolved, ..
            }) => {
                self.routes
                    .retry_side(
                        &ticket.origin,
                        &ticket.destination,
                        ticket.mode,
                        failed,
                        resolved,
                    )
                    .await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use geo::Coord;
    use rstest::rstest;
    use tourlane_core::{
        DayId, EdgeDisplay, EdgeKey, EdgeState, MemoryCoordinateCache, MemoryRouteCache,
        NewPlace, RouteOutcome, TransitService, TransportMode, VendorError,
        test_support::{StubDirections, StubGeocoder, StubTransit, sample_plan},
    };

    use crate::CoordinateResolver;

    const A: Coord<f64> = Coord { x: 127.38, y: 36.35 };
    const B: Coord<f64> = Coord { x: 127.39, y: 36.36 };
    const C: Coord<f64> = Coord { x: 127.40, y: 36.37 };

    struct SlowTransit;

    #[async_trait]
    impl TransitService for SlowTransit {
        async fn transit_routes(
            &self,
            _origin: Coord<f64>,
            _destination: Coord<f64>,
            _mode: TransportMode,
        ) -> Result<RouteOutcome, VendorError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(RouteOutcome::NoRoute)
        }
    }

    fn planner(geocoder: StubGeocoder, transit: Arc<dyn TransitService>) -> ItineraryPlanner {
        let coordinates = Arc::new(CoordinateResolver::new(
            Arc::new(geocoder),
            Arc::new(MemoryCoordinateCache::default()),
        ));
        let routes = RouteResolver::new(
            Arc::new(StubDirections::default()),
            transit,
            Arc::new(MemoryRouteCache::default()),
            coordinates,
        );
        ItineraryPlanner::new(Arc::new(routes))
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .expect("runtime")
            .block_on(future)
    }

    fn plan_with_coords(mode: TransportMode) -> Plan {
        let mut plan = sample_plan(1, &[], Some(mode));
        for (name, coord) in [("A", A), ("B", B), ("C", C)] {
            plan.add_place(DayId(1), NewPlace::new(name, "").with_coord(coord), None)
                .expect("add");
        }
        plan
    }

    #[rstest]
    fn refresh_resolves_every_pending_edge() {
        let planner = planner(
            StubGeocoder::default(),
            Arc::new(StubTransit::with_options(&[20, 30])),
        );
        let mut plan = plan_with_coords(TransportMode::Bus);
        assert_eq!(plan.edge_tickets().len(), 2);

        let report = block_on(planner.refresh(&mut plan));
        assert_eq!(
            report,
            RefreshReport {
                applied: 2,
                stale: 0,
                failed: 0,
            }
        );
        assert!(plan.edge_tickets().is_empty());
        for (_, edge) in plan.edges() {
            assert_eq!(edge.display(), EdgeDisplay::Ready);
        }
    }

    #[rstest]
    fn no_route_answers_are_terminal() {
        let planner = planner(StubGeocoder::default(), Arc::new(StubTransit::default()));
        let mut plan = plan_with_coords(TransportMode::Subway);
        block_on(planner.refresh(&mut plan));
        for (_, edge) in plan.edges() {
            assert_eq!(edge.state(), &EdgeState::NoRoute);
        }
        assert_eq!(block_on(planner.refresh(&mut plan)), RefreshReport::default());
    }

    #[rstest]
    fn slow_edges_fail_with_a_timeout_and_are_retried_later() {
        let planner = planner(StubGeocoder::default(), Arc::new(SlowTransit))
            .with_edge_timeout(Duration::from_millis(20));
        let mut plan = plan_with_coords(TransportMode::Bus);

        let report = block_on(planner.refresh(&mut plan));
        assert_eq!(report.failed, 2);
        let first = plan.days()[0].places()[0].id();
        let edge = plan.edge(EdgeKey::Place(first)).expect("edge");
        assert!(matches!(edge.state(), EdgeState::Failed { .. }));
        assert_eq!(edge.display(), EdgeDisplay::Retry);
        assert_eq!(plan.edge_tickets().len(), 2);
    }

    #[rstest]
    fn learnt_coordinates_are_written_back() {
        let geocoder = StubGeocoder::default()
            .with_address("대전 중구 대종로 480", "성심당", A)
            .with_address("대전 유성구 대덕대로 480", "한빛탑", B);
        let planner = planner(geocoder, Arc::new(StubTransit::with_options(&[15])));
        let mut plan = sample_plan(1, &[], Some(TransportMode::Bus));
        let (first, _) = plan
            .add_place(DayId(1), NewPlace::new("성심당", "대전 중구 대종로 480"), None)
            .expect("add");
        let (second, _) = plan
            .add_place(DayId(1), NewPlace::new("한빛탑", "대전 유성구 대덕대로 480"), None)
            .expect("add");

        block_on(planner.refresh(&mut plan));
        assert_eq!(plan.place(first).and_then(|place| place.coord()), Some(A));
        assert_eq!(plan.place(second).and_then(|place| place.coord()), Some(B));
    }

    #[rstest]
    fn partial_failures_retry_the_failed_side_by_name() {
        let geocoder = StubGeocoder::default().with_keyword("대전 한빛탑", "한빛탑", B);
        let planner = planner(geocoder, Arc::new(StubTransit::with_options(&[15])));
        let mut plan = sample_plan(1, &[], Some(TransportMode::Bus));
        plan.add_place(DayId(1), NewPlace::new("A", "").with_coord(A), None)
            .expect("add");
        let (tower, _) = plan
            .add_place(DayId(1), NewPlace::new("한빛탑", "대전 유성구 없는로 1"), None)
            .expect("add");

        let report = block_on(planner.refresh(&mut plan));
        assert_eq!(report.failed, 0);
        // Found by name; stored against the unchanged address.
        assert_eq!(plan.place(tower).and_then(|place| place.coord()), Some(B));
    }

    #[rstest]
    fn results_for_reordered_edges_are_discarded() {
        let planner = planner(
            StubGeocoder::default(),
            Arc::new(StubTransit::with_options(&[10])),
        );
        let mut plan = plan_with_coords(TransportMode::Bus);
        let tickets = plan.edge_tickets();
        let resolved = block_on(planner.resolve_tickets(tickets));

        let ids: Vec<_> = plan.days()[0].places().iter().map(|place| place.id()).collect();
        plan.move_place(ids[2], DayId(1), 1).expect("move");

        let outcomes: Vec<ApplyOutcome> = resolved
            .into_iter()
            .map(|(ticket, resolution)| plan.apply_resolution(&ticket, resolution))
            .collect();
        assert_eq!(outcomes, [ApplyOutcome::Stale, ApplyOutcome::Stale]);
        assert_eq!(plan.edge_tickets().len(), 2);
    }
}

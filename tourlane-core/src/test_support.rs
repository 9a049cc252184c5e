//! Test-only stub services and fixture builders shared by unit and behaviour
//! tests across the workspace.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use geo::Coord;

use crate::{
    DayId, DirectionsService, DrivingRoute, GeocodeDocument, GeocodingService, NewPlace, Plan,
    PlanId, RouteOutcome, RouteSummary, TransitItinerary, TransitService, TransportMode, UserId,
    VendorError,
};

/// Geocoder answering from fixed tables and counting calls.
///
/// Queries missing from a table yield an empty document list.
#[derive(Debug, Default)]
pub struct StubGeocoder {
    addresses: HashMap<String, Vec<GeocodeDocument>>,
    keywords: HashMap<String, Vec<GeocodeDocument>>,
    failing: bool,
    address_calls: AtomicUsize,
    keyword_calls: AtomicUsize,
}

impl StubGeocoder {
    /// Answer an address search for `query` with one document.
    #[must_use]
    pub fn with_address(mut self, query: &str, name: &str, coord: Coord<f64>) -> Self {
        self.addresses
            .entry(query.to_owned())
            .or_default()
            .push(document(name, coord));
        self
    }

    /// Answer a keyword search for `query` with one more document.
    #[must_use]
    pub fn with_keyword(mut self, query: &str, name: &str, coord: Coord<f64>) -> Self {
        self.keywords
            .entry(query.to_owned())
            .or_default()
            .push(document(name, coord));
        self
    }

    /// Fail every call with a network error.
    #[must_use]
    pub const fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Address searches made so far.
    #[must_use]
    pub fn address_calls(&self) -> usize {
        self.address_calls.load(Ordering::SeqCst)
    }

    /// Keyword searches made so far.
    #[must_use]
    pub fn keyword_calls(&self) -> usize {
        self.keyword_calls.load(Ordering::SeqCst)
    }

    /// All searches made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.address_calls() + self.keyword_calls()
    }

    fn answer(
        &self,
        table: &HashMap<String, Vec<GeocodeDocument>>,
        query: &str,
    ) -> Result<Vec<GeocodeDocument>, VendorError> {
        if self.failing {
            return Err(network_error("geocode"));
        }
        Ok(table.get(query).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl GeocodingService for StubGeocoder {
    async fn search_address(&self, query: &str) -> Result<Vec<GeocodeDocument>, VendorError> {
        self.address_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(&self.addresses, query)
    }

    async fn search_keyword(&self, query: &str) -> Result<Vec<GeocodeDocument>, VendorError> {
        self.keyword_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(&self.keywords, query)
    }
}

/// Directions service returning a straight two-point route.
#[derive(Debug, Default)]
pub struct StubDirections {
    calls: AtomicUsize,
}

impl StubDirections {
    /// Calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectionsService for StubDirections {
    async fn driving_route(
        &self,
        origin: Coord<f64>,
        destination: Coord<f64>,
        mode: TransportMode,
    ) -> Result<RouteOutcome, VendorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let fare = (mode == TransportMode::Taxi).then_some(4_800);
        Ok(RouteOutcome::Driving(DrivingRoute {
            summary: summary(12, fare),
            path: vec![origin, destination],
        }))
    }
}

/// Transit service answering every call with the same outcome.
#[derive(Debug)]
pub struct StubTransit {
    outcome: Result<RouteOutcome, VendorError>,
    calls: AtomicUsize,
}

impl Default for StubTransit {
    fn default() -> Self {
        Self::with_outcome(Ok(RouteOutcome::NoRoute))
    }
}

impl StubTransit {
    /// Answer with itineraries of the given durations in minutes.
    #[must_use]
    pub fn with_options(minutes: &[u64]) -> Self {
        Self::with_outcome(Ok(transit_outcome(minutes)))
    }

    /// Answer with `outcome`.
    #[must_use]
    pub const fn with_outcome(outcome: Result<RouteOutcome, VendorError>) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
        }
    }

    /// Calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransitService for StubTransit {
    async fn transit_routes(
        &self,
        _origin: Coord<f64>,
        _destination: Coord<f64>,
        _mode: TransportMode,
    ) -> Result<RouteOutcome, VendorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

/// Transit outcome with one itinerary per duration, in the given order.
#[must_use]
pub fn transit_outcome(minutes: &[u64]) -> RouteOutcome {
    RouteOutcome::transit(
        minutes
            .iter()
            .map(|minutes| TransitItinerary {
                summary: summary(*minutes, Some(1_500)),
                bus_transfers: 1,
                subway_transfers: 0,
                legs: Vec::new(),
                map_object: None,
            })
            .collect(),
    )
}

/// Plan spanning `days` days with the named places appended to day 1 in
/// order, edges defaulting to `mode`.
///
/// # Panics
///
/// Panics if the fixed fixture dates are rejected.
#[must_use]
pub fn sample_plan(days: u32, places: &[&str], mode: Option<TransportMode>) -> Plan {
    let start = NaiveDate::from_ymd_opt(2026, 5, 1).expect("valid start date");
    let end = start
        .checked_add_days(chrono::Days::new(u64::from(days.saturating_sub(1))))
        .expect("valid end date");
    let mut plan = Plan::new(PlanId(1), UserId(1), "Daejeon trip", start, end).expect("plan");
    plan.set_default_mode(mode);
    for name in places {
        plan.add_place(DayId(1), NewPlace::new(*name, ""), None)
            .expect("day 1 exists");
    }
    plan
}

fn document(name: &str, coord: Coord<f64>) -> GeocodeDocument {
    GeocodeDocument {
        name: name.to_owned(),
        coord,
    }
}

fn summary(minutes: u64, fare: Option<u32>) -> RouteSummary {
    RouteSummary {
        duration: Duration::from_secs(minutes * 60),
        distance_m: u32::try_from(minutes * 400).unwrap_or(u32::MAX),
        fare,
    }
}

fn network_error(endpoint: &str) -> VendorError {
    VendorError::Network {
        url: format!("http://stub/api/{endpoint}"),
        message: "stub failure".to_owned(),
    }
}

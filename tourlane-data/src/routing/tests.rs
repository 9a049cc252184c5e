//! Unit tests for route resolution.

use std::sync::Arc;

use geo::Coord;
use rstest::{fixture, rstest};
use tourlane_core::{
    MemoryCoordinateCache, MemoryRouteCache, RouteCache, RouteError, RouteKey, RouteOutcome,
    Side, TransportMode, VendorError, Waypoint,
    test_support::{StubDirections, StubGeocoder, StubTransit},
};

use super::RouteResolver;
use crate::CoordinateResolver;

const STATION: Coord<f64> = Coord { x: 127.434, y: 36.332 };
const EXPO: Coord<f64> = Coord { x: 127.387, y: 36.376 };

struct Harness {
    resolver: RouteResolver,
    geocoder: Arc<StubGeocoder>,
    directions: Arc<StubDirections>,
    transit: Arc<StubTransit>,
    routes: Arc<MemoryRouteCache>,
}

fn harness(geocoder: StubGeocoder, transit: StubTransit) -> Harness {
    let geocoder = Arc::new(geocoder);
    let directions = Arc::new(StubDirections::default());
    let transit = Arc::new(transit);
    let routes = Arc::new(MemoryRouteCache::default());
    let coordinates = Arc::new(CoordinateResolver::new(
        geocoder.clone(),
        Arc::new(MemoryCoordinateCache::default()),
    ));
    let resolver = RouteResolver::new(
        directions.clone(),
        transit.clone(),
        routes.clone(),
        coordinates,
    );
    Harness {
        resolver,
        geocoder,
        directions,
        transit,
        routes,
    }
}

#[fixture]
fn plain() -> Harness {
    harness(StubGeocoder::default(), StubTransit::default())
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime")
        .block_on(future)
}

fn waypoint(label: &str, address: &str, coord: Option<Coord<f64>>) -> Waypoint {
    Waypoint {
        label: label.to_owned(),
        address: address.to_owned(),
        coord,
    }
}

#[rstest]
fn repeat_resolve_is_served_from_cache(plain: Harness) {
    let first = block_on(plain.resolver.resolve(STATION, EXPO, TransportMode::Car)).expect("route");
    let second =
        block_on(plain.resolver.resolve(STATION, EXPO, TransportMode::Car)).expect("route");
    assert_eq!(first, second);
    assert_eq!(plain.directions.calls(), 1);
}

#[rstest]
fn nearby_coordinates_share_a_cache_entry(plain: Harness) {
    block_on(plain.resolver.resolve(STATION, EXPO, TransportMode::Taxi)).expect("route");
    let jittered = Coord {
        x: STATION.x + 0.000_001,
        y: STATION.y,
    };
    block_on(plain.resolver.resolve(jittered, EXPO, TransportMode::Taxi)).expect("route");
    assert_eq!(plain.directions.calls(), 1);
}

#[rstest]
fn modes_are_cached_separately(plain: Harness) {
    block_on(plain.resolver.resolve(STATION, EXPO, TransportMode::Car)).expect("route");
    let taxi = block_on(plain.resolver.resolve(STATION, EXPO, TransportMode::Taxi)).expect("route");
    assert_eq!(plain.directions.calls(), 2);
    assert_eq!(taxi.summary().and_then(|s| s.fare), Some(4_800));
}

#[rstest]
fn empty_transit_search_is_a_cached_no_route(plain: Harness) {
    let outcome = block_on(plain.resolver.resolve(STATION, EXPO, TransportMode::Bus)).expect("ok");
    assert_eq!(outcome, RouteOutcome::NoRoute);

    let cached = plain
        .routes
        .get(&RouteKey::new(STATION, EXPO, TransportMode::Bus))
        .expect("get")
        .expect("no-route answers are cached");
    assert_eq!(cached.outcome, RouteOutcome::NoRoute);

    block_on(plain.resolver.resolve(STATION, EXPO, TransportMode::Bus)).expect("ok");
    assert_eq!(plain.transit.calls(), 1);
}

#[rstest]
#[case(TransportMode::Walk)]
#[case(TransportMode::Bicycle)]
fn local_modes_never_reach_a_vendor(plain: Harness, #[case] mode: TransportMode) {
    let outcome = block_on(plain.resolver.resolve(STATION, EXPO, mode)).expect("estimate");
    assert!(outcome.is_estimate());
    assert_eq!(plain.directions.calls() + plain.transit.calls(), 0);
    let cached = plain
        .routes
        .get(&RouteKey::new(STATION, EXPO, mode))
        .expect("get")
        .expect("estimates are cached");
    assert!(cached.is_estimate());
}

#[rstest]
fn transit_vendor_failures_are_not_cached() {
    let failure = VendorError::Http {
        url: "http://stub/api/transit".to_owned(),
        status: 502,
        message: "bad gateway".to_owned(),
    };
    let harness = harness(StubGeocoder::default(), StubTransit::with_outcome(Err(failure)));
    let err = block_on(harness.resolver.resolve(STATION, EXPO, TransportMode::Subway))
        .expect_err("should fail");
    assert!(matches!(err, RouteError::Vendor(VendorError::Http { status: 502, .. })));
    assert!(harness.routes.is_empty());
}

#[rstest]
fn known_coordinates_skip_geocoding(plain: Harness) {
    let origin = waypoint("대전역", "", Some(STATION));
    let destination = waypoint("엑스포", "", Some(EXPO));
    let route = block_on(plain.resolver.resolve_between(&origin, &destination, TransportMode::Car))
        .expect("route");
    assert_eq!(route.origin, STATION);
    assert_eq!(route.destination, EXPO);
    assert_eq!(plain.geocoder.calls(), 0);
}

#[rstest]
fn missing_coordinates_are_geocoded() {
    let harness = harness(
        StubGeocoder::default().with_address("대전 동구 중앙로 215", "중앙로 215", STATION),
        StubTransit::with_options(&[25]),
    );
    let origin = waypoint("대전역", "대전 동구 중앙로 215", None);
    let destination = waypoint("엑스포", "", Some(EXPO));
    let route =
        block_on(harness.resolver.resolve_between(&origin, &destination, TransportMode::Bus))
            .expect("route");
    assert_eq!(route.origin, STATION);
    assert_eq!(route.outcome.option_count(), 1);
}

#[rstest]
fn one_missing_side_is_a_partial_failure(plain: Harness) {
    let origin = waypoint("대전역", "", Some(STATION));
    let destination = waypoint("비밀 장소", "대전 어딘가 999", None);
    let err = block_on(plain.resolver.resolve_between(&origin, &destination, TransportMode::Car))
        .expect_err("destination cannot be found");
    assert_eq!(
        err,
        RouteError::PartialFailure {
            failed: Side::Destination,
            query: "대전 어딘가 999".to_owned(),
            resolved: STATION,
        }
    );
}

#[rstest]
fn both_missing_sides_are_not_found(plain: Harness) {
    let origin = waypoint("", "대전 어딘가 1", None);
    let destination = waypoint("", "대전 어딘가 2", None);
    let err = block_on(plain.resolver.resolve_between(&origin, &destination, TransportMode::Car))
        .expect_err("nothing can be found");
    assert!(matches!(err, RouteError::NotFound { .. }));
}

#[rstest]
fn vendor_errors_take_precedence() {
    let harness = harness(StubGeocoder::default().failing(), StubTransit::default());
    let origin = waypoint("대전역", "", None);
    let destination = waypoint("엑스포", "", Some(EXPO));
    let err = block_on(harness.resolver.resolve_between(&origin, &destination, TransportMode::Car))
        .expect_err("geocoder is down");
    assert!(matches!(err, RouteError::Vendor(_)));
}

#[rstest]
fn retry_side_uses_the_place_name() {
    let harness = harness(
        StubGeocoder::default().with_keyword("대전 한빛탑", "한빛탑", EXPO),
        StubTransit::default(),
    );
    let origin = waypoint("대전역", "", Some(STATION));
    let destination = waypoint("한빛탑", "대전 유성구 대덕대로 480 (잘못된 주소)", None);

    let err = block_on(harness.resolver.resolve_between(&origin, &destination, TransportMode::Car))
        .expect_err("address does not resolve");
    let RouteError::PartialFailure {
        failed, resolved, ..
    } = err
    else {
        panic!("expected a partial failure, got {err:?}");
    };

    let address_calls = harness.geocoder.address_calls();
    let route = block_on(harness.resolver.retry_side(
        &origin,
        &destination,
        TransportMode::Car,
        failed,
        resolved,
    ))
    .expect("relaxed query resolves");
    assert_eq!(route.origin, STATION);
    assert_eq!(route.destination, EXPO);
    assert!(harness.geocoder.address_calls() > address_calls);
}

#[rstest]
fn retry_side_without_relaxed_query_keeps_the_failure(plain: Harness) {
    let origin = waypoint("대전역", "", Some(STATION));
    let destination = waypoint("", "대전 어딘가 999", None);
    let err = block_on(plain.resolver.retry_side(
        &origin,
        &destination,
        TransportMode::Car,
        Side::Destination,
        STATION,
    ))
    .expect_err("no relaxed query");
    assert!(matches!(
        err,
        RouteError::PartialFailure {
            failed: Side::Destination,
            ..
        }
    ));
    assert_eq!(plain.geocoder.calls(), 0);
}

//! Behavioural tests for route and coordinate resolution backed by SQLite.

use std::{cell::RefCell, future::Future, sync::Arc};

use chrono::NaiveDate;
use geo::Coord;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tourlane_core::{
    DayId, EdgeDisplay, GeocodeError, MatchSource, NewPlace, PlanId, ResolvedCoordinate,
    RouteError, RouteOutcome, TransportMode, UserId,
    test_support::{StubDirections, StubGeocoder, StubTransit},
};
use tourlane_data::{
    CoordinateResolver, Database, ItineraryPlanner, RouteResolver, SqliteCoordinateCache,
    SqlitePlanStore, SqliteRouteCache,
};

const STATION: Coord<f64> = Coord { x: 127.434, y: 36.332 };
const EXPO: Coord<f64> = Coord { x: 127.387, y: 36.376 };
const SEOUL_CITY_HALL: Coord<f64> = Coord { x: 126.978, y: 37.566 };

/// Vendors, caches and resolvers wired over one in-memory database.
struct World {
    database: Database,
    geocoder: Arc<StubGeocoder>,
    transit: Arc<StubTransit>,
    geocoder_calls_after_first: usize,
    plan: Option<PlanId>,
}

impl World {
    fn new(geocoder: StubGeocoder, transit: StubTransit) -> Self {
        Self {
            database: Database::open_in_memory().expect("open database"),
            geocoder: Arc::new(geocoder),
            transit: Arc::new(transit),
            geocoder_calls_after_first: 0,
            plan: None,
        }
    }

    fn coordinates(&self) -> Arc<CoordinateResolver> {
        Arc::new(CoordinateResolver::new(
            self.geocoder.clone(),
            Arc::new(SqliteCoordinateCache::new(self.database.clone())),
        ))
    }

    fn routes(&self) -> RouteResolver {
        RouteResolver::new(
            Arc::new(StubDirections::default()),
            self.transit.clone(),
            Arc::new(SqliteRouteCache::new(self.database.clone())),
            self.coordinates(),
        )
    }

    fn plans(&self) -> SqlitePlanStore {
        SqlitePlanStore::new(self.database.clone())
    }
}

type WorldCell = RefCell<Option<World>>;

/// Answers collected by `When` steps.
#[derive(Default)]
struct Answers {
    routes: Vec<Result<RouteOutcome, RouteError>>,
    coordinates: Vec<Result<ResolvedCoordinate, GeocodeError>>,
}

type AnswersCell = RefCell<Answers>;

#[fixture]
fn world() -> WorldCell {
    RefCell::new(None)
}

#[fixture]
fn answers() -> AnswersCell {
    RefCell::new(Answers::default())
}

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime")
        .block_on(future)
}

fn with_world<T>(cell: &WorldCell, f: impl FnOnce(&mut World) -> T) -> T {
    let mut guard = cell.borrow_mut();
    let world = guard.as_mut().expect("world must be initialised");
    f(world)
}

// --- Given steps ---

#[given("a transit vendor offering 25 and 40 minute itineraries")]
fn transit_with_options(#[from(world)] cell: &WorldCell) {
    *cell.borrow_mut() = Some(World::new(
        StubGeocoder::default(),
        StubTransit::with_options(&[25, 40]),
    ));
}

#[given("a transit vendor without itineraries")]
fn transit_without_options(#[from(world)] cell: &WorldCell) {
    *cell.borrow_mut() = Some(World::new(StubGeocoder::default(), StubTransit::default()));
}

#[given("a geocoder that only knows City Hall outside the region")]
fn geocoder_out_of_region(#[from(world)] cell: &WorldCell) {
    let geocoder = StubGeocoder::default().with_keyword("시청", "서울시청", SEOUL_CITY_HALL);
    *cell.borrow_mut() = Some(World::new(geocoder, StubTransit::default()));
}

#[given("a geocoder that knows the spaced Expo-ro address")]
fn geocoder_with_expo(#[from(world)] cell: &WorldCell) {
    let geocoder = StubGeocoder::default().with_address("대전 엑스포로 85", "엑스포로 85", EXPO);
    *cell.borrow_mut() = Some(World::new(geocoder, StubTransit::default()));
}

#[given("a stored plan with two placed stops connected by bus")]
fn stored_plan(#[from(world)] cell: &WorldCell) {
    with_world(cell, |world| {
        let day = NaiveDate::from_ymd_opt(2026, 5, 1).expect("valid date");
        let store = world.plans();
        let mut plan = store
            .create_plan(UserId(1), "대전 하루", day, day)
            .expect("create plan");
        plan.set_default_mode(Some(TransportMode::Bus));
        for (name, coord) in [("대전역", STATION), ("엑스포과학공원", EXPO)] {
            plan.add_place(DayId(1), NewPlace::new(name, "").with_coord(coord), None)
                .expect("add place");
        }
        store.save_plan(&plan).expect("save plan");
        world.plan = Some(plan.id());
    });
}

// --- When steps ---

#[when("the bus route from Daejeon Station to Expo Park is resolved twice")]
fn resolve_twice(#[from(world)] cell: &WorldCell, #[from(answers)] out: &AnswersCell) {
    with_world(cell, |world| {
        for _ in 0..2 {
            let answer = block_on(world.routes().resolve(STATION, EXPO, TransportMode::Bus));
            out.borrow_mut().routes.push(answer);
        }
    });
}

#[when("City Hall is located twice")]
fn locate_twice(#[from(world)] cell: &WorldCell, #[from(answers)] out: &AnswersCell) {
    with_world(cell, |world| {
        let first = block_on(world.coordinates().resolve("시청"));
        world.geocoder_calls_after_first = world.geocoder.calls();
        let second = block_on(world.coordinates().resolve("시청"));
        out.borrow_mut().coordinates.extend([first, second]);
    });
}

#[when("the unspaced Expo-ro address is located")]
fn locate_unspaced(#[from(world)] cell: &WorldCell, #[from(answers)] out: &AnswersCell) {
    with_world(cell, |world| {
        let answer = block_on(world.coordinates().resolve("대전 엑스포로85"));
        out.borrow_mut().coordinates.push(answer);
    });
}

#[when("the plan is refreshed and saved")]
fn refresh_and_save(#[from(world)] cell: &WorldCell) {
    with_world(cell, |world| {
        let store = world.plans();
        let id = world.plan.expect("plan stored");
        let mut plan = store.load_plan(id).expect("load plan");
        let planner = ItineraryPlanner::new(Arc::new(world.routes()));
        let report = block_on(planner.refresh(&mut plan));
        assert_eq!(report.applied, 1);
        store.save_plan(&plan).expect("save plan");
    });
}

// --- Then steps ---

#[then("both answers list 2 transit options")]
fn two_options_each(#[from(answers)] out: &AnswersCell) {
    let answers = out.borrow();
    assert_eq!(answers.routes.len(), 2);
    for answer in &answers.routes {
        let outcome = answer.as_ref().expect("route resolved");
        assert_eq!(outcome.option_count(), 2);
    }
}

#[then("both answers report no route")]
fn no_route_each(#[from(answers)] out: &AnswersCell) {
    let answers = out.borrow();
    assert_eq!(answers.routes.len(), 2);
    for answer in &answers.routes {
        assert!(answer.as_ref().expect("route resolved").is_no_route());
    }
}

#[then("the transit vendor was called once")]
fn transit_called_once(#[from(world)] cell: &WorldCell) {
    with_world(cell, |world| assert_eq!(world.transit.calls(), 1));
}

#[then("both answers are flagged as outside the region")]
fn flagged_outside(#[from(answers)] out: &AnswersCell) {
    let answers = out.borrow();
    assert_eq!(answers.coordinates.len(), 2);
    for answer in &answers.coordinates {
        let resolved = answer.as_ref().expect("coordinate resolved");
        assert!(!resolved.in_region);
        assert_eq!(resolved.coord, SEOUL_CITY_HALL);
    }
}

#[then("the geocoder was only consulted for the first lookup")]
fn geocoder_consulted_once(#[from(world)] cell: &WorldCell) {
    with_world(cell, |world| {
        assert!(world.geocoder_calls_after_first > 0);
        assert_eq!(world.geocoder.calls(), world.geocoder_calls_after_first);
    });
}

#[then("the address search matched inside the region")]
fn matched_inside(#[from(answers)] out: &AnswersCell) {
    let answers = out.borrow();
    let resolved = answers
        .coordinates
        .first()
        .expect("one answer")
        .as_ref()
        .expect("coordinate resolved");
    assert_eq!(resolved.source, MatchSource::Address);
    assert!(resolved.in_region);
    assert_eq!(resolved.coord, EXPO);
}

#[then("the reloaded plan shows the bus edge as resolved")]
fn reloaded_edge_resolved(#[from(world)] cell: &WorldCell) {
    with_world(cell, |world| {
        let plan = world
            .plans()
            .load_plan(world.plan.expect("plan stored"))
            .expect("reload plan");
        let edges = plan.edges();
        assert_eq!(edges.len(), 1);
        let (_, edge) = edges.first().expect("one edge");
        assert_eq!(edge.mode(), Some(TransportMode::Bus));
        assert_eq!(edge.display(), EdgeDisplay::Ready);
        assert_eq!(edge.summary().map(|summary| summary.duration.as_secs()), Some(25 * 60));
    });
}

// --- Scenario registrations ---

macro_rules! register_scenario {
    ($fn_name:ident, $title:literal) => {
        #[scenario(path = "tests/features/route_resolution.feature", name = $title)]
        fn $fn_name(world: WorldCell, answers: AnswersCell) {
            let _ = (world, answers);
        }
    };
}

register_scenario!(
    repeat_query_hits_cache,
    "repeating a transit query is served from the route cache"
);
register_scenario!(
    no_route_is_cached,
    "a transit query without itineraries is cached as no route"
);
register_scenario!(
    out_of_region_is_cached,
    "an out-of-region match is cached and flagged"
);
register_scenario!(
    unspaced_number_is_split,
    "a Hangul word glued to a building number is split before searching"
);
register_scenario!(
    refreshed_plan_survives_reload,
    "a refreshed plan keeps its routes after a reload"
);

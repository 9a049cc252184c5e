//! Stub engine wiring and temporary files shared by the CLI tests.

use std::{fs, sync::Arc};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDate;
use geo::Coord;
use tempfile::TempDir;
use tourlane_core::{
    DayId, NewPlace, Plan, PlanId, TransportMode, UserId,
    test_support::{StubDirections, StubGeocoder, StubTransit},
};
use tourlane_data::Database;

use crate::{
    CliError,
    config::EngineConfig,
    engine::{Engine, EngineBuilder},
};

pub(super) const STATION: Coord<f64> = Coord { x: 127.434, y: 36.332 };
pub(super) const EXPO: Coord<f64> = Coord { x: 127.387, y: 36.376 };
pub(super) const STUB_GATEWAY: &str = "http://gateway.invalid";

/// Builds an engine over stub vendors and an in-memory database.
pub(super) struct StubEngineBuilder {
    pub(super) geocoder: Arc<StubGeocoder>,
    pub(super) transit: Arc<StubTransit>,
    pub(super) database: Database,
}

impl StubEngineBuilder {
    pub(super) fn new(geocoder: StubGeocoder, transit: StubTransit) -> Self {
        Self {
            geocoder: Arc::new(geocoder),
            transit: Arc::new(transit),
            database: Database::open_in_memory().expect("open database"),
        }
    }
}

impl EngineBuilder for StubEngineBuilder {
    fn build(&self, config: &EngineConfig) -> Result<Engine, CliError> {
        Ok(Engine::assemble(
            self.database.clone(),
            config,
            self.geocoder.clone(),
            Arc::new(StubDirections::default()),
            self.transit.clone(),
        ))
    }
}

/// Temporary directory addressed through UTF-8 paths.
pub(super) fn utf8_tempdir() -> (TempDir, Utf8PathBuf) {
    let tmp = TempDir::new().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf-8 workspace");
    (tmp, root)
}

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    fs::write(path.as_std_path(), contents).expect("write file");
}

/// One-day plan from Daejeon Station to Expo Park travelled by bus.
pub(super) fn bus_plan() -> Plan {
    let day = NaiveDate::from_ymd_opt(2026, 5, 1).expect("valid date");
    let mut plan = Plan::new(PlanId(1), UserId(1), "대전 하루", day, day).expect("plan");
    plan.set_default_mode(Some(TransportMode::Bus));
    for (name, coord) in [("대전역", STATION), ("엑스포과학공원", EXPO)] {
        plan.add_place(DayId(1), NewPlace::new(name, "").with_coord(coord), None)
            .expect("add place");
    }
    plan
}

pub(super) fn write_plan(path: &Utf8Path, plan: &Plan) {
    let payload = serde_json::to_vec_pretty(plan).expect("serialise plan");
    write_utf8(path, &payload);
}

pub(super) fn read_json(bytes: &[u8]) -> serde_json::Value {
    serde_json::from_slice(bytes).expect("output should be JSON")
}

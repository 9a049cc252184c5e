//! Behaviour-driven step definitions driving the refresh CLI scenarios.

use std::cell::RefCell;

use camino::Utf8PathBuf;
use clap::Parser;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;
use tourlane_core::{
    EdgeDisplay, TransportMode,
    test_support::{StubGeocoder, StubTransit},
};

use super::helpers::{
    STUB_GATEWAY, StubEngineBuilder, bus_plan, read_json, utf8_tempdir, write_plan, write_utf8,
};
use super::*;
use crate::refresh::{load_plan, run_refresh_with};

struct RefreshWorld {
    _tmp: TempDir,
    plan_path: Utf8PathBuf,
    output_path: Utf8PathBuf,
    include_plan: RefCell<bool>,
    cli_args: RefCell<Vec<String>>,
    stdout: RefCell<Vec<u8>>,
    result: RefCell<Option<Result<(), CliError>>>,
}

impl RefreshWorld {
    fn new() -> Self {
        let (tmp, root) = utf8_tempdir();
        Self {
            _tmp: tmp,
            plan_path: root.join("plan.json"),
            output_path: root.join("refreshed.json"),
            include_plan: RefCell::new(true),
            cli_args: RefCell::new(Vec::new()),
            stdout: RefCell::new(Vec::new()),
            result: RefCell::new(None),
        }
    }

    fn build_command_line(&self) -> Vec<String> {
        let mut argv = vec!["tourlane".to_owned(), "refresh".to_owned()];
        if *self.include_plan.borrow() {
            argv.push(self.plan_path.as_str().to_owned());
        }
        argv.extend([format!("--{ARG_GATEWAY_URL}"), STUB_GATEWAY.to_owned()]);
        argv.extend(self.cli_args.borrow().iter().cloned());
        argv
    }

    fn error(&self) -> std::cell::Ref<'_, CliError> {
        std::cell::Ref::map(self.result.borrow(), |result| {
            result
                .as_ref()
                .expect("result recorded")
                .as_ref()
                .expect_err("expected error")
        })
    }

    fn assert_ready_bus_route(path: &Utf8PathBuf) {
        let plan = load_plan(path).expect("refreshed plan should load");
        let edges = plan.edges();
        assert_eq!(edges.len(), 1);
        let (_, edge) = edges[0];
        assert_eq!(edge.mode(), Some(TransportMode::Bus));
        assert_eq!(edge.display(), EdgeDisplay::Ready);
        let summary = edge.summary().expect("resolved summary");
        assert_eq!(summary.duration.as_secs(), 25 * 60);
    }
}

#[fixture]
fn world() -> RefreshWorld {
    RefreshWorld::new()
}

#[given("a plan file with two stops connected by bus")]
fn plan_file_exists(#[from(world)] world: &RefreshWorld) {
    write_plan(&world.plan_path, &bus_plan());
}

#[given("the plan file contains invalid JSON")]
fn plan_file_invalid(#[from(world)] world: &RefreshWorld) {
    write_utf8(&world.plan_path, b"{ not valid json");
}

#[given("I omit the plan path")]
fn omit_plan_path(#[from(world)] world: &RefreshWorld) {
    *world.include_plan.borrow_mut() = false;
}

#[when("I run the refresh command with an output path")]
fn run_refresh_with_output(#[from(world)] world: &RefreshWorld) {
    world
        .cli_args
        .borrow_mut()
        .extend(["--output".to_owned(), world.output_path.as_str().to_owned()]);
    execute(world);
}

#[when("I run the refresh command")]
fn run_refresh_command(#[from(world)] world: &RefreshWorld) {
    execute(world);
}

fn execute(world: &RefreshWorld) {
    let invocation = world.build_command_line();
    let parsed = Cli::try_parse_from(invocation).map_err(CliError::from);
    let outcome = parsed.and_then(|cli| match cli.command {
        Command::Refresh(args) => {
            let builder = StubEngineBuilder::new(
                StubGeocoder::default(),
                StubTransit::with_options(&[25, 40]),
            );
            let mut buffer = world.stdout.borrow_mut();
            run_refresh_with(args, &builder, &mut *buffer)
        }
        other => panic!("expected refresh command, found {other:?}"),
    });
    world.result.replace(Some(outcome));
}

#[then("the command reports 1 applied edge")]
fn reports_one_applied(#[from(world)] world: &RefreshWorld) {
    let borrowed = world.result.borrow();
    borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect("expected success");
    let report = read_json(&world.stdout.borrow());
    assert_eq!(report["applied"], 1);
    assert_eq!(report["stale"], 0);
    assert_eq!(report["failed"], 0);
}

#[then("the written plan shows a ready 25 minute bus route")]
fn output_plan_is_ready(#[from(world)] world: &RefreshWorld) {
    RefreshWorld::assert_ready_bus_route(&world.output_path);
    let untouched = load_plan(&world.plan_path).expect("input plan");
    assert_eq!(untouched.edges()[0].1.display(), EdgeDisplay::Loading);
}

#[then("the input plan shows a ready 25 minute bus route")]
fn input_plan_is_ready(#[from(world)] world: &RefreshWorld) {
    RefreshWorld::assert_ready_bus_route(&world.plan_path);
}

#[then("the command fails because the plan JSON is invalid")]
fn fails_on_invalid_json(#[from(world)] world: &RefreshWorld) {
    match &*world.error() {
        CliError::ParsePlan { path, .. } => assert_eq!(*path, world.plan_path),
        other => panic!("expected ParsePlan, found {other:?}"),
    }
}

#[then("the command fails because the plan path is missing")]
fn fails_on_missing_path(#[from(world)] world: &RefreshWorld) {
    match &*world.error() {
        CliError::MissingArgument { field, env } => {
            assert_eq!(*field, ARG_REFRESH_PLAN);
            assert_eq!(*env, ENV_REFRESH_PLAN);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

macro_rules! register_refresh_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/refresh_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: RefreshWorld) {
            let _ = world;
        }
    };
}

register_refresh_scenario!(refresh_with_output, "refreshing a plan resolves its bus edge");
register_refresh_scenario!(
    refresh_in_place,
    "refreshing without an output path rewrites the plan in place"
);
register_refresh_scenario!(refresh_invalid_json, "rejecting invalid plan JSON");
register_refresh_scenario!(refresh_missing_plan, "rejecting a missing plan path");

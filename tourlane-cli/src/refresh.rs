//! `refresh` command: resolve every pending edge of a plan file.

use std::{io::BufReader, io::Write, time::Duration};

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tourlane_core::Plan;
use tourlane_data::{ItineraryPlanner, RefreshReport};

use crate::{
    ARG_DATABASE, ARG_GATEWAY_URL, ARG_REFRESH_PLAN, ARG_REGION_BBOX, ARG_REGION_TOKEN,
    ARG_TIMEOUT_SECS, CliError, ENV_REFRESH_GATEWAY_URL, ENV_REFRESH_PLAN,
    config::{EngineConfig, EngineSettings},
    engine::{DefaultEngineBuilder, EngineBuilder, block_on},
    fs::{open_utf8_file, write_utf8_file},
    write_json,
};

/// CLI arguments for the `refresh` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "refresh",
    long_about = "Load a JSON-encoded plan, resolve every edge that has a mode \
                 but no route yet, and write the plan back. The plan goes to \
                 --output when given and replaces the input file otherwise; a \
                 JSON report of applied, stale and failed edges is printed.",
    about = "Resolve every pending edge of a plan file"
)]
#[ortho_config(prefix = "TOURLANE")]
pub(crate) struct RefreshArgs {
    /// Path to a JSON file containing a plan.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) plan: Option<Utf8PathBuf>,
    /// Where to write the refreshed plan.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// Per-edge resolution timeout in seconds.
    #[arg(long, value_name = "secs")]
    #[serde(default)]
    pub(crate) edge_timeout_secs: Option<u64>,
    /// Base URL of the vendor gateway.
    #[arg(long = ARG_GATEWAY_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) gateway_url: Option<String>,
    /// Gateway request timeout in seconds.
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    /// SQLite database holding the caches.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Token naming the service region in queries.
    #[arg(long = ARG_REGION_TOKEN, value_name = "token")]
    #[serde(default)]
    pub(crate) region_token: Option<String>,
    /// Service region as `min_lng,min_lat,max_lng,max_lat`.
    #[arg(long = ARG_REGION_BBOX, value_name = "bbox")]
    #[serde(default)]
    pub(crate) region_bbox: Option<String>,
}

/// Resolved `refresh` invocation.
#[derive(Debug, Clone)]
pub(crate) struct RefreshRequest {
    pub(crate) plan: Utf8PathBuf,
    pub(crate) output: Utf8PathBuf,
    pub(crate) edge_timeout: Option<Duration>,
}

impl RefreshArgs {
    fn into_parts(self) -> Result<(RefreshRequest, EngineConfig), CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        let plan = merged.plan.ok_or(CliError::MissingArgument {
            field: ARG_REFRESH_PLAN,
            env: ENV_REFRESH_PLAN,
        })?;
        let request = RefreshRequest {
            output: merged.output.unwrap_or_else(|| plan.clone()),
            plan,
            edge_timeout: merged.edge_timeout_secs.map(Duration::from_secs),
        };
        let settings = EngineSettings {
            gateway_url: merged.gateway_url,
            timeout_secs: merged.timeout_secs,
            database: merged.database,
            region_token: merged.region_token,
            region_bbox: merged.region_bbox,
        };
        let config = EngineConfig::resolve(settings, ENV_REFRESH_GATEWAY_URL)?;
        Ok((request, config))
    }
}

/// JSON written by `refresh`.
#[derive(Debug, Serialize)]
pub(crate) struct RefreshOutput {
    pub(crate) plan: Utf8PathBuf,
    pub(crate) applied: usize,
    pub(crate) stale: usize,
    pub(crate) failed: usize,
}

pub(crate) fn run_refresh(args: RefreshArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_refresh_with(args, &DefaultEngineBuilder, &mut stdout)
}

pub(crate) fn run_refresh_with(
    args: RefreshArgs,
    builder: &dyn EngineBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let (request, config) = args.into_parts()?;
    let mut plan = load_plan(&request.plan)?;
    let engine = builder.build(&config)?;

    let mut planner = ItineraryPlanner::new(engine.routes);
    if let Some(timeout) = request.edge_timeout {
        planner = planner.with_edge_timeout(timeout);
    }
    let report: RefreshReport = block_on(planner.refresh(&mut plan))?;
    info!(
        "plan {}: {} edges applied, {} stale, {} failed",
        plan.id(),
        report.applied,
        report.stale,
        report.failed
    );

    save_plan(&request.output, &plan)?;
    write_json(
        writer,
        &RefreshOutput {
            plan: request.output,
            applied: report.applied,
            stale: report.stale,
            failed: report.failed,
        },
    )
}

/// Load a JSON-encoded [`Plan`] and repair its numbering and dates.
pub(crate) fn load_plan(path: &Utf8Path) -> Result<Plan, CliError> {
    let file = open_utf8_file(path).map_err(|source| CliError::OpenPlan {
        path: path.to_path_buf(),
        source,
    })?;
    let plan: Plan =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| CliError::ParsePlan {
            path: path.to_path_buf(),
            source,
        })?;
    plan.normalised().map_err(|source| CliError::InvalidPlan {
        path: path.to_path_buf(),
        source,
    })
}

fn save_plan(path: &Utf8Path, plan: &Plan) -> Result<(), CliError> {
    let mut payload = serde_json::to_vec_pretty(plan).map_err(CliError::SerialiseOutput)?;
    payload.push(b'\n');
    write_utf8_file(path, &payload).map_err(|source| CliError::WriteFile {
        path: path.to_path_buf(),
        source,
    })
}

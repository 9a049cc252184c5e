//! Command-line interface for the Tourlane engine.
//!
//! Each subcommand layers its options from CLI flags, environment variables
//! and configuration files, builds the engine against the configured gateway
//! and SQLite database, and writes JSON or line-oriented output to stdout.
#![forbid(unsafe_code)]

use std::io::Write;

use clap::{Parser, Subcommand};
use serde::Serialize;

mod config;
mod engine;
mod error;
mod follow;
mod fs;
mod geocode;
mod refresh;
mod route;

pub use error::CliError;

use follow::{FollowArgs, run_follow};
use geocode::{GeocodeArgs, run_geocode};
use refresh::{RefreshArgs, run_refresh};
use route::{RouteArgs, run_route};

pub(crate) const ARG_GATEWAY_URL: &str = "gateway-url";
pub(crate) const ARG_TIMEOUT_SECS: &str = "timeout-secs";
pub(crate) const ARG_DATABASE: &str = "database";
pub(crate) const ARG_REGION_TOKEN: &str = "region-token";
pub(crate) const ARG_REGION_BBOX: &str = "region-bbox";
pub(crate) const ARG_POLL_INTERVAL_SECS: &str = "poll-interval-secs";
pub(crate) const ARG_REFRESH_PLAN: &str = "plan";
pub(crate) const ARG_FOLLOW_PLAN_ID: &str = "plan-id";
pub(crate) const ENV_GEOCODE_GATEWAY_URL: &str = "TOURLANE_CMDS_GEOCODE_GATEWAY_URL";
pub(crate) const ENV_ROUTE_GATEWAY_URL: &str = "TOURLANE_CMDS_ROUTE_GATEWAY_URL";
pub(crate) const ENV_REFRESH_GATEWAY_URL: &str = "TOURLANE_CMDS_REFRESH_GATEWAY_URL";
pub(crate) const ENV_REFRESH_PLAN: &str = "TOURLANE_CMDS_REFRESH_PLAN";
pub(crate) const ENV_FOLLOW_PLAN_ID: &str = "TOURLANE_CMDS_FOLLOW_PLAN_ID";

/// Run the Tourlane CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns a [`CliError`] when parsing, configuration or the command fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Geocode(args) => run_geocode(args),
        Command::Route(args) => run_route(args),
        Command::Refresh(args) => run_refresh(args),
        Command::Follow(args) => run_follow(args),
    }
}

/// Write `value` as pretty JSON followed by a newline.
pub(crate) fn write_json<T: Serialize>(writer: &mut dyn Write, value: &T) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerialiseOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[derive(Debug, Parser)]
#[command(
    name = "tourlane",
    about = "Route resolution and plan tooling for the Tourlane engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve a free-text place query to a coordinate.
    Geocode(GeocodeArgs),
    /// Resolve a route between two place queries.
    Route(RouteArgs),
    /// Resolve every pending edge of a plan file.
    Refresh(RefreshArgs),
    /// Follow a stored plan and print each update.
    Follow(FollowArgs),
}

#[cfg(test)]
mod tests;

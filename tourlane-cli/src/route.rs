//! `route` command: resolve a route between two place queries.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use geo::Coord;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tourlane_core::{RouteError, RouteOutcome, Side, TransportMode, Waypoint};
use tourlane_data::ResolvedRoute;

use crate::{
    ARG_DATABASE, ARG_GATEWAY_URL, ARG_REGION_BBOX, ARG_REGION_TOKEN, ARG_TIMEOUT_SECS, CliError,
    ENV_ROUTE_GATEWAY_URL,
    config::{EngineConfig, EngineSettings},
    engine::{DefaultEngineBuilder, EngineBuilder, block_on},
    write_json,
};

/// CLI arguments for the `route` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "route",
    long_about = "Geocode both endpoints and resolve a route between them. When \
                 exactly one endpoint cannot be located and a place name was \
                 given for it, only that side is retried with the name.",
    about = "Resolve a route between two place queries"
)]
#[ortho_config(prefix = "TOURLANE")]
pub(crate) struct RouteArgs {
    /// Address or name of the starting point.
    #[arg(long, value_name = "query")]
    #[serde(default)]
    pub(crate) from: String,
    /// Address or name of the destination.
    #[arg(long, value_name = "query")]
    #[serde(default)]
    pub(crate) to: String,
    /// Place name to retry the starting point with.
    #[arg(long, value_name = "name")]
    #[serde(default)]
    pub(crate) from_name: Option<String>,
    /// Place name to retry the destination with.
    #[arg(long, value_name = "name")]
    #[serde(default)]
    pub(crate) to_name: Option<String>,
    /// Transport mode (car, taxi, bus, subway, walk, bicycle).
    #[arg(long, value_name = "mode")]
    #[serde(default)]
    pub(crate) mode: Option<TransportMode>,
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

/// Resolved `route` invocation.
#[derive(Debug, Clone)]
pub(crate) struct RouteRequest {
    pub(crate) origin: Waypoint,
    pub(crate) destination: Waypoint,
    pub(crate) mode: TransportMode,
}

impl RouteArgs {
    fn into_parts(self) -> Result<(RouteRequest, EngineConfig), CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        let request = RouteRequest {
            origin: waypoint(merged.from, merged.from_name),
            destination: waypoint(merged.to, merged.to_name),
            mode: merged.mode.unwrap_or(TransportMode::Car),
        };
        let settings = EngineSettings {
            gateway_url: merged.gateway_url,
            timeout_secs: merged.timeout_secs,
            database: merged.database,
            region_token: merged.region_token,
            region_bbox: merged.region_bbox,
        };
        let config = EngineConfig::resolve(settings, ENV_ROUTE_GATEWAY_URL)?;
        Ok((request, config))
    }
}

fn waypoint(query: String, name: Option<String>) -> Waypoint {
    Waypoint {
        label: name.unwrap_or_else(|| query.clone()),
        address: query,
        coord: None,
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Point {
    pub(crate) lng: f64,
    pub(crate) lat: f64,
}

impl From<Coord<f64>> for Point {
    fn from(coord: Coord<f64>) -> Self {
        Self {
            lng: coord.x,
            lat: coord.y,
        }
    }
}

/// JSON written by `route`.
#[derive(Debug, Serialize)]
pub(crate) struct RouteOutput {
    pub(crate) mode: TransportMode,
    pub(crate) origin: Point,
    pub(crate) destination: Point,
    /// Side re-geocoded with its place name, if any.
    pub(crate) retried: Option<Side>,
    pub(crate) outcome: RouteOutcome,
}

pub(crate) fn run_route(args: RouteArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_route_with(args, &DefaultEngineBuilder, &mut stdout)
}

pub(crate) fn run_route_with(
    args: RouteArgs,
    builder: &dyn EngineBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let (request, config) = args.into_parts()?;
    let engine = builder.build(&config)?;
    let routes = engine.routes;
    let RouteRequest {
        origin,
        destination,
        mode,
    } = request;

    let (resolved, retried) = block_on(async {
        match routes.resolve_between(&origin, &destination, mode).await {
            Err(RouteError::PartialFailure {
                failed, resolved, ..
            }) => {
                info!("retrying the {failed:?} side by name");
                let route = routes
                    .retry_side(&origin, &destination, mode, failed, resolved)
                    .await?;
                Ok::<_, RouteError>((route, Some(failed)))
            }
            other => Ok((other?, None)),
        }
    })??;

    let ResolvedRoute {
        outcome,
        origin: from,
        destination: to,
    } = resolved;
    write_json(
        writer,
        &RouteOutput {
            mode,
            origin: from.into(),
            destination: to.into(),
            retried,
            outcome,
        },
    )
}

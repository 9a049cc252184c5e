//! `geocode` command: resolve a free-text query to a coordinate.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tourlane_core::{MatchSource, ResolvedCoordinate};
use tourlane_data::normalise_query;

use crate::{
    ARG_DATABASE, ARG_GATEWAY_URL, ARG_REGION_BBOX, ARG_REGION_TOKEN, ARG_TIMEOUT_SECS, CliError,
    ENV_GEOCODE_GATEWAY_URL,
    config::{EngineConfig, EngineSettings},
    engine::{DefaultEngineBuilder, EngineBuilder, block_on},
    write_json,
};

/// CLI arguments for the `geocode` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "geocode",
    long_about = "Resolve a place name or street address through the coordinate \
                 cache, the address search and the ranked keyword search, in \
                 that order. Results outside the service region are flagged.",
    about = "Resolve a free-text query to a coordinate"
)]
#[ortho_config(prefix = "TOURLANE")]
pub(crate) struct GeocodeArgs {
    /// Place name or street address.
    #[arg(value_name = "query")]
    #[serde(default)]
    pub(crate) query: String,
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

impl GeocodeArgs {
    fn into_parts(self) -> Result<(String, EngineConfig), CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        let settings = EngineSettings {
            gateway_url: merged.gateway_url,
            timeout_secs: merged.timeout_secs,
            database: merged.database,
            region_token: merged.region_token,
            region_bbox: merged.region_bbox,
        };
        let config = EngineConfig::resolve(settings, ENV_GEOCODE_GATEWAY_URL)?;
        Ok((merged.query, config))
    }
}

/// JSON written by `geocode`.
#[derive(Debug, Serialize)]
pub(crate) struct GeocodeOutput {
    pub(crate) query: String,
    pub(crate) normalised: String,
    pub(crate) name: String,
    pub(crate) lng: f64,
    pub(crate) lat: f64,
    pub(crate) in_region: bool,
    pub(crate) source: MatchSource,
}

impl GeocodeOutput {
    fn new(query: String, found: ResolvedCoordinate) -> Self {
        Self {
            normalised: normalise_query(&query),
            query,
            name: found.name,
            lng: found.coord.x,
            lat: found.coord.y,
            in_region: found.in_region,
            source: found.source,
        }
    }
}

pub(crate) fn run_geocode(args: GeocodeArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_geocode_with(args, &DefaultEngineBuilder, &mut stdout)
}

pub(crate) fn run_geocode_with(
    args: GeocodeArgs,
    builder: &dyn EngineBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let (query, config) = args.into_parts()?;
    let engine = builder.build(&config)?;
    let found = block_on(engine.coordinates.resolve(&query))??;
    if !found.in_region {
        info!("`{query}` resolved outside the service region to {}", found.name);
    }
    write_json(writer, &GeocodeOutput::new(query, found))
}

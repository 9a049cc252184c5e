//! Error types emitted by the Tourlane CLI.

use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;
use tourlane_core::{GeocodeError, ItineraryError, RouteError};
use tourlane_data::{GatewayBuildError, StoreError};
use tourlane_sync::SyncError;

/// Errors emitted by the Tourlane CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name.
        field: &'static str,
        /// Environment variable that can supply it.
        env: &'static str,
    },
    /// The service region bounding box could not be parsed.
    #[error("invalid region bounding box {value:?}: {reason}")]
    InvalidRegion {
        /// Rejected value.
        value: String,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// The async runtime could not be started.
    #[error("failed to start the async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Constructing the gateway client failed.
    #[error("failed to build gateway client for {base_url:?}: {source}")]
    BuildGateway {
        /// Configured base URL.
        base_url: String,
        /// Underlying failure.
        #[source]
        source: GatewayBuildError,
    },
    /// Opening or querying the database failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Geocoding failed.
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
    /// Route resolution failed.
    #[error(transparent)]
    Route(#[from] RouteError),
    /// Following a plan failed.
    #[error(transparent)]
    Sync(#[from] SyncError),
    /// Opening the plan file failed.
    #[error("failed to open plan at {path:?}: {source}")]
    OpenPlan {
        /// Plan file path.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// Plan JSON could not be decoded.
    #[error("failed to parse plan JSON at {path:?}: {source}")]
    ParsePlan {
        /// Plan file path.
        path: Utf8PathBuf,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// The decoded plan is structurally invalid.
    #[error("plan in {path:?} is invalid: {source}")]
    InvalidPlan {
        /// Plan file path.
        path: Utf8PathBuf,
        /// Validation failure.
        #[source]
        source: ItineraryError,
    },
    /// Serialising command output failed.
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing to the output file failed.
    #[error("failed to write {path:?}: {source}")]
    WriteFile {
        /// Output path.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// Writing to stdout failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}

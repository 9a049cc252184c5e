//! Resolved engine configuration shared by the subcommands.

use std::time::Duration;

use camino::Utf8PathBuf;
use geo::{Coord, Rect};
use tourlane_core::ServiceRegion;
use tourlane_data::GatewayConfig;

use crate::{ARG_GATEWAY_URL, CliError};

/// Database used when no path is configured.
pub(crate) const DEFAULT_DATABASE: &str = "tourlane.db";
/// Gateway request timeout used when none is configured.
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Engine options after configuration layering, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct EngineSettings {
    pub(crate) gateway_url: Option<String>,
    pub(crate) timeout_secs: Option<u64>,
    pub(crate) database: Option<Utf8PathBuf>,
    pub(crate) region_token: Option<String>,
    pub(crate) region_bbox: Option<String>,
}

/// Everything needed to build an [`crate::engine::Engine`].
#[derive(Debug, Clone)]
pub(crate) struct EngineConfig {
    pub(crate) gateway: GatewayConfig,
    pub(crate) database: Utf8PathBuf,
    pub(crate) region: ServiceRegion,
}

impl EngineConfig {
    /// Validate `settings`; `env` names the variable that can supply the
    /// gateway URL for the calling subcommand.
    pub(crate) fn resolve(settings: EngineSettings, env: &'static str) -> Result<Self, CliError> {
        let base_url = settings.gateway_url.ok_or(CliError::MissingArgument {
            field: ARG_GATEWAY_URL,
            env,
        })?;
        let timeout = Duration::from_secs(settings.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let database = settings
            .database
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE));
        let region = resolve_region(settings.region_token, settings.region_bbox.as_deref())?;
        Ok(Self {
            gateway: GatewayConfig::new(base_url).with_timeout(timeout),
            database,
            region,
        })
    }
}

/// Combine an optional token and bounding box with the default region.
pub(crate) fn resolve_region(
    token: Option<String>,
    bbox: Option<&str>,
) -> Result<ServiceRegion, CliError> {
    let fallback = ServiceRegion::default();
    let bounds = match bbox {
        Some(value) => parse_bbox(value)?,
        None => *fallback.bounds(),
    };
    let token = token.unwrap_or_else(|| fallback.canonical_token().to_owned());
    Ok(ServiceRegion::new(bounds, token))
}

/// Parse `min_lng,min_lat,max_lng,max_lat`.
pub(crate) fn parse_bbox(value: &str) -> Result<Rect<f64>, CliError> {
    let invalid = |reason| CliError::InvalidRegion {
        value: value.to_owned(),
        reason,
    };
    let numbers = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid("expected four comma-separated numbers"))?;
    let &[min_lng, min_lat, max_lng, max_lat] = numbers.as_slice() else {
        return Err(invalid("expected four comma-separated numbers"));
    };
    if !numbers.iter().all(|n| n.is_finite()) {
        return Err(invalid("coordinates must be finite"));
    }
    if min_lng >= max_lng || min_lat >= max_lat {
        return Err(invalid("minimum corner must lie south-west of the maximum"));
    }
    Ok(Rect::new(
        Coord { x: min_lng, y: min_lat },
        Coord { x: max_lng, y: max_lat },
    ))
}

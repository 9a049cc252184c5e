//! Geocoding seam: vendor search endpoints, the coordinate cache and the
//! resolver's result type.

use async_trait::async_trait;
use geo::Coord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CacheError, VendorError};

/// One search hit from the geocoding vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeDocument {
    /// Place or address name reported by the vendor.
    pub name: String,
    /// Location of the hit.
    pub coord: Coord<f64>,
}

/// Structured address and free-text keyword search.
#[async_trait]
pub trait GeocodingService: Send + Sync {
    /// Search by structured street address.
    async fn search_address(&self, query: &str) -> Result<Vec<GeocodeDocument>, VendorError>;
    /// Search by free-text keyword.
    async fn search_keyword(&self, query: &str) -> Result<Vec<GeocodeDocument>, VendorError>;
}

/// Which cascade stage produced a coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    /// Served from the coordinate cache.
    Cache,
    /// Structured address search.
    Address,
    /// Ranked keyword search.
    Keyword,
    /// Best keyword hit outside the service region.
    OutOfRegion,
}

/// A coordinate produced by the resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCoordinate {
    /// Resolved location.
    pub coord: Coord<f64>,
    /// Name of the matched document.
    pub name: String,
    /// Whether the location lies inside the service region.
    pub in_region: bool,
    /// Stage that produced the match.
    pub source: MatchSource,
}

/// A cached coordinate with its creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedCoordinate {
    /// Resolved location.
    pub coord: Coord<f64>,
    /// Name of the matched document.
    pub name: String,
    /// Whether the location lies inside the service region.
    pub in_region: bool,
    /// Seconds since the Unix epoch when the entry was written.
    pub created_at: u64,
}

impl From<CachedCoordinate> for ResolvedCoordinate {
    fn from(cached: CachedCoordinate) -> Self {
        Self {
            coord: cached.coord,
            name: cached.name,
            in_region: cached.in_region,
            source: MatchSource::Cache,
        }
    }
}

/// Persistent store of resolved coordinates keyed by normalised query.
pub trait CoordinateCache: Send + Sync {
    /// Look up a normalised query.
    fn get(&self, query: &str) -> Result<Option<CachedCoordinate>, CacheError>;
    /// Store a resolution for a normalised query.
    fn put(&self, query: &str, resolved: &ResolvedCoordinate) -> Result<(), CacheError>;
}

/// Errors returned by coordinate resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodeError {
    /// Every cascade stage came back empty.
    #[error("no location found for `{query}`")]
    NotFound {
        /// The original query.
        query: String,
    },
    /// A vendor call failed; the cascade was aborted and nothing was cached.
    #[error(transparent)]
    Vendor(#[from] VendorError),
}

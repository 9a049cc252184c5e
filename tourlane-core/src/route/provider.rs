//! Vendor traits and cache seam for route resolution.

use async_trait::async_trait;
use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::{CacheError, CoordKey, TransportMode};

use super::{RouteOutcome, error::VendorError};

/// Driving directions for car and taxi edges.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use geo::Coord;
/// use std::time::Duration;
/// use tourlane_core::{
///     DirectionsService, DrivingRoute, RouteOutcome, RouteSummary, TransportMode, VendorError,
/// };
///
/// struct Straight;
///
/// #[async_trait]
/// impl DirectionsService for Straight {
///     async fn driving_route(
///         &self,
///         origin: Coord<f64>,
///         destination: Coord<f64>,
///         _mode: TransportMode,
///     ) -> Result<RouteOutcome, VendorError> {
///         Ok(RouteOutcome::Driving(DrivingRoute {
///             summary: RouteSummary {
///                 duration: Duration::from_secs(60),
///                 distance_m: 500,
///                 fare: None,
///             },
///             path: vec![origin, destination],
///         }))
///     }
/// }
/// ```
#[async_trait]
pub trait DirectionsService: Send + Sync {
    /// Fetch a driving route. `mode` is [`TransportMode::Car`] or
    /// [`TransportMode::Taxi`] and only affects the reported fare.
    async fn driving_route(
        &self,
        origin: Coord<f64>,
        destination: Coord<f64>,
        mode: TransportMode,
    ) -> Result<RouteOutcome, VendorError>;
}

/// Public transport itineraries for bus and subway edges.
#[async_trait]
pub trait TransitService: Send + Sync {
    /// Fetch ranked itineraries restricted to `mode`.
    ///
    /// Implementations return [`RouteOutcome::NoRoute`] when the vendor finds
    /// no itinerary for the mode.
    async fn transit_routes(
        &self,
        origin: Coord<f64>,
        destination: Coord<f64>,
        mode: TransportMode,
    ) -> Result<RouteOutcome, VendorError>;
}

/// Cache key for a resolved route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteKey {
    /// Rounded origin.
    pub origin: CoordKey,
    /// Rounded destination.
    pub destination: CoordKey,
    /// Transport mode.
    pub mode: TransportMode,
}

impl RouteKey {
    /// Build a key from raw coordinates.
    #[must_use]
    pub fn new(origin: Coord<f64>, destination: Coord<f64>, mode: TransportMode) -> Self {
        Self {
            origin: CoordKey::from_coord(origin),
            destination: CoordKey::from_coord(destination),
            mode,
        }
    }
}

/// A cached route with its creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRoute {
    /// The stored outcome, including `NoRoute` answers.
    pub outcome: RouteOutcome,
    /// Seconds since the Unix epoch when the entry was written.
    pub created_at: u64,
}

impl CachedRoute {
    /// Whether the entry holds a local estimate rather than vendor data.
    #[must_use]
    pub const fn is_estimate(&self) -> bool {
        self.outcome.is_estimate()
    }
}

/// Persistent key-value store for route outcomes.
///
/// Entries never expire and are never updated in place; concurrent writes
/// for the same key carry the same value, so last-write-wins is acceptable.
pub trait RouteCache: Send + Sync {
    /// Look up a cached outcome.
    fn get(&self, key: &RouteKey) -> Result<Option<CachedRoute>, CacheError>;
    /// Store an outcome.
    fn put(&self, key: &RouteKey, outcome: &RouteOutcome) -> Result<(), CacheError>;
}

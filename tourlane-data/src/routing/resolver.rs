//! Mode dispatch, route caching and waypoint geocoding.

use std::sync::Arc;

use futures_util::future;
use geo::Coord;
use log::{debug, warn};
use tourlane_core::{
    DirectionsService, GeocodeError, RouteCache, RouteError, RouteKey, RouteOutcome, Side,
    TransitService, TransportMode, Waypoint,
};

use crate::{CoordinateResolver, store::off_runtime};

/// A route together with the coordinates it was computed between.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRoute {
    /// Route outcome.
    pub outcome: RouteOutcome,
    /// Origin coordinate used.
    pub origin: Coord<f64>,
    /// Destination coordinate used.
    pub destination: Coord<f64>,
}

/// Resolves routes between coordinates or waypoints.
///
/// Car and taxi go to the directions vendor, bus and subway to the transit
/// vendor, and walking or cycling are estimated locally. Every successful
/// dispatch, `NoRoute` and estimates included, is written to the route cache
/// and served from it afterwards.
#[derive(Clone)]
pub struct RouteResolver {
    directions: Arc<dyn DirectionsService>,
    transit: Arc<dyn TransitService>,
    cache: Arc<dyn RouteCache>,
    coordinates: Arc<CoordinateResolver>,
}

impl std::fmt::Debug for RouteResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteResolver")
            .field("coordinates", &self.coordinates)
            .finish_non_exhaustive()
    }
}

impl RouteResolver {
    /// Create a resolver from its vendors, cache and coordinate resolver.
    #[must_use]
    pub fn new(
        directions: Arc<dyn DirectionsService>,
        transit: Arc<dyn TransitService>,
        cache: Arc<dyn RouteCache>,
        coordinates: Arc<CoordinateResolver>,
    ) -> Self {
        Self {
            directions,
            transit,
            cache,
            coordinates,
        }
    }

    /// The coordinate resolver used for waypoints without coordinates.
    #[must_use]
    pub fn coordinates(&self) -> &CoordinateResolver {
        &self.coordinates
    }

    /// Resolve a route between two coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::Vendor`] when the vendor call fails. A missing
    /// transit route is `Ok(RouteOutcome::NoRoute)`.
    pub async fn resolve(
        &self,
        origin: Coord<f64>,
        destination: Coord<f64>,
        mode: TransportMode,
    ) -> Result<RouteOutcome, RouteError> {
        let key = RouteKey::new(origin, destination, mode);
        let cache = Arc::clone(&self.cache);
        match off_runtime(move || cache.get(&key)).await {
            Ok(Some(hit)) => {
                debug!("route cache hit for {mode} {}→{}", key.origin, key.destination);
                return Ok(hit.outcome);
            }
            Ok(None) => {}
            Err(error) => warn!("route cache read failed: {error}"),
        }

        let outcome = self.dispatch(origin, destination, mode).await?;
        let cache = Arc::clone(&self.cache);
        let stored = outcome.clone();
        if let Err(error) = off_runtime(move || cache.put(&key, &stored)).await {
            warn!("route cache write failed: {error}");
        }
        Ok(outcome)
    }

    async fn dispatch(
        &self,
        origin: Coord<f64>,
        destination: Coord<f64>,
        mode: TransportMode,
    ) -> Result<RouteOutcome, RouteError> {
        if let Some(estimate) = RouteOutcome::estimate(mode, origin, destination) {
            return Ok(estimate);
        }
        let outcome = if mode.is_driving() {
            self.directions
                .driving_route(origin, destination, mode)
                .await?
        } else {
            self.transit
                .transit_routes(origin, destination, mode)
                .await?
        };
        Ok(outcome)
    }

    /// Resolve a route between two waypoints, geocoding whichever lacks a
    /// coordinate. Both sides are geocoded concurrently.
    ///
    /// # Errors
    ///
    /// - [`RouteError::Vendor`] when any vendor call fails.
    /// - [`RouteError::NotFound`] when neither side can be located.
    /// - [`RouteError::PartialFailure`] when exactly one side cannot be
    ///   located; see [`RouteResolver::retry_side`].
    pub async fn resolve_between(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
        mode: TransportMode,
    ) -> Result<ResolvedRoute, RouteError> {
        let (from, to) = future::join(self.locate(origin), self.locate(destination)).await;

        let (origin_coord, destination_coord) = match (from, to) {
            (Ok(from), Ok(to)) => (from, to),
            (Err(GeocodeError::Vendor(error)), _) | (_, Err(GeocodeError::Vendor(error))) => {
                return Err(RouteError::Vendor(error));
            }
            (Err(GeocodeError::NotFound { .. }), Err(GeocodeError::NotFound { .. })) => {
                return Err(RouteError::NotFound {
                    origin: origin.primary_query().to_owned(),
                    destination: destination.primary_query().to_owned(),
                });
            }
            (Err(GeocodeError::NotFound { query }), Ok(resolved)) => {
                return Err(RouteError::PartialFailure {
                    failed: Side::Origin,
                    query,
                    resolved,
                });
            }
            (Ok(resolved), Err(GeocodeError::NotFound { query })) => {
                return Err(RouteError::PartialFailure {
                    failed: Side::Destination,
                    query,
                    resolved,
                });
            }
        };

        self.route(origin_coord, destination_coord, mode).await
    }

    /// Retry after a [`RouteError::PartialFailure`]: re-geocode only the
    /// `failed` side with its relaxed query (the place name instead of the
    /// address) and route against the already `resolved` coordinate.
    ///
    /// # Errors
    ///
    /// Returns the original partial failure when the side has no relaxed
    /// query or it also finds nothing, and [`RouteError::Vendor`] on vendor
    /// failure.
    pub async fn retry_side(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
        mode: TransportMode,
        failed: Side,
        resolved: Coord<f64>,
    ) -> Result<ResolvedRoute, RouteError> {
        let waypoint = match failed {
            Side::Origin => origin,
            Side::Destination => destination,
        };
        let partial = || RouteError::PartialFailure {
            failed,
            query: waypoint.primary_query().to_owned(),
            resolved,
        };
        let Some(relaxed) = waypoint.fallback_query() else {
            return Err(partial());
        };
        debug!("retrying {failed:?} with relaxed query `{relaxed}`");
        let located = match self.coordinates.resolve(relaxed).await {
            Ok(found) => found.coord,
            Err(GeocodeError::NotFound { .. }) => return Err(partial()),
            Err(GeocodeError::Vendor(error)) => return Err(RouteError::Vendor(error)),
        };
        let (origin_coord, destination_coord) = match failed {
            Side::Origin => (located, resolved),
            Side::Destination => (resolved, located),
        };
        self.route(origin_coord, destination_coord, mode).await
    }

    async fn route(
        &self,
        origin: Coord<f64>,
        destination: Coord<f64>,
        mode: TransportMode,
    ) -> Result<ResolvedRoute, RouteError> {
        let outcome = self.resolve(origin, destination, mode).await?;
        Ok(ResolvedRoute {
            outcome,
            origin,
            destination,
        })
    }

    async fn locate(&self, waypoint: &Waypoint) -> Result<Coord<f64>, GeocodeError> {
        if let Some(coord) = waypoint.coord {
            return Ok(coord);
        }
        Ok(self.coordinates.resolve(waypoint.primary_query()).await?.coord)
    }
}

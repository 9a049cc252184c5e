//! Core domain types for the Tourlane itinerary engine.
//!
//! The crate models multi-day trip plans (plan, day, place and the synthetic
//! lodging node), the transport edges connecting consecutive stops, and the
//! service traits used to resolve those edges against upstream vendors.
//!
//! Responsibilities:
//! - Own the itinerary invariants (contiguous order indices and day numbers,
//!   one outgoing edge per non-last place).
//! - Decide which edges become stale after each mutation.
//! - Define the seams (`GeocodingService`, `DirectionsService`,
//!   `TransitService`, caches, metrics) implemented by `tourlane-data`.
//!
//! Boundaries:
//! - No network or database access lives here.

#![forbid(unsafe_code)]

pub mod cache;
pub mod collab;
pub mod coord;
pub mod geocode;
pub mod itinerary;
pub mod metrics;
pub mod mode;
pub mod route;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use cache::{CacheError, MemoryCoordinateCache, MemoryRouteCache};
pub use collab::{
    AccessError, Collaborator, Invite, InviteError, MAX_PARTICIPANTS, Permission, permission_for,
};
pub use coord::{CoordKey, ServiceRegion, haversine_metres};
pub use geocode::{
    CachedCoordinate, CoordinateCache, GeocodeDocument, GeocodeError, GeocodingService,
    MatchSource, ResolvedCoordinate,
};
pub use itinerary::{
    ApplyOutcome, Day, DayId, EdgeDisplay, EdgeKey, EdgeResolution, EdgeState, EdgeTicket,
    Invalidation, ItineraryError, Lodging, NewPlace, Place, PlaceId, Plan, PlanId,
    PublicationState, TransportEdge, UserId, Waypoint,
};
pub use metrics::{
    EndpointStats, InMemoryMetrics, LogMetrics, MetricsSink, NoopMetrics, VendorEndpoint,
};
pub use mode::{ParseTransportModeError, TransportMode};
pub use route::{
    CachedRoute, DirectionsService, DrivingRoute, EstimatedRoute, LegKind, RouteCache, RouteError,
    RouteKey, RouteOutcome, RouteSummary, Side, TransitItinerary, TransitLeg, TransitLine,
    TransitService, VendorError,
};

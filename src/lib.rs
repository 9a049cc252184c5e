//! Facade crate for the Tourlane itinerary routing and synchronisation
//! engine.
//!
//! This crate re-exports the core domain types and exposes the SQLite-backed
//! resolvers and the collaboration synchroniser behind feature flags.

#![forbid(unsafe_code)]

pub use tourlane_core::{
    ApplyOutcome, Day, DayId, EdgeDisplay, EdgeKey, EdgeState, GeocodeError, Invalidation,
    ItineraryError, MatchSource, NewPlace, Permission, Place, PlaceId, Plan, PlanId,
    ResolvedCoordinate, RouteError, RouteOutcome, ServiceRegion, TransportEdge, TransportMode,
    UserId, VendorError, Waypoint,
};

#[cfg(feature = "data")]
pub use tourlane_data::{
    CoordinateResolver, Database, GatewayClient, GatewayConfig, ItineraryPlanner, RefreshReport,
    RouteResolver, SqliteCoordinateCache, SqlitePlanStore, SqliteRouteCache, StoreError,
};

#[cfg(feature = "sync")]
pub use tourlane_sync::{
    BroadcastHub, ChangeFeed, FullReload, PlanSource, ReconcileStrategy, SyncConfig, SyncError,
    SyncSession,
};

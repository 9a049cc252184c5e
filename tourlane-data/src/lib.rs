//! Vendor adapters, resolvers and persistence for the Tourlane engine.
//!
//! Responsibilities:
//! - Talk to the upstream gateway for directions, geocoding and transit.
//! - Resolve free-text queries to coordinates and coordinate pairs to routes,
//!   consulting the caches first.
//! - Resolve the pending edges of a plan concurrently and apply the results.
//! - Persist caches, plans, collaborators and invites in SQLite.
//!
//! Boundaries:
//! - Itinerary rules live in `tourlane-core`; this crate only drives them.
//! - Blocking SQLite calls are short and guarded by a mutex. The resolvers
//!   run every cache read and write on tokio's blocking pool.
//!
//! Invariants:
//! - No global mutable state; metrics go through an injected sink.

#![forbid(unsafe_code)]

pub mod gateway;
pub mod geocode;
pub mod planner;
pub mod routing;
pub mod store;

pub use gateway::{DEFAULT_USER_AGENT, GatewayBuildError, GatewayClient, GatewayConfig};
pub use geocode::{CoordinateResolver, KeywordScoring, normalise_query};
pub use planner::{ItineraryPlanner, RefreshReport};
pub use routing::{ResolvedRoute, RouteResolver};
pub use store::{
    Database, SqliteCoordinateCache, SqlitePlanStore, SqliteRouteCache, StoreError,
};

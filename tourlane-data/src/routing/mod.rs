//! Route resolution between coordinates and between itinerary waypoints.

mod resolver;

pub use resolver::{ResolvedRoute, RouteResolver};

#[cfg(test)]
mod tests;

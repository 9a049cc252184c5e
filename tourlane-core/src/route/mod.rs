//! Route outcomes between two coordinates and the vendor seams that produce
//! them.
//!
//! A resolved edge is one of four shapes, captured by [`RouteOutcome`]:
//! a driving route, a set of ranked transit itineraries, a local
//! speed-based estimate, or an explicit "no route for this mode" answer.
//! Failures travel on the `Err` side as [`RouteError`].

mod error;
mod provider;

use std::time::Duration;

use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::{TransportMode, coord::haversine_metres};

pub use error::{RouteError, Side, VendorError};
pub use provider::{CachedRoute, DirectionsService, RouteCache, RouteKey, TransitService};

/// Headline figures shared by every route shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSummary {
    /// Travel time.
    pub duration: Duration,
    /// Travel distance in metres.
    pub distance_m: u32,
    /// Fare in won, when the vendor reports one.
    pub fare: Option<u32>,
}

/// A road-following route from the driving-directions vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrivingRoute {
    /// Duration, distance and fare (toll for cars, taxi fare for taxis).
    pub summary: RouteSummary,
    /// Decoded polyline; empty when the path was not requested.
    pub path: Vec<Coord<f64>>,
}

/// The vehicle used on one transit leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegKind {
    /// Subway ride.
    Subway,
    /// Bus ride.
    Bus,
    /// Walking transfer or access leg.
    Walk,
}

/// A transit line that can serve a leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitLine {
    /// Display name, e.g. a bus number or subway line name.
    pub name: String,
    /// Vendor route identifier, when provided.
    pub id: Option<i64>,
}

/// One leg of a transit itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitLeg {
    /// Vehicle used on the leg.
    pub kind: LegKind,
    /// Leg duration.
    pub duration: Duration,
    /// Leg distance in metres.
    pub distance_m: u32,
    /// Lines able to serve the leg; empty for walking legs.
    pub lines: Vec<TransitLine>,
    /// Boarding stop name.
    pub board_stop: Option<String>,
    /// Alighting stop name.
    pub alight_stop: Option<String>,
    /// Number of stops travelled.
    pub stop_count: u32,
    /// Intermediate stop coordinates, used for precise line drawing.
    pub stops: Vec<Coord<f64>>,
}

/// A complete transit option as ranked by the vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitItinerary {
    /// Total time, distance and fare.
    pub summary: RouteSummary,
    /// Number of bus boardings.
    pub bus_transfers: u32,
    /// Number of subway boardings.
    pub subway_transfers: u32,
    /// Ordered legs.
    pub legs: Vec<TransitLeg>,
    /// Vendor reference for fetching the raw path geometry.
    pub map_object: Option<String>,
}

/// A locally computed speed-based estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatedRoute {
    /// Estimated duration and great-circle distance.
    pub summary: RouteSummary,
    /// Assumed speed in km/h.
    pub speed_kmh: f64,
}

/// Result of resolving an edge for a mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteOutcome {
    /// Car or taxi route.
    Driving(DrivingRoute),
    /// Ranked transit options; the first is the primary one. Never empty.
    Transit {
        /// Options in vendor order.
        options: Vec<TransitItinerary>,
    },
    /// Walking or cycling estimate.
    Estimate(EstimatedRoute),
    /// The vendor has no route for this mode between the two points.
    NoRoute,
}

impl RouteOutcome {
    /// Wrap transit options, mapping an empty list to [`RouteOutcome::NoRoute`].
    #[must_use]
    pub fn transit(options: Vec<TransitItinerary>) -> Self {
        if options.is_empty() {
            Self::NoRoute
        } else {
            Self::Transit { options }
        }
    }

    /// Estimate a walking or cycling route from great-circle distance.
    ///
    /// Returns `None` for modes that need a vendor.
    ///
    /// # Examples
    ///
    /// ```
    /// use geo::Coord;
    /// use tourlane_core::{RouteOutcome, TransportMode};
    ///
    /// let origin = Coord { x: 127.0, y: 36.0 };
    /// let destination = Coord { x: 127.0, y: 36.01 };
    /// let outcome = RouteOutcome::estimate(TransportMode::Walk, origin, destination)
    ///     .expect("walking is estimated locally");
    /// assert!(outcome.is_estimate());
    /// assert!(RouteOutcome::estimate(TransportMode::Car, origin, destination).is_none());
    /// ```
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "great-circle distances within a city fit in u32 metres"
    )]
    pub fn estimate(
        mode: TransportMode,
        origin: Coord<f64>,
        destination: Coord<f64>,
    ) -> Option<Self> {
        let speed_kmh = mode.estimate_speed_kmh()?;
        let metres = haversine_metres(origin, destination);
        let metres_per_second = speed_kmh * 1000.0 / 3600.0;
        let seconds = (metres / metres_per_second).round();
        Some(Self::Estimate(EstimatedRoute {
            summary: RouteSummary {
                duration: Duration::from_secs(seconds as u64),
                distance_m: metres.round() as u32,
                fare: None,
            },
            speed_kmh,
        }))
    }

    /// Summary of the primary (first) option.
    #[must_use]
    pub fn summary(&self) -> Option<&RouteSummary> {
        self.option_summary(0)
    }

    /// Summary of option `index`. Non-transit outcomes only have option `0`.
    #[must_use]
    pub fn option_summary(&self, index: usize) -> Option<&RouteSummary> {
        match self {
            Self::Driving(route) if index == 0 => Some(&route.summary),
            Self::Estimate(route) if index == 0 => Some(&route.summary),
            Self::Transit { options } => options.get(index).map(|option| &option.summary),
            _ => None,
        }
    }

    /// Number of selectable options.
    #[must_use]
    pub fn option_count(&self) -> usize {
        match self {
            Self::Driving(_) | Self::Estimate(_) => 1,
            Self::Transit { options } => options.len(),
            Self::NoRoute => 0,
        }
    }

    /// Whether the outcome was derived locally rather than from a vendor.
    #[must_use]
    pub const fn is_estimate(&self) -> bool {
        matches!(self, Self::Estimate(_))
    }

    /// Whether the outcome says no route exists for the mode.
    #[must_use]
    pub const fn is_no_route(&self) -> bool {
        matches!(self, Self::NoRoute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn itinerary(minutes: u64) -> TransitItinerary {
        TransitItinerary {
            summary: RouteSummary {
                duration: Duration::from_secs(minutes * 60),
                distance_m: 5_000,
                fare: Some(1_250),
            },
            bus_transfers: 1,
            subway_transfers: 0,
            legs: Vec::new(),
            map_object: None,
        }
    }

    #[rstest]
    fn empty_transit_is_no_route() {
        assert_eq!(RouteOutcome::transit(Vec::new()), RouteOutcome::NoRoute);
    }

    #[rstest]
    fn transit_primary_is_first_option() {
        let outcome = RouteOutcome::transit(vec![itinerary(20), itinerary(35)]);
        assert_eq!(outcome.option_count(), 2);
        assert_eq!(
            outcome.summary().map(|s| s.duration),
            Some(Duration::from_secs(1_200))
        );
        assert_eq!(
            outcome.option_summary(1).map(|s| s.duration),
            Some(Duration::from_secs(2_100))
        );
    }

    #[rstest]
    #[case(TransportMode::Walk, 900)]
    #[case(TransportMode::Bicycle, 240)]
    fn estimates_use_fixed_speeds(#[case] mode: TransportMode, #[case] expected_secs: u64) {
        // 0.009 degrees of latitude is almost exactly one kilometre.
        let outcome = RouteOutcome::estimate(
            mode,
            Coord { x: 127.0, y: 36.0 },
            Coord { x: 127.0, y: 36.009 },
        )
        .expect("estimated mode");
        let summary = outcome.summary().expect("estimate has a summary");
        let secs = summary.duration.as_secs();
        assert!(
            secs.abs_diff(expected_secs) <= expected_secs / 50,
            "expected about {expected_secs}s, got {secs}s"
        );
        assert!(summary.fare.is_none());
    }

    #[rstest]
    fn no_route_has_no_summary() {
        assert!(RouteOutcome::NoRoute.summary().is_none());
        assert_eq!(RouteOutcome::NoRoute.option_count(), 0);
    }

    #[rstest]
    fn outcome_serialises_with_tag() {
        let json = serde_json::to_value(RouteOutcome::NoRoute).expect("serialise");
        assert_eq!(json, serde_json::json!({ "kind": "no_route" }));
    }
}

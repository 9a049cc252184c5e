//! Driving directions response types and the [`DirectionsService`] impl.
//!
//! The gateway forwards the vendor's car navigation payload unchanged. Only
//! the first route is read; the vendor returns alternatives only on request.

use std::time::Duration;

use async_trait::async_trait;
use geo::Coord;
use serde::Deserialize;
use tourlane_core::{
    DirectionsService, DrivingRoute, RouteOutcome, RouteSummary, TransportMode, VendorEndpoint,
    VendorError,
};

use super::{GatewayClient, lng_lat};

/// Route ranking requested from the vendor.
const PRIORITY: &str = "RECOMMEND";

/// Directions API response.
#[derive(Debug, Deserialize)]
pub struct DirectionsResponse {
    /// Candidate routes; the first is the recommended one.
    #[serde(default)]
    pub routes: Vec<DirectionsRoute>,
}

/// One candidate route.
#[derive(Debug, Deserialize)]
pub struct DirectionsRoute {
    /// `0` on success; any other value is a vendor-side failure.
    pub result_code: i32,
    /// Human-readable status.
    #[serde(default)]
    pub result_msg: String,
    /// Totals; absent when `result_code` is non-zero.
    pub summary: Option<DirectionsSummary>,
    /// Road sections carrying the polyline.
    #[serde(default)]
    pub sections: Vec<DirectionsSection>,
}

impl DirectionsRoute {
    /// Check if the route was computed.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.result_code == 0
    }
}

/// Route totals.
#[derive(Debug, Deserialize)]
pub struct DirectionsSummary {
    /// Distance in metres.
    pub distance: u32,
    /// Duration in seconds.
    pub duration: u64,
    /// Fares in won.
    #[serde(default)]
    pub fare: DirectionsFare,
}

/// Fare breakdown.
#[derive(Debug, Default, Deserialize)]
pub struct DirectionsFare {
    /// Estimated taxi fare.
    #[serde(default)]
    pub taxi: u32,
    /// Road tolls.
    #[serde(default)]
    pub toll: u32,
}

/// A section between two waypoints.
#[derive(Debug, Deserialize)]
pub struct DirectionsSection {
    /// Roads in travel order.
    #[serde(default)]
    pub roads: Vec<DirectionsRoad>,
}

/// A single road segment.
#[derive(Debug, Deserialize)]
pub struct DirectionsRoad {
    /// Flattened `[x0, y0, x1, y1, ...]` vertex list.
    #[serde(default)]
    pub vertexes: Vec<f64>,
}

impl DirectionsResponse {
    /// Convert the payload into a [`RouteOutcome`], pricing it for `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`VendorError::Service`] when the vendor reports a non-zero
    /// result code and [`VendorError::Parse`] when no route is present.
    pub fn into_outcome(self, mode: TransportMode) -> Result<RouteOutcome, VendorError> {
        let route = self.routes.into_iter().next().ok_or_else(|| VendorError::Parse {
            message: "directions response has no routes".to_owned(),
        })?;
        if !route.is_ok() {
            return Err(VendorError::Service {
                code: route.result_code.to_string(),
                message: route.result_msg,
            });
        }
        let summary = route.summary.ok_or_else(|| VendorError::Parse {
            message: "directions route has no summary".to_owned(),
        })?;
        let fare = match mode {
            TransportMode::Taxi => summary.fare.taxi,
            _ => summary.fare.toll,
        };
        let path = route
            .sections
            .iter()
            .flat_map(|section| section.roads.iter())
            .flat_map(|road| {
                road.vertexes.chunks_exact(2).filter_map(|pair| match pair {
                    [x, y] => Some(Coord { x: *x, y: *y }),
                    _ => None,
                })
            })
            .collect();
        Ok(RouteOutcome::Driving(DrivingRoute {
            summary: RouteSummary {
                duration: Duration::from_secs(summary.duration),
                distance_m: summary.distance,
                fare: Some(fare),
            },
            path,
        }))
    }
}

#[async_trait]
impl DirectionsService for GatewayClient {
    async fn driving_route(
        &self,
        origin: Coord<f64>,
        destination: Coord<f64>,
        mode: TransportMode,
    ) -> Result<RouteOutcome, VendorError> {
        let url = self.endpoint_url(
            "api/directions",
            &[
                ("origin", lng_lat(origin)),
                ("destination", lng_lat(destination)),
                ("priority", PRIORITY.to_owned()),
            ],
        );
        let response: DirectionsResponse =
            self.get_json(VendorEndpoint::Directions, url).await?;
        response.into_outcome(mode)
    }
}

//! Public transit search response types and the [`TransitService`] impl.
//!
//! The vendor answers either with `result.path[]` or with an `error` member.
//! The error member is a list on some deployments and an object on others,
//! and its code may be a string or a number; both shapes are accepted.

use std::time::Duration;

use async_trait::async_trait;
use geo::Coord;
use serde::Deserialize;
use tourlane_core::{
    LegKind, RouteOutcome, RouteSummary, TransitItinerary, TransitLeg, TransitLine,
    TransitService, TransportMode, VendorEndpoint, VendorError,
};

use super::GatewayClient;

/// Vendor codes that mean "no itinerary" rather than a failure: `-98` when
/// the endpoints are too close together and `-99` when the search is empty.
const NO_ROUTE_CODES: [&str; 2] = ["-98", "-99"];

/// Transit search response.
#[derive(Debug, Deserialize)]
pub struct TransitResponse {
    /// Present on success.
    pub result: Option<TransitResult>,
    /// Present on failure.
    pub error: Option<TransitErrorBody>,
}

/// Success payload.
#[derive(Debug, Deserialize)]
pub struct TransitResult {
    /// Itineraries in vendor ranking order.
    #[serde(default)]
    pub path: Vec<TransitPath>,
}

/// One itinerary.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitPath {
    /// `1` subway, `2` bus, `3` mixed.
    #[serde(default)]
    pub path_type: u8,
    /// Totals.
    pub info: TransitInfo,
    /// Legs in travel order.
    #[serde(default)]
    pub sub_path: Vec<TransitSubPath>,
}

/// Itinerary totals.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitInfo {
    /// Total travel time in minutes.
    pub total_time: u64,
    /// Total distance in metres.
    #[serde(default)]
    pub total_distance: f64,
    /// Fare in won.
    #[serde(default)]
    pub payment: u32,
    /// Bus boardings.
    #[serde(default)]
    pub bus_transit_count: u32,
    /// Subway boardings.
    #[serde(default)]
    pub subway_transit_count: u32,
    /// Reference for fetching the raw path geometry.
    pub map_obj: Option<String>,
}

/// One leg.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitSubPath {
    /// `1` subway, `2` bus, `3` walk.
    pub traffic_type: u8,
    /// Distance in metres.
    #[serde(default)]
    pub distance: f64,
    /// Duration in minutes.
    #[serde(default)]
    pub section_time: u64,
    /// Stops travelled.
    #[serde(default)]
    pub station_count: u32,
    /// Lines able to serve the leg.
    #[serde(default)]
    pub lane: Vec<TransitLane>,
    /// Boarding stop.
    pub start_name: Option<String>,
    /// Alighting stop.
    pub end_name: Option<String>,
    /// Stops passed through, boarding and alighting stops included.
    pub pass_stop_list: Option<PassStopList>,
}

/// A line serving a leg. Buses carry `busNo`, subways carry `name`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitLane {
    /// Bus number.
    pub bus_no: Option<String>,
    /// Bus route identifier.
    #[serde(rename = "busID")]
    pub bus_id: Option<i64>,
    /// Subway line name.
    pub name: Option<String>,
    /// Subway line code.
    pub subway_code: Option<i64>,
}

/// Wrapper around the intermediate stops.
#[derive(Debug, Deserialize)]
pub struct PassStopList {
    /// Stops in travel order.
    #[serde(default)]
    pub stations: Vec<PassStop>,
}

/// One intermediate stop.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassStop {
    /// Stop name.
    #[serde(default)]
    pub station_name: String,
    /// Longitude.
    pub x: Numeric,
    /// Latitude.
    pub y: Numeric,
}

/// A number the vendor may encode as a JSON string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    /// Plain number.
    Number(f64),
    /// Number inside a string.
    Text(String),
}

impl Numeric {
    fn value(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

/// Vendor error member, list or single object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TransitErrorBody {
    /// `[{ "code": "-99", "message": ... }]`
    List(Vec<TransitErrorEntry>),
    /// `{ "code": -99, "msg": ... }`
    Single(TransitErrorEntry),
}

/// One vendor error.
#[derive(Debug, Deserialize)]
pub struct TransitErrorEntry {
    /// Error code.
    pub code: ErrorCode,
    /// Error message.
    #[serde(default, alias = "msg")]
    pub message: String,
}

/// An error code encoded as a string or an integer.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    /// Integer code.
    Number(i64),
    /// String code.
    Text(String),
}

impl ErrorCode {
    fn normalised(&self) -> String {
        match self {
            Self::Number(code) => code.to_string(),
            Self::Text(code) => code.trim().to_owned(),
        }
    }
}

impl TransitErrorBody {
    fn first(self) -> Option<TransitErrorEntry> {
        match self {
            Self::List(entries) => entries.into_iter().next(),
            Self::Single(entry) => Some(entry),
        }
    }
}

impl TransitResponse {
    /// Convert the payload into a [`RouteOutcome`].
    ///
    /// # Errors
    ///
    /// Returns [`VendorError::Service`] for vendor error codes other than the
    /// "no route" codes.
    pub fn into_outcome(self) -> Result<RouteOutcome, VendorError> {
        if let Some(entry) = self.error.and_then(TransitErrorBody::first) {
            let code = entry.code.normalised();
            if NO_ROUTE_CODES.contains(&code.as_str()) {
                return Ok(RouteOutcome::NoRoute);
            }
            return Err(VendorError::Service {
                code,
                message: entry.message,
            });
        }
        let paths = self.result.map(|result| result.path).unwrap_or_default();
        Ok(RouteOutcome::transit(
            paths.into_iter().map(TransitPath::into_itinerary).collect(),
        ))
    }
}

impl TransitPath {
    fn into_itinerary(self) -> TransitItinerary {
        TransitItinerary {
            summary: RouteSummary {
                duration: minutes(self.info.total_time),
                distance_m: metres(self.info.total_distance),
                fare: Some(self.info.payment),
            },
            bus_transfers: self.info.bus_transit_count,
            subway_transfers: self.info.subway_transit_count,
            legs: self
                .sub_path
                .into_iter()
                .filter_map(TransitSubPath::into_leg)
                .collect(),
            map_object: self.info.map_obj,
        }
    }
}

impl TransitSubPath {
    /// `None` for traffic types this engine does not model.
    fn into_leg(self) -> Option<TransitLeg> {
        let kind = match self.traffic_type {
            1 => LegKind::Subway,
            2 => LegKind::Bus,
            3 => LegKind::Walk,
            other => {
                log::debug!("skipping transit leg with traffic type {other}");
                return None;
            }
        };
        let lines = self
            .lane
            .into_iter()
            .filter_map(|lane| lane.into_line(kind))
            .collect();
        let stops = self
            .pass_stop_list
            .map(|list| {
                list.stations
                    .iter()
                    .filter_map(|stop| Some(Coord { x: stop.x.value()?, y: stop.y.value()? }))
                    .collect()
            })
            .unwrap_or_default();
        Some(TransitLeg {
            kind,
            duration: minutes(self.section_time),
            distance_m: metres(self.distance),
            lines,
            board_stop: self.start_name,
            alight_stop: self.end_name,
            stop_count: self.station_count,
            stops,
        })
    }
}

impl TransitLane {
    fn into_line(self, kind: LegKind) -> Option<TransitLine> {
        let (name, id) = match kind {
            LegKind::Bus => (self.bus_no.or(self.name), self.bus_id),
            _ => (self.name.or(self.bus_no), self.subway_code),
        };
        name.map(|name| TransitLine { name, id })
    }
}

const fn minutes(value: u64) -> Duration {
    Duration::from_secs(value.saturating_mul(60))
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "transit distances are non-negative and far below u32::MAX metres"
)]
fn metres(value: f64) -> u32 {
    value.max(0.0).round() as u32
}

#[async_trait]
impl TransitService for GatewayClient {
    async fn transit_routes(
        &self,
        origin: Coord<f64>,
        destination: Coord<f64>,
        mode: TransportMode,
    ) -> Result<RouteOutcome, VendorError> {
        let path_type = mode.transit_path_type().unwrap_or(0);
        let url = self.endpoint_url(
            "api/transit",
            &[
                ("SX", origin.x.to_string()),
                ("SY", origin.y.to_string()),
                ("EX", destination.x.to_string()),
                ("EY", destination.y.to_string()),
                ("SearchPathType", path_type.to_string()),
            ],
        );
        let response: TransitResponse = self.get_json(VendorEndpoint::Transit, url).await?;
        response.into_outcome()
    }
}

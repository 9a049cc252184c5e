use geo::Coord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport-level failure talking to an upstream vendor through the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VendorError {
    /// The request exceeded its deadline.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Requested URL.
        url: String,
        /// Deadline that elapsed.
        timeout_secs: u64,
    },
    /// The gateway answered with a non-success status.
    #[error("request to {url} failed with HTTP {status}: {message}")]
    Http {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error detail.
        message: String,
    },
    /// The request never produced a response.
    #[error("request to {url} failed: {message}")]
    Network {
        /// Requested URL.
        url: String,
        /// Error detail.
        message: String,
    },
    /// The response body did not match the expected shape.
    #[error("failed to parse vendor response: {message}")]
    Parse {
        /// Decoder message.
        message: String,
    },
    /// The vendor reported an error in an otherwise valid payload.
    #[error("vendor error {code}: {message}")]
    Service {
        /// Vendor error code.
        code: String,
        /// Vendor message.
        message: String,
    },
}

/// Which end of a route pair a failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The starting point.
    Origin,
    /// The end point.
    Destination,
}

/// Errors returned by route resolution.
///
/// A missing route for a transit mode is not an error; it is reported as
/// [`crate::RouteOutcome::NoRoute`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    /// Neither endpoint could be geocoded.
    #[error("could not locate `{origin}` or `{destination}`")]
    NotFound {
        /// Origin query.
        origin: String,
        /// Destination query.
        destination: String,
    },
    /// One endpoint failed to geocode; the other side's coordinate is kept so
    /// callers can retry only the failed side.
    #[error("could not locate the {failed:?} `{query}`")]
    PartialFailure {
        /// The side that failed.
        failed: Side,
        /// Query that produced no result.
        query: String,
        /// Coordinate of the side that resolved.
        resolved: Coord<f64>,
    },
    /// A vendor call failed; retryable.
    #[error(transparent)]
    Vendor(#[from] VendorError),
    /// The resolution did not finish before the edge deadline; retryable.
    #[error("route resolution exceeded {timeout_secs}s")]
    Timeout {
        /// Deadline that elapsed.
        timeout_secs: u64,
    },
}

impl RouteError {
    /// Whether the error came from an exhausted deadline, either the
    /// vendor's request timeout or the edge deadline.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Vendor(VendorError::Timeout { .. })
        )
    }
}

//! HTTP client for the same-origin vendor gateway.
//!
//! The gateway proxies three upstream vendors and holds their credentials, so
//! the client only needs a base URL:
//!
//! - `GET {base}/api/directions` for car and taxi routes,
//! - `GET {base}/api/geocode/address` and `GET {base}/api/geocode/keyword`
//!   for geocoding,
//! - `GET {base}/api/transit` for bus and subway itineraries.
//!
//! [`GatewayClient`] implements [`tourlane_core::DirectionsService`],
//! [`tourlane_core::GeocodingService`] and [`tourlane_core::TransitService`].
//! Every call carries the configured request timeout and is reported to the
//! client's [`MetricsSink`].
//!
//! # Example
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//! use tourlane_core::{GeocodingService, LogMetrics};
//! use tourlane_data::{GatewayClient, GatewayConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::new("http://localhost:8080")
//!     .with_timeout(Duration::from_secs(5))
//!     .with_user_agent("my-app/1.0");
//! let client = GatewayClient::with_config(config)?.with_metrics(Arc::new(LogMetrics));
//! let hits = client.search_keyword("대전역").await?;
//! println!("{} hits", hits.len());
//! # Ok(())
//! # }
//! ```

mod directions;
mod geocoding;
mod transit;

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tourlane_core::{MetricsSink, NoopMetrics, VendorEndpoint, VendorError};
use url::Url;

/// Default user agent for gateway requests.
pub const DEFAULT_USER_AGENT: &str = "tourlane-gateway/0.1";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Error raised while building a [`GatewayClient`].
#[derive(Debug, Error)]
pub enum GatewayBuildError {
    /// The base URL does not parse.
    #[error("invalid gateway base URL `{url}`")]
    BaseUrl {
        /// Rejected URL.
        url: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },
    /// The HTTP client failed to build.
    #[error("failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),
}

/// Configuration for [`GatewayClient`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Gateway base URL, e.g. `"http://localhost:8080"`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl GatewayConfig {
    /// Create a configuration for the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// HTTP client for the vendor gateway.
#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: Url,
    timeout: Duration,
    metrics: Arc<dyn MetricsSink>,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("metrics", &"<dyn MetricsSink>")
            .finish_non_exhaustive()
    }
}

impl GatewayClient {
    /// Create a client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client fails
    /// to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayBuildError> {
        Self::with_config(GatewayConfig::new(base_url))
    }

    /// Create a client with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client fails
    /// to build.
    pub fn with_config(config: GatewayConfig) -> Result<Self, GatewayBuildError> {
        let base_url =
            Url::parse(&config.base_url).map_err(|source| GatewayBuildError::BaseUrl {
                url: config.base_url.clone(),
                source,
            })?;
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(GatewayBuildError::HttpClient)?;
        Ok(Self {
            client,
            base_url,
            timeout: config.timeout,
            metrics: Arc::new(NoopMetrics),
        })
    }

    /// Report calls to `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Build `{base}/{path}?{query}`. The base URL's own path is kept, so a
    /// gateway mounted under a prefix works.
    fn endpoint_url(&self, path: &str, query: &[(&str, String)]) -> Url {
        let mut url = self.base_url.clone();
        let joined = format!("{}/{}", url.path().trim_end_matches('/'), path);
        url.set_path(&joined);
        url.query_pairs_mut()
            .clear()
            .extend_pairs(query.iter().map(|(key, value)| (*key, value.as_str())));
        url
    }

    /// Fetch and decode a JSON body, recording the call.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: VendorEndpoint,
        url: Url,
    ) -> Result<T, VendorError> {
        let started = Instant::now();
        let result = self.fetch_json(&url).await;
        self.metrics
            .record_call(endpoint, result.is_ok(), started.elapsed());
        if let Err(error) = &result {
            log::warn!("{endpoint} call failed: {error}");
        }
        result
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, VendorError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        response.json().await.map_err(|err| VendorError::Parse {
            message: err.to_string(),
        })
    }

    /// Convert a reqwest error to a `VendorError`.
    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &Url) -> VendorError {
        if error.is_timeout() {
            return VendorError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout.as_secs(),
            };
        }

        if let Some(status) = error.status() {
            return VendorError::Http {
                url: url.to_string(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }

        VendorError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Format a coordinate as the `lng,lat` pair the gateway expects.
fn lng_lat(coord: geo::Coord<f64>) -> String {
    format!("{},{}", coord.x, coord.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http://gateway.example.com", "http://gateway.example.com/api/transit?SX=1")]
    #[case("http://gateway.example.com/", "http://gateway.example.com/api/transit?SX=1")]
    #[case(
        "http://example.com/tour/",
        "http://example.com/tour/api/transit?SX=1"
    )]
    fn endpoint_url_joins_paths(#[case] base: &str, #[case] expected: &str) {
        let client = GatewayClient::new(base).expect("client should build");
        let url = client.endpoint_url("api/transit", &[("SX", "1".to_owned())]);
        assert_eq!(url.as_str(), expected);
    }

    #[rstest]
    fn endpoint_url_encodes_hangul_queries() {
        let client = GatewayClient::new("http://gateway.example.com").expect("client");
        let url = client.endpoint_url("api/geocode/keyword", &[("query", "대전역".to_owned())]);
        assert!(url.as_str().contains("query=%EB%8C%80"));
    }

    #[rstest]
    fn invalid_base_url_is_rejected() {
        let err = GatewayClient::new("not a url").expect_err("should fail");
        assert!(matches!(err, GatewayBuildError::BaseUrl { .. }));
    }

    #[rstest]
    fn config_builder_pattern() {
        let config = GatewayConfig::new("http://example.com")
            .with_timeout(Duration::from_secs(3))
            .with_user_agent("test-agent/1.0");

        assert_eq!(config.base_url, "http://example.com");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.user_agent, "test-agent/1.0");
    }

    #[rstest]
    fn lng_lat_orders_longitude_first() {
        assert_eq!(lng_lat(geo::Coord { x: 127.38, y: 36.35 }), "127.38,36.35");
    }
}

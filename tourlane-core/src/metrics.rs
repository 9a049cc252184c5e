//! Vendor call statistics.
//!
//! HTTP clients report every call to an injected [`MetricsSink`] rather than
//! to process-wide counters.

use std::{
    collections::HashMap,
    fmt,
    sync::Mutex,
    time::Duration,
};

use log::debug;

/// Upstream endpoint a call was made to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VendorEndpoint {
    /// Driving directions.
    Directions,
    /// Structured address search.
    AddressSearch,
    /// Keyword search.
    KeywordSearch,
    /// Transit itineraries.
    Transit,
}

impl fmt::Display for VendorEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Directions => "directions",
            Self::AddressSearch => "address_search",
            Self::KeywordSearch => "keyword_search",
            Self::Transit => "transit",
        })
    }
}

/// Receives one record per vendor call.
pub trait MetricsSink: Send + Sync {
    /// Record a finished call.
    fn record_call(&self, endpoint: VendorEndpoint, success: bool, latency: Duration);
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record_call(&self, _endpoint: VendorEndpoint, _success: bool, _latency: Duration) {}
}

/// Writes each record to the `log` facade at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMetrics;

impl MetricsSink for LogMetrics {
    fn record_call(&self, endpoint: VendorEndpoint, success: bool, latency: Duration) {
        debug!(
            "vendor call endpoint={endpoint} success={success} latency_ms={}",
            latency.as_millis()
        );
    }
}

/// Aggregated statistics for one endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointStats {
    /// Calls made.
    pub calls: u64,
    /// Calls that failed.
    pub failures: u64,
    /// Sum of call latencies.
    pub total_latency: Duration,
}

/// Keeps per-endpoint counters in memory.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    stats: Mutex<HashMap<VendorEndpoint, EndpointStats>>,
}

impl InMemoryMetrics {
    /// Statistics recorded so far for `endpoint`.
    #[must_use]
    pub fn stats(&self, endpoint: VendorEndpoint) -> EndpointStats {
        self.stats
            .lock()
            .map(|stats| stats.get(&endpoint).copied().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Total calls across all endpoints.
    #[must_use]
    pub fn total_calls(&self) -> u64 {
        self.stats
            .lock()
            .map(|stats| stats.values().map(|entry| entry.calls).sum())
            .unwrap_or_default()
    }
}

impl MetricsSink for InMemoryMetrics {
    fn record_call(&self, endpoint: VendorEndpoint, success: bool, latency: Duration) {
        let Ok(mut stats) = self.stats.lock() else {
            return;
        };
        let entry = stats.entry(endpoint).or_default();
        entry.calls += 1;
        if !success {
            entry.failures += 1;
        }
        entry.total_latency += latency;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn in_memory_metrics_aggregates_per_endpoint() {
        let metrics = InMemoryMetrics::default();
        metrics.record_call(VendorEndpoint::Transit, true, Duration::from_millis(40));
        metrics.record_call(VendorEndpoint::Transit, false, Duration::from_millis(60));
        metrics.record_call(VendorEndpoint::Directions, true, Duration::from_millis(10));

        let transit = metrics.stats(VendorEndpoint::Transit);
        assert_eq!(transit.calls, 2);
        assert_eq!(transit.failures, 1);
        assert_eq!(transit.total_latency, Duration::from_millis(100));
        assert_eq!(metrics.total_calls(), 3);
        assert_eq!(metrics.stats(VendorEndpoint::KeywordSearch), EndpointStats::default());
    }
}

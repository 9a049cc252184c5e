//! Address and keyword search response types and the [`GeocodingService`]
//! impl.

use async_trait::async_trait;
use geo::Coord;
use serde::Deserialize;
use tourlane_core::{GeocodeDocument, GeocodingService, VendorEndpoint, VendorError};

use super::GatewayClient;

/// Search response shared by the address and keyword endpoints.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    /// Matching documents in vendor relevance order.
    #[serde(default)]
    pub documents: Vec<SearchDocument>,
}

/// One search hit. Coordinates arrive as decimal strings.
#[derive(Debug, Deserialize)]
pub struct SearchDocument {
    /// Place name; present on keyword hits.
    pub place_name: Option<String>,
    /// Full address; present on address hits and most keyword hits.
    pub address_name: Option<String>,
    /// Longitude.
    pub x: String,
    /// Latitude.
    pub y: String,
}

impl SearchDocument {
    /// Convert into a [`GeocodeDocument`], preferring the place name.
    ///
    /// Returns `None` when the coordinate strings do not parse.
    #[must_use]
    pub fn into_document(self) -> Option<GeocodeDocument> {
        let x = self.x.trim().parse::<f64>().ok()?;
        let y = self.y.trim().parse::<f64>().ok()?;
        let name = self
            .place_name
            .filter(|name| !name.trim().is_empty())
            .or(self.address_name)
            .unwrap_or_default();
        Some(GeocodeDocument {
            name,
            coord: Coord { x, y },
        })
    }
}

impl SearchResponse {
    /// Usable documents; hits with malformed coordinates are dropped.
    #[must_use]
    pub fn into_documents(self) -> Vec<GeocodeDocument> {
        self.documents
            .into_iter()
            .filter_map(SearchDocument::into_document)
            .collect()
    }
}

impl GatewayClient {
    async fn search(
        &self,
        endpoint: VendorEndpoint,
        path: &str,
        query: &str,
    ) -> Result<Vec<GeocodeDocument>, VendorError> {
        let url = self.endpoint_url(path, &[("query", query.to_owned())]);
        let response: SearchResponse = self.get_json(endpoint, url).await?;
        Ok(response.into_documents())
    }
}

#[async_trait]
impl GeocodingService for GatewayClient {
    async fn search_address(&self, query: &str) -> Result<Vec<GeocodeDocument>, VendorError> {
        self.search(VendorEndpoint::AddressSearch, "api/geocode/address", query)
            .await
    }

    async fn search_keyword(&self, query: &str) -> Result<Vec<GeocodeDocument>, VendorError> {
        self.search(VendorEndpoint::KeywordSearch, "api/geocode/keyword", query)
            .await
    }
}

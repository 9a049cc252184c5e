//! Cascading coordinate resolution with a persistent cache.

use std::sync::Arc;

use log::{debug, warn};
use tourlane_core::{
    CoordinateCache, GeocodeDocument, GeocodeError, GeocodingService, MatchSource,
    ResolvedCoordinate, ServiceRegion, VendorError,
};

use super::{
    normalise::{normalise_query, strip_parenthetical},
    scoring::KeywordScoring,
};
use crate::store::off_runtime;

/// Resolves free-text addresses and place names to coordinates.
///
/// Each query variant (the normalised query, then without parenthetical
/// content, then prefixed with the region token) is tried as a structured
/// address search and then as a ranked keyword search. The first in-region
/// match wins; otherwise the best-ranked out-of-region hit seen anywhere,
/// address or keyword, is returned flagged `in_region = false`.
///
/// Every success is cached under the normalised query. Misses are not cached
/// and a vendor failure aborts the cascade without caching.
#[derive(Clone)]
pub struct CoordinateResolver {
    service: Arc<dyn GeocodingService>,
    cache: Arc<dyn CoordinateCache>,
    region: ServiceRegion,
    scoring: KeywordScoring,
}

impl std::fmt::Debug for CoordinateResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinateResolver")
            .field("region", &self.region)
            .field("scoring", &self.scoring)
            .finish_non_exhaustive()
    }
}

/// Best out-of-region hit seen so far.
struct Fallback {
    score: f64,
    document: GeocodeDocument,
}

impl CoordinateResolver {
    /// Create a resolver for the default service region.
    #[must_use]
    pub fn new(service: Arc<dyn GeocodingService>, cache: Arc<dyn CoordinateCache>) -> Self {
        Self {
            service,
            cache,
            region: ServiceRegion::default(),
            scoring: KeywordScoring::default(),
        }
    }

    /// Validate results against `region`.
    #[must_use]
    pub fn with_region(mut self, region: ServiceRegion) -> Self {
        self.region = region;
        self
    }

    /// Rank keyword hits with `scoring`.
    #[must_use]
    pub fn with_scoring(mut self, scoring: KeywordScoring) -> Self {
        self.scoring = scoring;
        self
    }

    /// The region results are validated against.
    #[must_use]
    pub const fn region(&self) -> &ServiceRegion {
        &self.region
    }

    /// Resolve `query` to a coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::NotFound`] when every stage comes back empty
    /// and [`GeocodeError::Vendor`] when a vendor call fails.
    pub async fn resolve(&self, query: &str) -> Result<ResolvedCoordinate, GeocodeError> {
        let normalised = normalise_query(query);
        if normalised.is_empty() {
            return Err(not_found(query));
        }
        if let Some(hit) = self.cached(&normalised).await {
            debug!("coordinate cache hit for `{normalised}`");
            return Ok(hit);
        }

        let mut fallback: Option<Fallback> = None;
        for variant in self.variants(&normalised) {
            if let Some(found) = self.search_variant(&variant, &mut fallback).await? {
                self.store(&normalised, &found).await;
                return Ok(found);
            }
        }

        let Some(Fallback { document, .. }) = fallback else {
            debug!("no location found for `{normalised}`");
            return Err(not_found(query));
        };
        warn!(
            "`{normalised}` resolved outside the service region to `{}`",
            document.name
        );
        let degraded = ResolvedCoordinate {
            coord: document.coord,
            name: document.name,
            in_region: false,
            source: MatchSource::OutOfRegion,
        };
        self.store(&normalised, &degraded).await;
        Ok(degraded)
    }

    /// Query rewrites in cascade order, without duplicates.
    fn variants(&self, normalised: &str) -> Vec<String> {
        let mut variants = vec![normalised.to_owned()];
        let stripped = strip_parenthetical(normalised);
        let base = stripped.clone().unwrap_or_else(|| normalised.to_owned());
        if let Some(stripped) = stripped {
            variants.push(stripped);
        }
        if !self.region.is_named_in(&base) {
            variants.push(format!("{} {base}", self.region.canonical_token()));
        }
        variants.dedup();
        variants
    }

    async fn search_variant(
        &self,
        variant: &str,
        fallback: &mut Option<Fallback>,
    ) -> Result<Option<ResolvedCoordinate>, VendorError> {
        let addresses = self.service.search_address(variant).await?;
        for document in addresses {
            if self.region.contains(document.coord) {
                return Ok(Some(resolved(document, MatchSource::Address)));
            }
            self.offer_fallback(variant, document, fallback);
        }

        let keywords = self.service.search_keyword(variant).await?;
        let mut best_inside: Option<(f64, GeocodeDocument)> = None;
        for document in keywords {
            if !self.region.contains(document.coord) {
                self.offer_fallback(variant, document, fallback);
                continue;
            }
            let score = self.scoring.score(variant, &document.name, true);
            if best_inside.as_ref().is_none_or(|(best, _)| score > *best) {
                best_inside = Some((score, document));
            }
        }
        Ok(best_inside.map(|(_, document)| resolved(document, MatchSource::Keyword)))
    }

    /// Keep `document` as the out-of-region answer if it outranks the
    /// current one.
    fn offer_fallback(
        &self,
        variant: &str,
        document: GeocodeDocument,
        fallback: &mut Option<Fallback>,
    ) {
        let score = self.scoring.score(variant, &document.name, false);
        if fallback.as_ref().is_none_or(|best| score > best.score) {
            *fallback = Some(Fallback { score, document });
        }
    }

    async fn cached(&self, normalised: &str) -> Option<ResolvedCoordinate> {
        let cache = Arc::clone(&self.cache);
        let query = normalised.to_owned();
        match off_runtime(move || cache.get(&query)).await {
            Ok(hit) => hit.map(ResolvedCoordinate::from),
            Err(error) => {
                warn!("coordinate cache read failed for `{normalised}`: {error}");
                None
            }
        }
    }

    async fn store(&self, normalised: &str, found: &ResolvedCoordinate) {
        let cache = Arc::clone(&self.cache);
        let query = normalised.to_owned();
        let resolved = found.clone();
        if let Err(error) = off_runtime(move || cache.put(&query, &resolved)).await {
            warn!("coordinate cache write failed for `{normalised}`: {error}");
        }
    }
}

fn resolved(document: GeocodeDocument, source: MatchSource) -> ResolvedCoordinate {
    ResolvedCoordinate {
        coord: document.coord,
        name: document.name,
        in_region: true,
        source,
    }
}

fn not_found(query: &str) -> GeocodeError {
    GeocodeError::NotFound {
        query: query.to_owned(),
    }
}

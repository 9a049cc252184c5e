//! Coordinate helpers: cache-key rounding, great-circle distance and the
//! service region used to validate geocoding results.
//!
//! Coordinates use WGS84 with `x = longitude` and `y = latitude`, matching the
//! vendor payloads.

use std::fmt;

use geo::{Coord, Distance, Haversine, Intersects, Point, Rect};
use serde::{Deserialize, Serialize};

/// Scale applied before rounding a coordinate into a [`CoordKey`].
///
/// `1e-5` degrees is roughly 1.1 m of latitude, enough to merge repeated
/// geocoding results for one building without merging neighbouring places.
pub const COORD_KEY_SCALE: f64 = 100_000.0;

/// A coordinate rounded to a fixed grid, used as a cache key component.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use tourlane_core::CoordKey;
///
/// let a = CoordKey::from_coord(Coord { x: 127.384_551, y: 36.350_412 });
/// let b = CoordKey::from_coord(Coord { x: 127.384_549, y: 36.350_414 });
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "12738455,3635041");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CoordKey {
    lng: i64,
    lat: i64,
}

impl CoordKey {
    /// Round `coord` onto the cache grid.
    #[must_use]
    pub fn from_coord(coord: Coord<f64>) -> Self {
        Self {
            lng: scale(coord.x),
            lat: scale(coord.y),
        }
    }
}

impl fmt::Display for CoordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lng, self.lat)
    }
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::float_arithmetic,
    reason = "WGS84 degrees scaled by 1e5 fit comfortably in i64"
)]
fn scale(value: f64) -> i64 {
    (value * COORD_KEY_SCALE).round() as i64
}

/// Great-circle distance between two coordinates in metres.
#[must_use]
pub fn haversine_metres(origin: Coord<f64>, destination: Coord<f64>) -> f64 {
    Haversine.distance(Point::from(origin), Point::from(destination))
}

/// Geographic bounding box and canonical place-name token for the area the
/// site serves.
///
/// Results falling outside the box are treated as suspect by the coordinate
/// resolver; the canonical token (usually the city name) is prepended to
/// queries that omit it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRegion {
    bounds: Rect<f64>,
    canonical_token: String,
}

impl ServiceRegion {
    /// Build a region from its bounding box and canonical token.
    #[must_use]
    pub fn new(bounds: Rect<f64>, canonical_token: impl Into<String>) -> Self {
        Self {
            bounds,
            canonical_token: canonical_token.into(),
        }
    }

    /// Whether `coord` lies inside the region. Boundary points count as inside.
    #[must_use]
    pub fn contains(&self, coord: Coord<f64>) -> bool {
        self.bounds.intersects(&coord)
    }

    /// The token that identifies the region in free-text queries.
    #[must_use]
    pub fn canonical_token(&self) -> &str {
        &self.canonical_token
    }

    /// Whether `query` already names the region.
    #[must_use]
    pub fn is_named_in(&self, query: &str) -> bool {
        query.contains(self.canonical_token.as_str())
    }

    /// The region's bounding box.
    #[must_use]
    pub const fn bounds(&self) -> &Rect<f64> {
        &self.bounds
    }
}

impl Default for ServiceRegion {
    /// Daejeon metropolitan city.
    fn default() -> Self {
        Self::new(
            Rect::new(Coord { x: 127.24, y: 36.18 }, Coord { x: 127.56, y: 36.50 }),
            "대전",
        )
    }
}

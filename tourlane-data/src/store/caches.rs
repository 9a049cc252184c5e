//! SQLite-backed route and coordinate caches.
//!
//! Entries never expire. Writes use `INSERT OR REPLACE`, so concurrent
//! writers of one key converge on the last value.

use geo::Coord;
use rusqlite::{OptionalExtension, params};
use tourlane_core::{
    CacheError, CachedCoordinate, CachedRoute, CoordinateCache, ResolvedCoordinate, RouteCache,
    RouteKey, RouteOutcome,
};

use super::{Database, StoreError, error::sqlite, now_secs};

/// Route cache stored in the `route_cache` table.
#[derive(Debug, Clone)]
pub struct SqliteRouteCache {
    database: Database,
}

impl SqliteRouteCache {
    /// Cache backed by `database`.
    #[must_use]
    pub const fn new(database: Database) -> Self {
        Self { database }
    }

    /// Number of cached routes.
    ///
    /// # Errors
    ///
    /// Returns an error when the count query fails.
    pub fn len(&self) -> Result<usize, StoreError> {
        count(&self.database, "SELECT COUNT(*) FROM route_cache")
    }

    fn lookup(&self, key: &RouteKey) -> Result<Option<CachedRoute>, StoreError> {
        let row: Option<(String, i64)> = self.database.with_connection(|connection| {
            connection
                .prepare_cached(
                    "SELECT outcome, created_at FROM route_cache
                     WHERE origin_key = ?1 AND dest_key = ?2 AND mode = ?3",
                )
                .map_err(sqlite("prepare route lookup"))?
                .query_row(
                    params![
                        key.origin.to_string(),
                        key.destination.to_string(),
                        key.mode.as_str()
                    ],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .map_err(sqlite("look up route"))
        })?;
        row.map(|(outcome, created_at)| {
            let outcome: RouteOutcome =
                serde_json::from_str(&outcome).map_err(|err| StoreError::Decode {
                    what: "cached route",
                    message: err.to_string(),
                })?;
            Ok(CachedRoute {
                outcome,
                created_at: u64::try_from(created_at).unwrap_or_default(),
            })
        })
        .transpose()
    }

    fn store(&self, key: &RouteKey, outcome: &RouteOutcome) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(outcome).map_err(|source| StoreError::Encode {
            what: "route outcome",
            source,
        })?;
        self.database.with_connection(|connection| {
            connection
                .prepare_cached(
                    "INSERT OR REPLACE INTO route_cache
                        (origin_key, dest_key, mode, outcome, is_estimate, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(sqlite("prepare route insert"))?
                .execute(params![
                    key.origin.to_string(),
                    key.destination.to_string(),
                    key.mode.as_str(),
                    encoded,
                    outcome.is_estimate(),
                    now_secs(),
                ])
                .map(|_| ())
                .map_err(sqlite("insert route"))
        })
    }
}

impl RouteCache for SqliteRouteCache {
    fn get(&self, key: &RouteKey) -> Result<Option<CachedRoute>, CacheError> {
        Ok(self.lookup(key)?)
    }

    fn put(&self, key: &RouteKey, outcome: &RouteOutcome) -> Result<(), CacheError> {
        Ok(self.store(key, outcome)?)
    }
}

/// Coordinate cache stored in the `coordinate_cache` table.
#[derive(Debug, Clone)]
pub struct SqliteCoordinateCache {
    database: Database,
}

impl SqliteCoordinateCache {
    /// Cache backed by `database`.
    #[must_use]
    pub const fn new(database: Database) -> Self {
        Self { database }
    }

    /// Number of cached coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error when the count query fails.
    pub fn len(&self) -> Result<usize, StoreError> {
        count(&self.database, "SELECT COUNT(*) FROM coordinate_cache")
    }

    fn lookup(&self, query: &str) -> Result<Option<CachedCoordinate>, StoreError> {
        self.database.with_connection(|connection| {
            connection
                .prepare_cached(
                    "SELECT lng, lat, name, in_region, created_at FROM coordinate_cache
                     WHERE query = ?1",
                )
                .map_err(sqlite("prepare coordinate lookup"))?
                .query_row([query], |row| {
                    let created_at: i64 = row.get(4)?;
                    Ok(CachedCoordinate {
                        coord: Coord {
                            x: row.get(0)?,
                            y: row.get(1)?,
                        },
                        name: row.get(2)?,
                        in_region: row.get(3)?,
                        created_at: u64::try_from(created_at).unwrap_or_default(),
                    })
                })
                .optional()
                .map_err(sqlite("look up coordinate"))
        })
    }

    fn store(&self, query: &str, resolved: &ResolvedCoordinate) -> Result<(), StoreError> {
        self.database.with_connection(|connection| {
            connection
                .prepare_cached(
                    "INSERT OR REPLACE INTO coordinate_cache
                        (query, lng, lat, name, in_region, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(sqlite("prepare coordinate insert"))?
                .execute(params![
                    query,
                    resolved.coord.x,
                    resolved.coord.y,
                    resolved.name,
                    resolved.in_region,
                    now_secs(),
                ])
                .map(|_| ())
                .map_err(sqlite("insert coordinate"))
        })
    }
}

impl CoordinateCache for SqliteCoordinateCache {
    fn get(&self, query: &str) -> Result<Option<CachedCoordinate>, CacheError> {
        Ok(self.lookup(query)?)
    }

    fn put(&self, query: &str, resolved: &ResolvedCoordinate) -> Result<(), CacheError> {
        Ok(self.store(query, resolved)?)
    }
}

fn count(database: &Database, sql: &'static str) -> Result<usize, StoreError> {
    let rows: i64 = database.with_connection(|connection| {
        connection
            .query_row(sql, [], |row| row.get(0))
            .map_err(sqlite("count rows"))
    })?;
    Ok(usize::try_from(rows).unwrap_or_default())
}

//! Cache error type and in-memory cache implementations.
//!
//! The in-memory caches back single-process deployments and tests; the
//! SQLite implementations in `tourlane-data` persist across restarts.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
    time::{SystemTime, UNIX_EPOCH},
};

use thiserror::Error;

use crate::{
    CachedCoordinate, CachedRoute, CoordinateCache, ResolvedCoordinate, RouteCache, RouteKey,
    RouteOutcome,
};

/// Errors raised by cache backends.
///
/// Resolvers treat cache failures as misses and keep going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The storage backend failed.
    #[error("cache backend failed: {message}")]
    Backend {
        /// Backend error message.
        message: String,
    },
    /// A stored value could not be decoded.
    #[error("cached value for `{key}` is corrupt: {message}")]
    Corrupt {
        /// Key of the corrupt entry.
        key: String,
        /// Decoder message.
        message: String,
    },
    /// A writer panicked while holding the cache lock.
    #[error("cache lock poisoned")]
    Poisoned,
}

/// Seconds since the Unix epoch, saturating to zero on clock skew.
#[must_use]
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, CacheError> {
    mutex.lock().map_err(|_| CacheError::Poisoned)
}

/// Route cache held in process memory.
#[derive(Debug, Default)]
pub struct MemoryRouteCache {
    entries: Mutex<HashMap<RouteKey, CachedRoute>>,
}

impl MemoryRouteCache {
    /// Number of cached routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    /// Whether the cache holds no routes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RouteCache for MemoryRouteCache {
    fn get(&self, key: &RouteKey) -> Result<Option<CachedRoute>, CacheError> {
        Ok(lock(&self.entries)?.get(key).cloned())
    }

    fn put(&self, key: &RouteKey, outcome: &RouteOutcome) -> Result<(), CacheError> {
        let entry = CachedRoute {
            outcome: outcome.clone(),
            created_at: unix_now(),
        };
        lock(&self.entries)?.insert(*key, entry);
        Ok(())
    }
}

/// Coordinate cache held in process memory.
#[derive(Debug, Default)]
pub struct MemoryCoordinateCache {
    entries: Mutex<HashMap<String, CachedCoordinate>>,
}

impl MemoryCoordinateCache {
    /// Number of cached coordinates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    /// Whether the cache holds no coordinates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CoordinateCache for MemoryCoordinateCache {
    fn get(&self, query: &str) -> Result<Option<CachedCoordinate>, CacheError> {
        Ok(lock(&self.entries)?.get(query).cloned())
    }

    fn put(&self, query: &str, resolved: &ResolvedCoordinate) -> Result<(), CacheError> {
        let entry = CachedCoordinate {
            coord: resolved.coord,
            name: resolved.name.clone(),
            in_region: resolved.in_region,
            created_at: unix_now(),
        };
        lock(&self.entries)?.insert(query.to_owned(), entry);
        Ok(())
    }
}

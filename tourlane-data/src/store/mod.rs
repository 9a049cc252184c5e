//! SQLite persistence for caches, plans and collaboration.
//!
//! The module is split into focused submodules:
//! - [`schema`] materialises the tables and records the schema version.
//! - `caches` implements the route and coordinate cache seams.
//! - `plans` stores plans, collaborators and invites with permission checks.
//!
//! All stores share one [`Database`] handle. Statements are short, so the
//! connection sits behind a mutex rather than a pool.
#![forbid(unsafe_code)]

mod caches;
mod error;
mod plans;
pub mod schema;

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use rusqlite::Connection;
use tourlane_core::CacheError;

pub use caches::{SqliteCoordinateCache, SqliteRouteCache};
pub use error::StoreError;
pub use plans::SqlitePlanStore;
pub use schema::{SCHEMA_VERSION, initialise_schema};

/// Shared handle to an initialised SQLite database.
#[derive(Debug, Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (creating if needed) the database at `path` and initialise the
    /// schema.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`] when the file cannot be opened, or a
    /// schema error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let connection = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(connection)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error when SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let connection = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: ":memory:".into(),
            source,
        })?;
        Self::from_connection(connection)
    }

    fn from_connection(mut connection: Connection) -> Result<Self, StoreError> {
        initialise_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Run `operation` with exclusive access to the connection.
    pub(crate) fn with_connection<T>(
        &self,
        operation: impl FnOnce(&mut Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut connection = self.connection.lock().map_err(|_| StoreError::Poisoned)?;
        operation(&mut connection)
    }
}

/// Run a cache operation on the blocking pool so SQLite I/O suspends only
/// the calling task.
pub(crate) async fn off_runtime<T, F>(operation: F) -> Result<T, CacheError>
where
    F: FnOnce() -> Result<T, CacheError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(operation)
        .await
        .unwrap_or_else(|error| {
            Err(CacheError::Backend {
                message: format!("cache task failed: {error}"),
            })
        })
}

/// Convert an identifier to SQLite's integer type.
pub(crate) fn sql_id(id: u64) -> Result<i64, StoreError> {
    i64::try_from(id).map_err(|_| StoreError::IdOutOfRange { id })
}

/// Convert a stored integer back to an identifier.
pub(crate) fn stored_id(value: i64, what: &'static str) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Decode {
        what,
        message: format!("negative identifier {value}"),
    })
}

/// Current Unix time as a SQLite integer.
pub(crate) fn now_secs() -> i64 {
    i64::try_from(tourlane_core::cache::unix_now()).unwrap_or(i64::MAX)
}

use std::path::PathBuf;

use rusqlite::Error as SqliteError;
use thiserror::Error;
use tourlane_core::{AccessError, CacheError, InviteError, ItineraryError, PlanId};

/// Errors raised by the SQLite store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database file could not be opened.
    #[error("failed to open SQLite database at {path:?}")]
    Open {
        /// Database path.
        path: PathBuf,
        /// Driver error.
        #[source]
        source: SqliteError,
    },
    /// A statement failed.
    #[error("SQLite operation '{operation}' failed")]
    Sqlite {
        /// What was being done.
        operation: &'static str,
        /// Driver error.
        #[source]
        source: SqliteError,
    },
    /// The database was created by an incompatible schema version.
    #[error(
        "expected schema version {expected} but found {found}; apply migrations before retrying"
    )]
    VersionMismatch {
        /// Version this build understands.
        expected: i64,
        /// Version found in the database.
        found: i64,
    },
    /// A value could not be serialised for storage.
    #[error("failed to encode {what}")]
    Encode {
        /// What was being encoded.
        what: &'static str,
        /// Encoder error.
        #[source]
        source: serde_json::Error,
    },
    /// A stored value could not be decoded.
    #[error("failed to decode {what}: {message}")]
    Decode {
        /// What was being decoded.
        what: &'static str,
        /// Decoder message.
        message: String,
    },
    /// An identifier does not fit SQLite's signed 64-bit integers.
    #[error("identifier {id} is out of range for SQLite")]
    IdOutOfRange {
        /// Offending identifier.
        id: u64,
    },
    /// No plan with the given id exists.
    #[error("plan {0} not found")]
    PlanNotFound(PlanId),
    /// The user lacks the required permission.
    #[error(transparent)]
    Forbidden(#[from] AccessError),
    /// Invite redemption was refused.
    #[error(transparent)]
    Invite(#[from] InviteError),
    /// A stored plan violates the itinerary invariants.
    #[error(transparent)]
    Itinerary(#[from] ItineraryError),
    /// A writer panicked while holding the connection.
    #[error("database connection lock poisoned")]
    Poisoned,
}

impl From<StoreError> for CacheError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Decode { what, message } => Self::Corrupt {
                key: what.to_owned(),
                message,
            },
            StoreError::Poisoned => Self::Poisoned,
            other => Self::Backend {
                message: other.to_string(),
            },
        }
    }
}

/// Shorthand for wrapping a driver error with its operation.
pub(crate) fn sqlite(operation: &'static str) -> impl FnOnce(SqliteError) -> StoreError {
    move |source| StoreError::Sqlite { operation, source }
}

use rusqlite::{Connection, OptionalExtension, Transaction};

use super::error::{StoreError, sqlite};

/// Schema version written by this build.
pub const SCHEMA_VERSION: i64 = 1;

/// Create the caches, plan tables and collaboration tables inside `connection`.
///
/// The function enables foreign keys, creates any missing tables and indexes
/// and records the schema version. A database stamped with another version is
/// rejected so migrations can be applied explicitly.
///
/// # Examples
/// ```
/// use rusqlite::Connection;
/// use tourlane_data::store::initialise_schema;
///
/// let mut conn = Connection::open_in_memory().expect("create in-memory database");
/// initialise_schema(&mut conn).expect("create schema");
/// initialise_schema(&mut conn).expect("initialisation is idempotent");
///
/// let tables: i64 = conn
///     .query_row(
///         "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'route_cache'",
///         [],
///         |row| row.get(0),
///     )
///     .expect("query sqlite_master");
/// assert_eq!(tables, 1);
/// ```
///
/// # Errors
///
/// Returns [`StoreError::Sqlite`] when a migration step fails and
/// [`StoreError::VersionMismatch`] for databases of another version.
pub fn initialise_schema(connection: &mut Connection) -> Result<(), StoreError> {
    connection
        .pragma_update(None, "foreign_keys", true)
        .map_err(sqlite("enable foreign keys"))?;

    let transaction = connection
        .transaction()
        .map_err(sqlite("begin schema transaction"))?;

    create_cache_tables(&transaction)?;
    create_plan_tables(&transaction)?;
    create_collaboration_tables(&transaction)?;
    ensure_schema_version(&transaction)?;

    transaction
        .commit()
        .map_err(sqlite("commit schema transaction"))
}

fn create_cache_tables(transaction: &Transaction<'_>) -> Result<(), StoreError> {
    run_migration_step(
        transaction,
        "create route_cache",
        "CREATE TABLE IF NOT EXISTS route_cache (
            origin_key TEXT NOT NULL,
            dest_key TEXT NOT NULL,
            mode TEXT NOT NULL,
            outcome TEXT NOT NULL,
            is_estimate INTEGER NOT NULL CHECK (is_estimate IN (0, 1)),
            created_at INTEGER NOT NULL,
            PRIMARY KEY (origin_key, dest_key, mode)
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "create coordinate_cache",
        "CREATE TABLE IF NOT EXISTS coordinate_cache (
            query TEXT PRIMARY KEY CHECK (length(query) > 0),
            lng REAL NOT NULL,
            lat REAL NOT NULL,
            name TEXT NOT NULL,
            in_region INTEGER NOT NULL CHECK (in_region IN (0, 1)),
            created_at INTEGER NOT NULL
        ) WITHOUT ROWID",
    )
}

fn create_plan_tables(transaction: &Transaction<'_>) -> Result<(), StoreError> {
    run_migration_step(
        transaction,
        "create plans",
        "CREATE TABLE IF NOT EXISTS plans (
            id INTEGER PRIMARY KEY,
            owner_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            lodging TEXT,
            default_mode TEXT,
            slug TEXT UNIQUE,
            likes INTEGER NOT NULL DEFAULT 0,
            views INTEGER NOT NULL DEFAULT 0,
            updated_at INTEGER NOT NULL
        )",
    )?;
    run_migration_step(
        transaction,
        "create days",
        "CREATE TABLE IF NOT EXISTS days (
            id INTEGER NOT NULL,
            plan_id INTEGER NOT NULL,
            number INTEGER NOT NULL CHECK (number > 0),
            date TEXT NOT NULL,
            lodging_edge TEXT,
            PRIMARY KEY (plan_id, id),
            UNIQUE (plan_id, number),
            FOREIGN KEY (plan_id) REFERENCES plans(id) ON DELETE CASCADE
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "create places",
        "CREATE TABLE IF NOT EXISTS places (
            id INTEGER NOT NULL,
            plan_id INTEGER NOT NULL,
            day_id INTEGER NOT NULL,
            order_index INTEGER NOT NULL CHECK (order_index >= 0),
            name TEXT NOT NULL,
            address TEXT NOT NULL,
            lng REAL,
            lat REAL,
            stay_secs INTEGER,
            memo TEXT,
            edge TEXT,
            PRIMARY KEY (plan_id, id),
            UNIQUE (plan_id, day_id, order_index),
            FOREIGN KEY (plan_id, day_id) REFERENCES days(plan_id, id) ON DELETE CASCADE
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "create plan_likes",
        "CREATE TABLE IF NOT EXISTS plan_likes (
            plan_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            PRIMARY KEY (plan_id, user_id),
            FOREIGN KEY (plan_id) REFERENCES plans(id) ON DELETE CASCADE
        ) WITHOUT ROWID",
    )
}

fn create_collaboration_tables(transaction: &Transaction<'_>) -> Result<(), StoreError> {
    run_migration_step(
        transaction,
        "create collaborators",
        "CREATE TABLE IF NOT EXISTS collaborators (
            plan_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            permission TEXT NOT NULL CHECK (permission IN ('view', 'edit', 'admin')),
            PRIMARY KEY (plan_id, user_id),
            FOREIGN KEY (plan_id) REFERENCES plans(id) ON DELETE CASCADE
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "create invites",
        "CREATE TABLE IF NOT EXISTS invites (
            token TEXT PRIMARY KEY,
            plan_id INTEGER NOT NULL,
            permission TEXT NOT NULL CHECK (permission IN ('view', 'edit', 'admin')),
            expires_at INTEGER NOT NULL,
            max_uses INTEGER NOT NULL CHECK (max_uses > 0),
            uses INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (plan_id) REFERENCES plans(id) ON DELETE CASCADE
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "index invites",
        "CREATE INDEX IF NOT EXISTS idx_invites_plan ON invites(plan_id)",
    )
}

fn ensure_schema_version(transaction: &Transaction<'_>) -> Result<(), StoreError> {
    run_migration_step(
        transaction,
        "create schema version table",
        "CREATE TABLE IF NOT EXISTS tourlane_schema_version (
            version INTEGER PRIMARY KEY CHECK (version > 0),
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        ) WITHOUT ROWID",
    )?;

    let existing_version: Option<i64> = transaction
        .query_row(
            "SELECT version FROM tourlane_schema_version LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(sqlite("read schema version"))?;

    match existing_version {
        Some(version) if version == SCHEMA_VERSION => Ok(()),
        Some(found) => Err(StoreError::VersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        }),
        None => transaction
            .execute(
                "INSERT INTO tourlane_schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )
            .map(|_| ())
            .map_err(sqlite("record schema version")),
    }
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), StoreError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(sqlite(step))
}

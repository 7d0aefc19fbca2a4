// crates/sqlserial-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Storage Connection
// Description: rusqlite-backed `Storage` with transactional operations.
// Purpose: Execute serialized operations against one SQLite connection.
// Dependencies: sqlserial-core, rusqlite, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`SqliteStorage`] wraps a single [`Connection`]. A batch opens a
//! transaction, runs its statements in order, and commits; the first failing
//! statement rolls the whole batch back and its error becomes the operation
//! outcome. A single statement runs in autocommit mode, which SQLite already
//! applies atomically and which statements such as `VACUUM` require. Rows
//! are returned for the final statement only.
//!
//! [`snapshot_database`] copies a live database file through the online
//! backup API using a separate read-only connection.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::backup::Backup;
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use serde::Serialize;
use sqlserial_core::Operation;
use sqlserial_core::RowSet;
use sqlserial_core::SqlValue;
use sqlserial_core::Statement;
use sqlserial_core::Storage;
use sqlserial_core::StorageError;
use sqlserial_core::StorageErrorKind;
use thiserror::Error;
use tracing::debug;
use tracing::info;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout for `SQLite` connections.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Database file used when configuration names no path.
pub const DEFAULT_DATABASE_FILE: &str = "sqlserial.db";
/// Path that selects a private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum busy timeout accepted from configuration (10 minutes).
const MAX_BUSY_TIMEOUT_MS: u64 = 600_000;
/// Pages copied per backup step.
const BACKUP_PAGES_PER_STEP: i32 = 64;
/// Pause between backup steps so the live connection can make progress.
const BACKUP_STEP_PAUSE: Duration = Duration::from_millis(5);

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` storage connection.
///
/// # Invariants
/// - `path` is [`MEMORY_PATH`] or resolves to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteStorageConfig {
    /// Path to the `SQLite` database file.
    #[serde(default = "default_path")]
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Whether foreign key constraints are enforced.
    #[serde(default = "default_foreign_keys")]
    pub foreign_keys: bool,
}

impl SqliteStorageConfig {
    /// Creates a config for the database at `path` with default pragmas.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
            foreign_keys: true,
        }
    }

    /// Creates a config for a private in-memory database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MEMORY_PATH)
    }

    /// Returns true when the config selects an in-memory database.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == MEMORY_PATH
    }

    /// Validates path safety and timeout limits.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStorageError::Invalid`] when a limit is violated.
    pub fn validate(&self) -> Result<(), SqliteStorageError> {
        if self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(SqliteStorageError::Invalid(format!(
                "busy_timeout_ms out of range: {} (max {MAX_BUSY_TIMEOUT_MS})",
                self.busy_timeout_ms
            )));
        }
        if self.is_in_memory() {
            return Ok(());
        }
        validate_storage_path(&self.path)
    }
}

/// Returns the default database path.
fn default_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE_FILE)
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Foreign keys are enforced unless disabled.
const fn default_foreign_keys() -> bool {
    true
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while opening or snapshotting a database.
///
/// Statement failures are not reported here; they become
/// [`StorageError`] operation outcomes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStorageError {
    /// Filesystem error.
    #[error("sqlite storage io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite storage db error: {0}")]
    Db(String),
    /// Invalid configuration or request.
    #[error("sqlite storage invalid: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Storage
// ============================================================================

/// `SQLite` connection driven by the engine executor.
#[derive(Debug)]
pub struct SqliteStorage {
    /// The one connection.
    connection: Connection,
    /// Database path used as the log label.
    label: String,
}

impl SqliteStorage {
    /// Opens the database described by `config` and applies pragmas.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStorageError`] when validation, directory creation, or
    /// opening the connection fails.
    pub fn open(config: &SqliteStorageConfig) -> Result<Self, SqliteStorageError> {
        config.validate()?;
        if !config.is_in_memory() {
            ensure_parent_dir(&config.path)?;
        }
        let connection = open_connection(config)?;
        let label = config.path.display().to_string();
        info!(
            path = %label,
            journal_mode = config.journal_mode.pragma_value(),
            sync_mode = config.sync_mode.pragma_value(),
            "sqlite storage opened"
        );
        Ok(Self {
            connection,
            label,
        })
    }

    /// Opens a private in-memory database with default pragmas.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStorageError::Db`] when `SQLite` cannot open it.
    pub fn open_in_memory() -> Result<Self, SqliteStorageError> {
        Self::open(&SqliteStorageConfig::in_memory())
    }
}

impl Storage for SqliteStorage {
    fn execute(&mut self, operation: &Operation) -> Result<RowSet, StorageError> {
        if let Operation::Single(statement) = operation
            && self.connection.is_autocommit()
        {
            // Autocommit keeps VACUUM and friends usable.
            return run_statement(&self.connection, statement).map_err(|err| classify_error(&err));
        }
        let tx = self.connection.transaction().map_err(|err| classify_error(&err))?;
        let mut rows = RowSet::empty();
        for statement in operation.statements() {
            rows = run_statement(&tx, statement).map_err(|err| classify_error(&err))?;
        }
        tx.commit().map_err(|err| classify_error(&err))?;
        Ok(rows)
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Runs one statement on `conn` and collects its rows.
fn run_statement(conn: &Connection, statement: &Statement) -> rusqlite::Result<RowSet> {
    let mut prepared = conn.prepare(&statement.sql)?;
    let params = params_from_iter(statement.params.iter().map(to_sqlite_value));
    let column_count = prepared.column_count();
    if column_count == 0 {
        let affected = prepared.execute(params)?;
        return Ok(RowSet::affected(affected));
    }

    let columns: Vec<String> = prepared.column_names().into_iter().map(str::to_string).collect();
    let readonly = prepared.readonly();
    let mut rows = Vec::new();
    let mut cursor = prepared.query(params)?;
    while let Some(row) = cursor.next()? {
        let mut values = Vec::with_capacity(column_count);
        for index in 0 .. column_count {
            values.push(from_sqlite_value(row.get_ref(index)?));
        }
        rows.push(values);
    }
    drop(cursor);
    let mut result = RowSet::new(columns, rows);
    if !readonly {
        result.rows_affected = usize::try_from(conn.changes()).unwrap_or(usize::MAX);
    }
    Ok(result)
}

/// Converts a bound parameter into a rusqlite value.
fn to_sqlite_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(value) => Value::Integer(*value),
        SqlValue::Real(value) => Value::Real(*value),
        SqlValue::Text(value) => Value::Text(value.clone()),
        SqlValue::Blob(value) => Value::Blob(value.clone()),
    }
}

/// Converts a result cell into a core value.
///
/// TEXT that is not valid UTF-8 comes back as a blob with the raw bytes.
fn from_sqlite_value(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(value) => SqlValue::Integer(value),
        ValueRef::Real(value) => SqlValue::Real(value),
        ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => SqlValue::Text(text.to_string()),
            Err(_) => SqlValue::Blob(bytes.to_vec()),
        },
        ValueRef::Blob(bytes) => SqlValue::Blob(bytes.to_vec()),
    }
}

/// Maps a rusqlite error onto the storage error taxonomy.
fn classify_error(error: &rusqlite::Error) -> StorageError {
    let kind = match error {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::ConstraintViolation => StorageErrorKind::Constraint,
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => StorageErrorKind::Busy,
            ErrorCode::SystemIoFailure
            | ErrorCode::DiskFull
            | ErrorCode::CannotOpen
            | ErrorCode::ReadOnly
            | ErrorCode::PermissionDenied
            | ErrorCode::DatabaseCorrupt
            | ErrorCode::NotADatabase => StorageErrorKind::Io,
            ErrorCode::Unknown => StorageErrorKind::Syntax,
            _ => StorageErrorKind::Other,
        },
        rusqlite::Error::InvalidParameterCount(..)
        | rusqlite::Error::InvalidParameterName(_)
        | rusqlite::Error::ToSqlConversionFailure(_) => StorageErrorKind::Binding,
        _ => StorageErrorKind::Other,
    };
    StorageError::new(kind, error.to_string())
}

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// Copies the database described by `config` into a new file at `destination`.
///
/// The copy is taken through a separate read-only connection, so it can run
/// while an engine holds the primary connection.
///
/// # Errors
///
/// Returns [`SqliteStorageError::Invalid`] for in-memory sources or an
/// existing destination, and [`SqliteStorageError::Db`] when the backup fails.
pub fn snapshot_database(
    config: &SqliteStorageConfig,
    destination: &Path,
) -> Result<(), SqliteStorageError> {
    if config.is_in_memory() {
        return Err(SqliteStorageError::Invalid(
            "cannot snapshot an in-memory database".to_string(),
        ));
    }
    config.validate()?;
    validate_storage_path(destination)?;
    if destination.exists() {
        return Err(SqliteStorageError::Invalid(
            "snapshot destination already exists".to_string(),
        ));
    }
    if !config.path.exists() {
        return Err(SqliteStorageError::Invalid("source database does not exist".to_string()));
    }
    ensure_parent_dir(destination)?;

    let source = Connection::open_with_flags(&config.path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|err| SqliteStorageError::Db(err.to_string()))?;
    source
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStorageError::Db(err.to_string()))?;
    let mut target =
        Connection::open(destination).map_err(|err| SqliteStorageError::Db(err.to_string()))?;
    {
        let backup = Backup::new(&source, &mut target)
            .map_err(|err| SqliteStorageError::Db(err.to_string()))?;
        backup
            .run_to_completion(BACKUP_PAGES_PER_STEP, BACKUP_STEP_PAUSE, None)
            .map_err(|err| SqliteStorageError::Db(err.to_string()))?;
    }
    info!(
        source = %config.path.display(),
        destination = %destination.display(),
        "sqlite snapshot written"
    );
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the database exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStorageError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStorageError::Io("database path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStorageError::Io(err.to_string()))
}

/// Validates database paths for safety limits.
fn validate_storage_path(path: &Path) -> Result<(), SqliteStorageError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStorageError::Invalid("database path must not be empty".to_string()));
    }
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStorageError::Invalid("database path exceeds length limit".to_string()));
    }
    if path.components().any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(SqliteStorageError::Invalid(
            "database path contains an overlong component".to_string(),
        ));
    }
    if path.is_dir() {
        return Err(SqliteStorageError::Invalid(
            "database path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens the connection with pragmas applied.
fn open_connection(config: &SqliteStorageConfig) -> Result<Connection, SqliteStorageError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStorageError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies the configured pragmas.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStorageConfig,
) -> Result<(), SqliteStorageError> {
    let foreign_keys = if config.foreign_keys { "ON" } else { "OFF" };
    let pragmas = format!(
        "PRAGMA foreign_keys = {foreign_keys}; PRAGMA journal_mode = {}; PRAGMA synchronous = {};",
        config.journal_mode.pragma_value(),
        config.sync_mode.pragma_value()
    );
    connection.execute_batch(&pragmas).map_err(|err| SqliteStorageError::Db(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStorageError::Db(err.to_string()))?;
    debug!(foreign_keys, busy_timeout_ms = config.busy_timeout_ms, "sqlite pragmas applied");
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

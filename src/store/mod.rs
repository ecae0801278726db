//! SQLite-backed storage for sessions, the scan ledger and the tag directory.
//!
//! # Concurrency
//!
//! The serving layer may run as several processes over one database file, so
//! nothing here relies on in-process locks. A [`Database`] is only a
//! descriptor (path and busy timeout). Every operation opens its own
//! connection and runs inside its own transaction:
//!
//! * [`Database::write`] uses `BEGIN IMMEDIATE`, taking SQLite's write lock up
//!   front. A session-state check and the write that depends on it therefore
//!   observe the same state, and concurrent writers queue behind the busy
//!   timeout instead of failing mid-transaction.
//! * [`Database::read`] uses a deferred transaction, giving a consistent
//!   snapshot for multi-statement reads such as a session plus its scan count.
//!
//! The database runs in WAL mode so readers never block the writer.
//!
//! # Layout
//!
//! * [`sessions`]: the session store.
//! * [`ledger`]: the append-only scan ledger.

pub mod ledger;
pub mod sessions;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};

use crate::error::AttendanceError;

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Default time a connection waits on a locked database before reporting
/// [`AttendanceError::Unavailable`].
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Longest busy timeout SQLite accepts (`i32::MAX` milliseconds).
pub const MAX_BUSY_TIMEOUT: Duration = Duration::from_millis(i32::MAX as u64);

/// Handle to the attendance database file.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
    busy_timeout: Duration,
}

impl Database {
    /// Opens or creates the database at `path` with the default busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// schema cannot be applied.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AttendanceError> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Opens or creates the database at `path`.
    ///
    /// Creates missing parent directories, switches the file to WAL mode and
    /// applies the schema.
    ///
    /// # Errors
    ///
    /// Returns [`AttendanceError::InvalidInput`] if `busy_timeout` exceeds
    /// [`MAX_BUSY_TIMEOUT`], or an error if the parent directory cannot be
    /// created or the schema cannot be applied.
    pub fn open_with_timeout(
        path: impl AsRef<Path>,
        busy_timeout: Duration,
    ) -> Result<Self, AttendanceError> {
        if busy_timeout > MAX_BUSY_TIMEOUT {
            return Err(AttendanceError::InvalidInput(format!(
                "busy timeout {}ms exceeds the maximum of {}ms",
                busy_timeout.as_millis(),
                MAX_BUSY_TIMEOUT.as_millis()
            )));
        }
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let db = Self {
            path: path.to_path_buf(),
            busy_timeout,
        };

        let conn = db.connect()?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        if !mode.eq_ignore_ascii_case("wal") {
            log::warn!(
                "Database {} did not switch to WAL (journal_mode={})",
                path.display(),
                mode
            );
        }
        conn.execute_batch(SCHEMA_SQL)?;

        log::debug!(
            "Opened attendance database at {} (busy timeout {:?})",
            path.display(),
            busy_timeout
        );
        Ok(db)
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Busy timeout applied to every connection.
    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }

    /// Opens a fresh connection with the busy timeout and foreign keys enabled.
    ///
    /// # Errors
    ///
    /// Returns [`AttendanceError::Unavailable`] if the file cannot be opened.
    pub fn connect(&self) -> Result<Connection, AttendanceError> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }

    /// Runs `f` inside an immediate (write-locked) transaction and commits
    /// if it returns `Ok`. Any error rolls the transaction back.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `f`, or a storage error from
    /// beginning/committing the transaction.
    pub fn write<T, F>(&self, f: F) -> Result<T, AttendanceError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, AttendanceError>,
    {
        self.transaction(TransactionBehavior::Immediate, f)
    }

    /// Runs `f` inside a deferred transaction for a consistent read snapshot.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `f`, or a storage error.
    pub fn read<T, F>(&self, f: F) -> Result<T, AttendanceError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, AttendanceError>,
    {
        self.transaction(TransactionBehavior::Deferred, f)
    }

    fn transaction<T, F>(&self, behavior: TransactionBehavior, f: F) -> Result<T, AttendanceError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, AttendanceError>,
    {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(behavior)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

/// Returns true if `err` is a UNIQUE or PRIMARY KEY constraint violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

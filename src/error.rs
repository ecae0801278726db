//! Error taxonomy, exit codes and structured error reporting.

use rusqlite::ErrorCode;
use serde::Serialize;
use thiserror::Error;

use crate::model::{FacultyId, SessionId, StudentId, TagId};

/// Errors returned by the attendance core.
///
/// Every variant except [`AttendanceError::Storage`] and
/// [`AttendanceError::Io`] is an expected, recoverable outcome that callers
/// are meant to branch on. A duplicate tap is *not* an error; see
/// [`crate::model::ScanOutcome`].
#[derive(Debug, Error)]
pub enum AttendanceError {
    /// The referenced session does not exist.
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// The caller does not own the session.
    #[error("faculty '{faculty_id}' does not own session {session_id}")]
    Forbidden {
        session_id: SessionId,
        faculty_id: FacultyId,
    },

    /// Close was requested for a session that is already closed.
    #[error("session {0} is already closed")]
    AlreadyClosed(SessionId),

    /// Delete was requested for a session that is still open.
    #[error("session {0} is still open; close it before deleting")]
    SessionStillOpen(SessionId),

    /// A scan arrived for a closed session.
    #[error("session {0} is closed and no longer accepts scans")]
    SessionClosed(SessionId),

    /// The tag is not bound to any student.
    #[error("tag '{0}' is not bound to any student")]
    UnknownTag(TagId),

    /// The tag is already bound to a different student.
    #[error("tag '{tag_id}' is already bound to student '{student_id}'")]
    TagAlreadyBound { tag_id: TagId, student_id: StudentId },

    /// The student is not registered in the tag directory.
    #[error("student '{0}' is not registered")]
    StudentNotFound(StudentId),

    /// A caller-supplied value failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Transient storage failure (busy, locked, connection or disk I/O).
    /// Safe to retry.
    #[error("storage unavailable: {0}")]
    Unavailable(#[source] rusqlite::Error),

    /// Non-transient storage failure.
    #[error("storage error: {0}")]
    Storage(#[source] rusqlite::Error),

    /// Filesystem error while preparing the database location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AttendanceError {
    /// Whether the caller may retry the same operation unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Whether this is an expected domain rejection rather than a fault.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Unavailable(_) | Self::Storage(_) | Self::Io(_))
    }

    /// Stable machine-readable name of the variant.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Forbidden { .. } => "forbidden",
            Self::AlreadyClosed(_) => "already_closed",
            Self::SessionStillOpen(_) => "session_still_open",
            Self::SessionClosed(_) => "session_closed",
            Self::UnknownTag(_) => "unknown_tag",
            Self::TagAlreadyBound { .. } => "tag_already_bound",
            Self::StudentNotFound(_) => "student_not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Unavailable(_) => "unavailable",
            Self::Storage(_) => "storage",
            Self::Io(_) => "io",
        }
    }
}

impl From<rusqlite::Error> for AttendanceError {
    fn from(err: rusqlite::Error) -> Self {
        if is_transient(&err) {
            log::debug!("Transient storage failure: {}", err);
            Self::Unavailable(err)
        } else {
            Self::Storage(err)
        }
    }
}

/// Returns true for SQLite failures that clear up on their own: lock
/// contention past the busy timeout, a database that cannot be opened right
/// now, or disk I/O trouble.
fn is_transient(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => matches!(
            e.code,
            ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::SystemIoFailure
                | ErrorCode::OutOfMemory
        ),
        _ => false,
    }
}

/// Exit codes for the `nfc-attendance` binary.
///
/// - 0: Success
/// - 1: General error (unexpected failure)
/// - 2: Rejected (a typed domain outcome such as `SessionClosed`)
/// - 75: Unavailable (transient storage failure, retry later)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the command completed.
    Success = 0,
    /// General error: an unexpected error occurred.
    GeneralError = 1,
    /// Rejected: the request was refused by the session state machine,
    /// ownership checks, or the tag directory.
    Rejected = 2,
    /// Unavailable: storage was busy or unreachable; safe to retry.
    Unavailable = 75,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "NA000",
            Self::GeneralError => "NA001",
            Self::Rejected => "NA002",
            Self::Unavailable => "NA075",
        }
    }

    /// Picks the exit code for an error escaping the application.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<AttendanceError>() {
            Some(e) if e.is_retryable() => Self::Unavailable,
            Some(e) if e.is_rejection() => Self::Rejected,
            _ => Self::GeneralError,
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "NA002")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Variant name of the attendance error, when the failure is one
    pub kind: Option<String>,
    /// Human-readable error message
    pub message: String,
    /// Whether retrying the same command may succeed
    pub retryable: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        let attendance = err.downcast_ref::<AttendanceError>();
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            kind: attendance.map(|e| e.kind().to_string()),
            message: err.to_string(),
            retryable: attendance.is_some_and(AttendanceError::is_retryable),
        }
    }
}

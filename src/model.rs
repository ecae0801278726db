//! Core data model: identities, sessions and scan records.
//!
//! Identities handed to the core (faculty, student, tag) are opaque strings.
//! The core never interprets them beyond equality, so each one is a thin
//! newtype that only guarantees it is non-empty.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::AttendanceError;

/// Current time, truncated to microseconds.
///
/// Stored timestamps are compared for equality (a duplicate tap reports the
/// original `recorded_at`), so every timestamp the core produces must survive
/// a round-trip through SQLite text encoding unchanged.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident, $what:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = AttendanceError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.0.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                String::column_result(value).map(Self)
            }
        }

        impl $name {
            fn require_non_empty(raw: &str) -> Result<&str, AttendanceError> {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(AttendanceError::InvalidInput(format!(
                        "{} must not be empty",
                        $what
                    )));
                }
                Ok(trimmed)
            }
        }
    };
}

opaque_id!(
    /// Identity of an authenticated faculty member. Used only for ownership checks.
    FacultyId,
    "faculty id"
);

opaque_id!(
    /// Identity of a student as resolved by the tag directory.
    StudentId,
    "student id"
);

opaque_id!(
    /// Identifier of a physical NFC tag as reported by a reader.
    TagId,
    "tag id"
);

impl FacultyId {
    /// Creates a faculty identity, trimming surrounding whitespace.
    pub fn new(raw: &str) -> Result<Self, AttendanceError> {
        Self::require_non_empty(raw).map(|s| Self(s.to_string()))
    }
}

impl StudentId {
    /// Creates a student identity, trimming surrounding whitespace.
    pub fn new(raw: &str) -> Result<Self, AttendanceError> {
        Self::require_non_empty(raw).map(|s| Self(s.to_string()))
    }
}

impl TagId {
    /// Creates a tag identifier.
    ///
    /// Readers disagree on the case of hex UIDs, so the identifier is trimmed
    /// and ASCII upper-cased. The same normalization applies on binding and
    /// on lookup.
    pub fn new(raw: &str) -> Result<Self, AttendanceError> {
        Self::require_non_empty(raw).map(|s| Self(s.to_ascii_uppercase()))
    }
}

/// Identifier of an attendance session, assigned by the session store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = AttendanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(SessionId)
            .map_err(|_| AttendanceError::InvalidInput(format!("invalid session id: '{s}'")))
    }
}

impl ToSql for SessionId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for SessionId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(SessionId)
    }
}

/// Lifecycle state of a session. `Open` is the only initial state and
/// `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Accepting scans.
    Open,
    /// No longer accepting scans; may only be deleted.
    Closed,
}

impl SessionState {
    /// Storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for SessionState {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SessionState {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(FromSqlError::Other(
                format!("unknown session state: {other}").into(),
            )),
        }
    }
}

/// A stored attendance session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub subject: String,
    pub faculty_id: FacultyId,
    pub state: SessionState,
    pub opened_at: DateTime<Utc>,
    /// Set if and only if `state` is [`SessionState::Closed`].
    pub closed_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Returns true while the session accepts scans.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    /// Builds the caller-facing view with a scan count read from the ledger.
    #[must_use]
    pub fn into_view(self, scan_count: u64) -> SessionView {
        SessionView {
            id: self.id,
            subject: self.subject,
            faculty_id: self.faculty_id,
            state: self.state,
            opened_at: self.opened_at,
            closed_at: self.closed_at,
            scan_count,
        }
    }
}

/// Session as reported to callers.
///
/// `scan_count` is derived from the scan ledger when the view is built and is
/// never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: SessionId,
    pub subject: String,
    pub faculty_id: FacultyId,
    pub state: SessionState,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub scan_count: u64,
}

/// An accepted, deduplicated scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub session_id: SessionId,
    pub student_id: StudentId,
    pub recorded_at: DateTime<Utc>,
}

/// Successful result of recording a scan.
///
/// A repeated tap is not an error: it is reported as [`ScanOutcome::Duplicate`]
/// carrying the timestamp of the first accepted tap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ScanOutcome {
    #[serde(rename_all = "camelCase")]
    Accepted {
        student_id: StudentId,
        recorded_at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Duplicate {
        student_id: StudentId,
        original_recorded_at: DateTime<Utc>,
    },
}

impl ScanOutcome {
    /// Student the tag resolved to.
    #[must_use]
    pub fn student_id(&self) -> &StudentId {
        match self {
            Self::Accepted { student_id, .. } | Self::Duplicate { student_id, .. } => student_id,
        }
    }

    /// Timestamp of the record that now represents this student in the session.
    #[must_use]
    pub fn recorded_at(&self) -> DateTime<Utc> {
        match self {
            Self::Accepted { recorded_at, .. } => *recorded_at,
            Self::Duplicate {
                original_recorded_at,
                ..
            } => *original_recorded_at,
        }
    }

    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

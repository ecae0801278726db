//! Scan ledger: append-only access to the `scan_records` table.
//!
//! The `(session_id, student_id)` primary key is what makes a scan count at
//! most once. [`insert`] attempts the write unconditionally and reads a
//! constraint violation as "already recorded"; there is no existence check
//! beforehand for a concurrent tap to slip past.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::AttendanceError;
use crate::model::{ScanRecord, SessionId, StudentId};
use crate::store::is_unique_violation;

/// Result of attempting to append a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Append {
    /// The record was written.
    Inserted,
    /// A record for the same session and student already exists.
    AlreadyRecorded,
}

/// Appends `record` unless the student already has one for the session.
pub fn insert(conn: &Connection, record: &ScanRecord) -> Result<Append, AttendanceError> {
    match conn.execute(
        "INSERT INTO scan_records (session_id, student_id, recorded_at) VALUES (?1, ?2, ?3)",
        params![record.session_id, record.student_id, record.recorded_at],
    ) {
        Ok(_) => Ok(Append::Inserted),
        Err(err) if is_unique_violation(&err) => Ok(Append::AlreadyRecorded),
        Err(err) => Err(err.into()),
    }
}

/// Timestamp of the recorded scan for a student in a session, if any.
pub fn recorded_at(
    conn: &Connection,
    session_id: SessionId,
    student_id: &StudentId,
) -> Result<Option<DateTime<Utc>>, AttendanceError> {
    let ts = conn
        .query_row(
            "SELECT recorded_at FROM scan_records WHERE session_id = ?1 AND student_id = ?2",
            params![session_id, student_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(ts)
}

/// Number of accepted scans for a session.
pub fn count_for_session(conn: &Connection, session_id: SessionId) -> Result<u64, AttendanceError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM scan_records WHERE session_id = ?1",
        params![session_id],
        |row| row.get(0),
    )?;
    Ok(count.unsigned_abs())
}

/// All scans for a session in the order they were recorded.
pub fn records_for_session(
    conn: &Connection,
    session_id: SessionId,
) -> Result<Vec<ScanRecord>, AttendanceError> {
    let mut stmt = conn.prepare(
        "SELECT session_id, student_id, recorded_at FROM scan_records
         WHERE session_id = ?1
         ORDER BY recorded_at ASC, student_id ASC",
    )?;
    let records = stmt
        .query_map(params![session_id], |row| {
            Ok(ScanRecord {
                session_id: row.get(0)?,
                student_id: row.get(1)?,
                recorded_at: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

/// Removes every scan for a session. Returns the number removed.
///
/// Must run in the same transaction as the session row delete.
pub fn delete_for_session(conn: &Connection, session_id: SessionId) -> Result<usize, AttendanceError> {
    Ok(conn.execute(
        "DELETE FROM scan_records WHERE session_id = ?1",
        params![session_id],
    )?)
}

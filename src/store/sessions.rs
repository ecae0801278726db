//! Session store: row-level access to the `sessions` table.
//!
//! Functions take a plain [`Connection`] so they compose inside whatever
//! transaction the caller holds. They perform no state-machine checks;
//! that is the session manager's job.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::AttendanceError;
use crate::model::{FacultyId, Session, SessionId, SessionState};

const SESSION_COLUMNS: &str = "id, subject, faculty_id, state, opened_at, closed_at";

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        subject: row.get(1)?,
        faculty_id: row.get(2)?,
        state: row.get(3)?,
        opened_at: row.get(4)?,
        closed_at: row.get(5)?,
    })
}

/// Inserts a new open session and returns it with its assigned id.
pub fn insert(
    conn: &Connection,
    subject: &str,
    faculty_id: &FacultyId,
    opened_at: DateTime<Utc>,
) -> Result<Session, AttendanceError> {
    conn.execute(
        "INSERT INTO sessions (subject, faculty_id, state, opened_at, closed_at)
         VALUES (?1, ?2, ?3, ?4, NULL)",
        params![subject, faculty_id, SessionState::Open, opened_at],
    )?;

    Ok(Session {
        id: SessionId(conn.last_insert_rowid()),
        subject: subject.to_string(),
        faculty_id: faculty_id.clone(),
        state: SessionState::Open,
        opened_at,
        closed_at: None,
    })
}

/// Loads a session by id.
pub fn find(conn: &Connection, id: SessionId) -> Result<Option<Session>, AttendanceError> {
    let session = conn
        .query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
            params![id],
            session_from_row,
        )
        .optional()?;
    Ok(session)
}

/// Transitions an open session to closed. Returns the number of rows
/// changed: 0 if the session was missing or not open.
pub fn mark_closed(
    conn: &Connection,
    id: SessionId,
    closed_at: DateTime<Utc>,
) -> Result<usize, AttendanceError> {
    let changed = conn.execute(
        "UPDATE sessions SET state = ?1, closed_at = ?2 WHERE id = ?3 AND state = ?4",
        params![SessionState::Closed, closed_at, id, SessionState::Open],
    )?;
    Ok(changed)
}

/// Removes a session row. Returns the number of rows removed.
pub fn delete(conn: &Connection, id: SessionId) -> Result<usize, AttendanceError> {
    Ok(conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?)
}

/// Lists sessions owned by `faculty_id`, newest first.
pub fn list_for_faculty(
    conn: &Connection,
    faculty_id: &FacultyId,
    open_only: bool,
) -> Result<Vec<Session>, AttendanceError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SESSION_COLUMNS} FROM sessions
         WHERE faculty_id = ?1 AND (?2 = 0 OR state = 'open')
         ORDER BY opened_at DESC, id DESC"
    ))?;
    let sessions = stmt
        .query_map(params![faculty_id, open_only], session_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(sessions)
}

//! Session lifecycle: open, close, delete, and session queries.

use crate::error::AttendanceError;
use crate::model::{now, FacultyId, ScanRecord, Session, SessionId, SessionState, SessionView};
use crate::store::{ledger, sessions, Database};

use rusqlite::Connection;

/// Owns every session state transition.
///
/// Holds no session state of its own: each call re-reads the store inside a
/// transaction, so several managers in several processes can share one
/// database.
#[derive(Debug, Clone)]
pub struct SessionManager {
    db: Database,
}

impl SessionManager {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Opens a new session owned by `faculty_id`.
    ///
    /// Any number of sessions may be open at once, including several owned
    /// by the same faculty member.
    ///
    /// # Errors
    ///
    /// [`AttendanceError::InvalidInput`] for a blank subject, or a storage error.
    pub fn open_session(
        &self,
        subject: &str,
        faculty_id: &FacultyId,
    ) -> Result<SessionView, AttendanceError> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(AttendanceError::InvalidInput(
                "subject must not be empty".to_string(),
            ));
        }

        let session = self
            .db
            .write(|tx| sessions::insert(tx, subject, faculty_id, now()))?;

        log::info!(
            "Opened session {} ({}) for faculty {}",
            session.id,
            session.subject,
            session.faculty_id
        );
        Ok(session.into_view(0))
    }

    /// Closes an open session.
    ///
    /// Once this returns, the session rejects every further scan. Scans that
    /// committed before the close are kept and counted.
    ///
    /// # Errors
    ///
    /// [`AttendanceError::NotFound`], [`AttendanceError::Forbidden`], or
    /// [`AttendanceError::AlreadyClosed`]; none of them mutate anything.
    pub fn close_session(
        &self,
        session_id: SessionId,
        faculty_id: &FacultyId,
    ) -> Result<SessionView, AttendanceError> {
        let view = self.db.write(|tx| {
            let mut session = load_owned(tx, session_id, faculty_id)?;
            if !session.is_open() {
                return Err(AttendanceError::AlreadyClosed(session_id));
            }

            // Wall clocks may step backwards between processes.
            let closed_at = now().max(session.opened_at);
            if sessions::mark_closed(tx, session_id, closed_at)? != 1 {
                return Err(AttendanceError::AlreadyClosed(session_id));
            }
            session.state = SessionState::Closed;
            session.closed_at = Some(closed_at);

            let scan_count = ledger::count_for_session(tx, session_id)?;
            Ok(session.into_view(scan_count))
        })?;

        log::info!(
            "Closed session {} with {} scan(s)",
            view.id,
            view.scan_count
        );
        Ok(view)
    }

    /// Deletes a closed session together with all of its scans.
    ///
    /// Returns the number of scan records removed.
    ///
    /// # Errors
    ///
    /// [`AttendanceError::NotFound`], [`AttendanceError::Forbidden`], or
    /// [`AttendanceError::SessionStillOpen`]; none of them mutate anything.
    pub fn delete_session(
        &self,
        session_id: SessionId,
        faculty_id: &FacultyId,
    ) -> Result<usize, AttendanceError> {
        let removed = self.db.write(|tx| {
            let session = load_owned(tx, session_id, faculty_id)?;
            if session.is_open() {
                return Err(AttendanceError::SessionStillOpen(session_id));
            }

            // Explicit cascade in the same transaction; the FK cascade would
            // cover it too, but the count is reported.
            let removed = ledger::delete_for_session(tx, session_id)?;
            sessions::delete(tx, session_id)?;
            Ok(removed)
        })?;

        log::info!(
            "Deleted session {} and {} scan record(s)",
            session_id,
            removed
        );
        Ok(removed)
    }

    /// Current view of a session, with its scan count read now.
    ///
    /// # Errors
    ///
    /// [`AttendanceError::NotFound`] if the session does not exist.
    pub fn get_session(&self, session_id: SessionId) -> Result<SessionView, AttendanceError> {
        self.db.read(|tx| {
            let session =
                sessions::find(tx, session_id)?.ok_or(AttendanceError::NotFound(session_id))?;
            let scan_count = ledger::count_for_session(tx, session_id)?;
            Ok(session.into_view(scan_count))
        })
    }

    /// Sessions owned by `faculty_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store cannot be read.
    pub fn list_sessions(
        &self,
        faculty_id: &FacultyId,
        open_only: bool,
    ) -> Result<Vec<SessionView>, AttendanceError> {
        self.db.read(|tx| {
            sessions::list_for_faculty(tx, faculty_id, open_only)?
                .into_iter()
                .map(|session| {
                    let scan_count = ledger::count_for_session(tx, session.id)?;
                    Ok(session.into_view(scan_count))
                })
                .collect::<Result<Vec<_>, AttendanceError>>()
        })
    }

    /// Accepted scans of a session in recorded order.
    ///
    /// # Errors
    ///
    /// [`AttendanceError::NotFound`] if the session does not exist.
    pub fn attendance(&self, session_id: SessionId) -> Result<Vec<ScanRecord>, AttendanceError> {
        self.db.read(|tx| {
            if sessions::find(tx, session_id)?.is_none() {
                return Err(AttendanceError::NotFound(session_id));
            }
            ledger::records_for_session(tx, session_id)
        })
    }
}

/// Loads a session and checks that `faculty_id` owns it.
fn load_owned(
    conn: &Connection,
    session_id: SessionId,
    faculty_id: &FacultyId,
) -> Result<Session, AttendanceError> {
    let session = sessions::find(conn, session_id)?.ok_or(AttendanceError::NotFound(session_id))?;
    if &session.faculty_id != faculty_id {
        log::warn!(
            "Faculty {} attempted to modify session {} owned by {}",
            faculty_id,
            session_id,
            session.faculty_id
        );
        return Err(AttendanceError::Forbidden {
            session_id,
            faculty_id: faculty_id.clone(),
        });
    }
    Ok(session)
}

//! Exactly-once recording of NFC taps.

use crate::directory::TagDirectory;
use crate::error::AttendanceError;
use crate::model::{now, ScanOutcome, ScanRecord, SessionId, TagId};
use crate::store::ledger::{self, Append};
use crate::store::{sessions, Database};

/// Accepts tag reads and commits them to the scan ledger.
///
/// `record_scan` may be called concurrently from any number of threads or
/// processes. The session-open check and the ledger insert share one
/// immediate transaction, so a scan racing a close either lands before the
/// close (and is counted) or is rejected with
/// [`AttendanceError::SessionClosed`].
#[derive(Debug, Clone)]
pub struct ScanRecorder<D> {
    db: Database,
    directory: D,
}

impl<D: TagDirectory> ScanRecorder<D> {
    #[must_use]
    pub fn new(db: Database, directory: D) -> Self {
        Self { db, directory }
    }

    /// The tag directory used to resolve tags.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Records a tap of `tag_id` against `session_id`.
    ///
    /// The first tap by a student in a session is
    /// [`ScanOutcome::Accepted`]. Every later tap by the same student is
    /// [`ScanOutcome::Duplicate`] carrying the first tap's timestamp; it
    /// neither adds a record nor touches the existing one.
    ///
    /// # Errors
    ///
    /// - [`AttendanceError::UnknownTag`] if the tag is not bound to a student
    /// - [`AttendanceError::NotFound`] if the session does not exist
    /// - [`AttendanceError::SessionClosed`] if the session is closed
    /// - [`AttendanceError::Unavailable`] if storage stayed busy past the
    ///   timeout; retrying is safe
    pub fn record_scan(
        &self,
        tag_id: &TagId,
        session_id: SessionId,
    ) -> Result<ScanOutcome, AttendanceError> {
        let Some(student_id) = self.directory.resolve_tag(tag_id)? else {
            log::warn!("Rejected scan of unbound tag {} for session {}", tag_id, session_id);
            return Err(AttendanceError::UnknownTag(tag_id.clone()));
        };

        let outcome = self.db.write(|tx| {
            let session =
                sessions::find(tx, session_id)?.ok_or(AttendanceError::NotFound(session_id))?;
            if !session.is_open() {
                return Err(AttendanceError::SessionClosed(session_id));
            }

            let record = ScanRecord {
                session_id,
                student_id: student_id.clone(),
                recorded_at: now().max(session.opened_at),
            };

            match ledger::insert(tx, &record)? {
                Append::Inserted => Ok(ScanOutcome::Accepted {
                    student_id: record.student_id,
                    recorded_at: record.recorded_at,
                }),
                Append::AlreadyRecorded => {
                    let original = ledger::recorded_at(tx, session_id, &student_id)?
                        .ok_or(AttendanceError::Storage(rusqlite::Error::QueryReturnedNoRows))?;
                    Ok(ScanOutcome::Duplicate {
                        student_id: record.student_id,
                        original_recorded_at: original,
                    })
                }
            }
        });

        match &outcome {
            Ok(ScanOutcome::Accepted { student_id, .. }) => {
                log::info!("Accepted scan of {} in session {}", student_id, session_id);
            }
            Ok(ScanOutcome::Duplicate { student_id, .. }) => {
                log::debug!("Duplicate scan of {} in session {}", student_id, session_id);
            }
            Err(e) if e.is_rejection() => {
                log::warn!("Rejected scan of tag {}: {}", tag_id, e);
            }
            Err(e) => {
                log::error!("Failed to record scan of tag {}: {}", tag_id, e);
            }
        }
        outcome
    }
}

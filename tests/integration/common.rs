//! Shared fixtures for integration tests.

use nfc_attendance::directory::SqliteTagDirectory;
use nfc_attendance::model::{FacultyId, StudentId, TagId};
use nfc_attendance::scan::ScanRecorder;
use nfc_attendance::session::SessionManager;
use nfc_attendance::store::Database;
use rusqlite::Connection;
use std::time::Duration;
use tempfile::TempDir;

/// A fresh database with a roster of `students` students.
///
/// Student `i` is `S{i:03}` and holds tag `T{i:03}`.
pub struct Env {
    pub dir: TempDir,
    pub db: Database,
    pub manager: SessionManager,
    pub recorder: ScanRecorder<SqliteTagDirectory>,
}

impl Env {
    pub fn new(students: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db =
            Database::open_with_timeout(dir.path().join("attendance.db"), Duration::from_secs(30))
                .unwrap();
        let directory = SqliteTagDirectory::new(db.clone());
        for i in 1..=students {
            directory
                .register_student(&student(i), &format!("Student {i}"), &tag(i))
                .unwrap();
        }
        Self {
            manager: SessionManager::new(db.clone()),
            recorder: ScanRecorder::new(db.clone(), directory),
            db,
            dir,
        }
    }

    /// A second set of handles on the same file with a short busy timeout.
    pub fn impatient(&self, busy_timeout: Duration) -> (SessionManager, ScanRecorder<SqliteTagDirectory>) {
        let db = Database::open_with_timeout(self.db.path(), busy_timeout).unwrap();
        (
            SessionManager::new(db.clone()),
            ScanRecorder::new(db.clone(), SqliteTagDirectory::new(db)),
        )
    }

    /// Takes the database write lock on a separate connection and holds it
    /// until the connection is dropped or rolled back.
    pub fn hold_write_lock(&self) -> Connection {
        let conn = self.db.connect().unwrap();
        conn.execute_batch("BEGIN IMMEDIATE").unwrap();
        conn
    }

    /// Raw count of ledger rows for a session, bypassing the manager.
    pub fn ledger_rows(&self, session_id: i64) -> i64 {
        let conn = self.db.connect().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM scan_records WHERE session_id = ?1",
            [session_id],
            |row| row.get(0),
        )
        .unwrap()
    }
}

pub fn student(i: usize) -> StudentId {
    StudentId::new(&format!("S{i:03}")).unwrap()
}

pub fn tag(i: usize) -> TagId {
    TagId::new(&format!("T{i:03}")).unwrap()
}

pub fn faculty(id: &str) -> FacultyId {
    FacultyId::new(id).unwrap()
}

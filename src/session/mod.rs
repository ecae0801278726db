//! Attendance session lifecycle.
//!
//! A session starts [`Open`](crate::model::SessionState::Open), moves once to
//! [`Closed`](crate::model::SessionState::Closed), and from there can only be
//! deleted. Deletion is physical removal of the session and its scans.
//!
//! ```no_run
//! use nfc_attendance::model::FacultyId;
//! use nfc_attendance::session::SessionManager;
//! use nfc_attendance::store::Database;
//!
//! let db = Database::open("attendance.db").unwrap();
//! let manager = SessionManager::new(db);
//! let faculty = FacultyId::new("F-17").unwrap();
//!
//! let view = manager.open_session("CS101", &faculty).unwrap();
//! manager.close_session(view.id, &faculty).unwrap();
//! manager.delete_session(view.id, &faculty).unwrap();
//! ```

pub mod manager;

pub use manager::SessionManager;

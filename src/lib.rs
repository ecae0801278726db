//! NFC Attendance - session lifecycle and exactly-once scan recording
//!
//! A faculty member opens a time-bounded attendance session; students tap an
//! NFC tag to mark presence. Every tap is recorded at most once per student
//! per session, even when taps arrive in bursts from several readers or
//! several server processes, and sessions can be closed or deleted while
//! taps are still in flight.
//!
//! # Architecture
//!
//! * [`directory`]: tag-to-student lookup (read-only to the core).
//! * [`store`]: SQLite session store and scan ledger.
//! * [`session`]: the session manager, owner of every state transition.
//! * [`scan`]: the scan recorder, owner of scan record creation.
//!
//! ```no_run
//! use std::collections::HashMap;
//! use nfc_attendance::model::{FacultyId, StudentId, TagId};
//! use nfc_attendance::scan::ScanRecorder;
//! use nfc_attendance::session::SessionManager;
//! use nfc_attendance::store::Database;
//!
//! let db = Database::open("attendance.db").unwrap();
//! let mut tags = HashMap::new();
//! tags.insert(TagId::new("04A1B2C3").unwrap(), StudentId::new("S001").unwrap());
//!
//! let manager = SessionManager::new(db.clone());
//! let recorder = ScanRecorder::new(db, tags);
//!
//! let faculty = FacultyId::new("F-17").unwrap();
//! let session = manager.open_session("CS101", &faculty).unwrap();
//! let outcome = recorder
//!     .record_scan(&TagId::new("04a1b2c3").unwrap(), session.id)
//!     .unwrap();
//! assert!(outcome.is_accepted());
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod directory;
pub mod error;
pub mod logging;
pub mod model;
pub mod output;
pub mod scan;
pub mod session;
pub mod store;

pub use app::run_app;
pub use error::AttendanceError;

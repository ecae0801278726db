//! Scan recording.
//!
//! A tag read flows through three steps:
//!
//! 1. The [`TagDirectory`](crate::directory::TagDirectory) resolves the tag to
//!    a student.
//! 2. The session is loaded and must be open.
//! 3. A scan record is inserted under the ledger's `(session, student)`
//!    primary key. A key violation means the student was already recorded
//!    and is reported as a duplicate, not an error.
//!
//! Steps 2 and 3 run in one write transaction.

pub mod recorder;

pub use recorder::ScanRecorder;

//! Rendering of command results as text or JSON.
//!
//! Text output is colored with `yansi`; coloring is switched off globally by
//! `--no-color`. JSON output is pretty-printed with camelCase keys matching
//! the core's external field names.

use std::io::{self, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use yansi::Paint;

use crate::cli::OutputFormat;
use crate::directory::Student;
use crate::model::{ScanOutcome, ScanRecord, SessionId, SessionState, SessionView, StudentId};

/// JSON body reported after a delete.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Deleted {
    session_id: SessionId,
    scans_removed: usize,
}

/// JSON body reported after a roster removal.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RemovedStudent<'a> {
    student_id: &'a StudentId,
    removed: bool,
}

/// Writes command results in the configured format.
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    format: OutputFormat,
}

impl Printer {
    #[must_use]
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// A single session.
    pub fn session(&self, out: &mut impl Write, view: &SessionView) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => write_json(out, view),
            OutputFormat::Text => write_session_line(out, view),
        }
    }

    /// A list of sessions.
    pub fn sessions(&self, out: &mut impl Write, views: &[SessionView]) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => write_json(out, views),
            OutputFormat::Text => {
                if views.is_empty() {
                    writeln!(out, "No sessions.")?;
                }
                for view in views {
                    write_session_line(out, view)?;
                }
                Ok(())
            }
        }
    }

    /// Outcome of a tap.
    pub fn scan(&self, out: &mut impl Write, outcome: &ScanOutcome) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => write_json(out, outcome),
            OutputFormat::Text => match outcome {
                ScanOutcome::Accepted {
                    student_id,
                    recorded_at,
                } => writeln!(
                    out,
                    "{} {} at {}",
                    "ACCEPTED".green().bold(),
                    student_id,
                    timestamp(recorded_at)
                ),
                ScanOutcome::Duplicate {
                    student_id,
                    original_recorded_at,
                } => writeln!(
                    out,
                    "{} {} already recorded at {}",
                    "DUPLICATE".yellow().bold(),
                    student_id,
                    timestamp(original_recorded_at)
                ),
            },
        }
    }

    /// Result of a delete.
    pub fn deleted(
        &self,
        out: &mut impl Write,
        session_id: SessionId,
        scans_removed: usize,
    ) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => write_json(
                out,
                &Deleted {
                    session_id,
                    scans_removed,
                },
            ),
            OutputFormat::Text => writeln!(
                out,
                "Deleted session {} ({} scan record(s) removed)",
                session_id, scans_removed
            ),
        }
    }

    /// Result of removing a student from the roster.
    pub fn removed_student(&self, out: &mut impl Write, student_id: &StudentId) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => write_json(
                out,
                &RemovedStudent {
                    student_id,
                    removed: true,
                },
            ),
            OutputFormat::Text => writeln!(out, "Removed student {}", student_id),
        }
    }

    /// Attendance list of a session.
    pub fn attendance(&self, out: &mut impl Write, records: &[ScanRecord]) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => write_json(out, records),
            OutputFormat::Text => {
                if records.is_empty() {
                    writeln!(out, "No scans recorded.")?;
                }
                for record in records {
                    writeln!(
                        out,
                        "{:<16} {}",
                        record.student_id.as_str(),
                        timestamp(&record.recorded_at)
                    )?;
                }
                Ok(())
            }
        }
    }

    /// A single roster entry.
    pub fn student(&self, out: &mut impl Write, student: &Student) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => write_json(out, student),
            OutputFormat::Text => write_student_line(out, student),
        }
    }

    /// The whole roster.
    pub fn students(&self, out: &mut impl Write, students: &[Student]) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => write_json(out, students),
            OutputFormat::Text => {
                if students.is_empty() {
                    writeln!(out, "No students registered.")?;
                }
                for student in students {
                    write_student_line(out, student)?;
                }
                Ok(())
            }
        }
    }
}

fn write_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}

fn write_session_line(out: &mut impl Write, view: &SessionView) -> io::Result<()> {
    let label = view.state.as_str();
    let state = match view.state {
        SessionState::Open => label.green(),
        SessionState::Closed => label.red(),
    };
    write!(
        out,
        "#{} {} [{}] scans={} opened={}",
        view.id,
        view.subject.bold(),
        state,
        view.scan_count,
        timestamp(&view.opened_at)
    )?;
    if let Some(closed_at) = &view.closed_at {
        write!(out, " closed={}", timestamp(closed_at))?;
    }
    writeln!(out)
}

fn write_student_line(out: &mut impl Write, student: &Student) -> io::Result<()> {
    writeln!(
        out,
        "{:<16} {:<20} {}",
        student.student_id.as_str(),
        student.tag_id.as_str(),
        student.name
    )
}

fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

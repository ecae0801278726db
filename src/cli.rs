//! Command-line interface definitions for nfc-attendance.
//!
//! The binary is a thin operator surface over the attendance core: faculty
//! commands (`open`, `close`, `delete`, `list`), the tap entry point (`scan`),
//! read-only queries (`show`, `attendees`) and roster maintenance for the
//! tag directory (`roster`).
//!
//! # Example
//!
//! ```bash
//! # Bind a tag to a student
//! nfc-attendance roster add S001 04A1B2C3 --name "Ada Lovelace"
//!
//! # Open a session and record a tap
//! nfc-attendance open --faculty F-17 CS101
//! nfc-attendance scan --session 1 04a1b2c3
//!
//! # Close and delete it, printing JSON
//! nfc-attendance --output json close --faculty F-17 1
//! nfc-attendance delete --faculty F-17 1
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::model::{FacultyId, SessionId, StudentId, TagId};

/// NFC tap attendance: open sessions, record taps exactly once, close and delete.
#[derive(Debug, Parser)]
#[command(name = "nfc-attendance")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Report errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (TOML). Defaults to the platform config directory.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Attendance database file, overriding the configuration
    #[arg(long, global = true, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Output format, overriding the configuration
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Open a new attendance session
    Open(OpenArgs),
    /// Close an open session; no further taps are accepted
    Close(SessionActionArgs),
    /// Delete a closed session and all of its scans
    Delete(SessionActionArgs),
    /// Record a tag tap against a session
    Scan(ScanArgs),
    /// Show a session with its current scan count
    Show(SessionArg),
    /// List sessions owned by a faculty member
    List(ListArgs),
    /// List the students recorded in a session
    Attendees(SessionArg),
    /// Maintain tag-to-student bindings
    #[command(subcommand)]
    Roster(RosterCommand),
    /// Print the effective configuration as TOML
    Config,
}

/// Arguments for the open subcommand.
#[derive(Debug, Args)]
pub struct OpenArgs {
    /// Faculty identity that will own the session
    #[arg(long, value_name = "FACULTY_ID")]
    pub faculty: FacultyId,

    /// Subject or class label
    #[arg(value_name = "SUBJECT")]
    pub subject: String,
}

/// Arguments for close and delete.
#[derive(Debug, Args)]
pub struct SessionActionArgs {
    /// Faculty identity; must own the session
    #[arg(long, value_name = "FACULTY_ID")]
    pub faculty: FacultyId,

    /// Session identifier
    #[arg(value_name = "SESSION_ID")]
    pub session: SessionId,
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Session to record the tap against
    #[arg(long, value_name = "SESSION_ID")]
    pub session: SessionId,

    /// Tag identifier as reported by the reader
    #[arg(value_name = "TAG_ID")]
    pub tag: TagId,
}

/// A single session identifier.
#[derive(Debug, Args)]
pub struct SessionArg {
    /// Session identifier
    #[arg(value_name = "SESSION_ID")]
    pub session: SessionId,
}

/// Arguments for the list subcommand.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Faculty identity whose sessions to list
    #[arg(long, value_name = "FACULTY_ID")]
    pub faculty: FacultyId,

    /// Only list sessions that are still open
    #[arg(long)]
    pub open: bool,
}

/// Roster subcommands.
#[derive(Debug, Subcommand)]
pub enum RosterCommand {
    /// Bind a tag to a student (re-binds if the student exists)
    Add {
        /// Student identifier
        #[arg(value_name = "STUDENT_ID")]
        student: StudentId,
        /// Tag identifier
        #[arg(value_name = "TAG_ID")]
        tag: TagId,
        /// Display name
        #[arg(long, default_value = "")]
        name: String,
    },
    /// Remove a student and their tag binding
    Remove {
        /// Student identifier
        #[arg(value_name = "STUDENT_ID")]
        student: StudentId,
    },
    /// List registered students
    List,
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

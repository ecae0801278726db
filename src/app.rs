//! Command dispatch for the `nfc-attendance` binary.

use std::io::{self, Write};

use anyhow::{Context, Result};

use crate::cli::{Cli, Commands, RosterCommand};
use crate::config::Config;
use crate::directory::SqliteTagDirectory;
use crate::error::ExitCode;
use crate::logging::init_logging;
use crate::output::Printer;
use crate::scan::ScanRecorder;
use crate::session::SessionManager;
use crate::store::Database;

/// Run the application with parsed arguments, writing results to stdout.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the database cannot be
/// opened, or the command is rejected. Attendance errors are carried inside
/// the `anyhow::Error` so [`ExitCode::for_error`] can classify them.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let config = Config::load(cli.config.as_deref())?.with_overrides(cli.database, cli.output);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(cli.command, &config, &mut out)?;
    out.flush()?;
    Ok(ExitCode::Success)
}

/// Execute a single command against the configured database.
///
/// # Errors
///
/// See [`run_app`].
pub fn execute(command: Commands, config: &Config, out: &mut impl Write) -> Result<()> {
    let printer = Printer::new(config.output);

    match command {
        Commands::Open(args) => {
            let view = SessionManager::new(open_database(config)?)
                .open_session(&args.subject, &args.faculty)?;
            printer.session(out, &view)?;
        }
        Commands::Close(args) => {
            let view = SessionManager::new(open_database(config)?)
                .close_session(args.session, &args.faculty)?;
            printer.session(out, &view)?;
        }
        Commands::Delete(args) => {
            let removed = SessionManager::new(open_database(config)?)
                .delete_session(args.session, &args.faculty)?;
            printer.deleted(out, args.session, removed)?;
        }
        Commands::Scan(args) => {
            let db = open_database(config)?;
            let recorder = ScanRecorder::new(db.clone(), SqliteTagDirectory::new(db));
            let outcome = recorder.record_scan(&args.tag, args.session)?;
            printer.scan(out, &outcome)?;
        }
        Commands::Show(args) => {
            let view = SessionManager::new(open_database(config)?).get_session(args.session)?;
            printer.session(out, &view)?;
        }
        Commands::List(args) => {
            let views = SessionManager::new(open_database(config)?)
                .list_sessions(&args.faculty, args.open)?;
            printer.sessions(out, &views)?;
        }
        Commands::Attendees(args) => {
            let records = SessionManager::new(open_database(config)?).attendance(args.session)?;
            printer.attendance(out, &records)?;
        }
        Commands::Roster(roster) => {
            let directory = SqliteTagDirectory::new(open_database(config)?);
            match roster {
                RosterCommand::Add { student, tag, name } => {
                    let student = directory.register_student(&student, &name, &tag)?;
                    printer.student(out, &student)?;
                }
                RosterCommand::Remove { student } => {
                    directory.remove_student(&student)?;
                    printer.removed_student(out, &student)?;
                }
                RosterCommand::List => {
                    let students = directory.list_students()?;
                    printer.students(out, &students)?;
                }
            }
        }
        Commands::Config => {
            write!(out, "{}", config.to_toml()?)?;
        }
    }
    Ok(())
}

fn open_database(config: &Config) -> Result<Database> {
    Database::open_with_timeout(&config.database_path, config.busy_timeout()).with_context(|| {
        format!(
            "Failed to open attendance database: {}",
            config.database_path.display()
        )
    })
}

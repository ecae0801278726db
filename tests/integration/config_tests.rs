//! Integration tests for layered configuration: defaults, TOML file,
//! environment variables and CLI overrides.

use nfc_attendance::cli::OutputFormat;
use nfc_attendance::config::{Config, ENV_PREFIX};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::tempdir;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Clear all NFC_ATTENDANCE_* environment variables to avoid interference.
fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with(ENV_PREFIX) {
            std::env::remove_var(key);
        }
    }
}

#[test]
fn test_config_missing_file_uses_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();

    let config = Config::load_from_path(dir.path().join("nonexistent.toml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_load_from_toml() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
database_path = "/srv/attendance/attendance.db"
busy_timeout_ms = 1500
output = "json"
"#,
    )
    .unwrap();

    let config = Config::load_from_path(&path).unwrap();
    assert_eq!(
        config.database_path,
        PathBuf::from("/srv/attendance/attendance.db")
    );
    assert_eq!(config.busy_timeout_ms, 1500);
    assert_eq!(config.output, OutputFormat::Json);
}

#[test]
fn test_config_partial_toml_keeps_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "busy_timeout_ms = 250\n").unwrap();

    let config = Config::load_from_path(&path).unwrap();
    assert_eq!(config.busy_timeout_ms, 250);
    assert_eq!(config.output, OutputFormat::Text);
    assert_eq!(config.database_path, Config::default().database_path);
}

#[test]
fn test_env_overrides_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "busy_timeout_ms = 250\noutput = \"text\"\n").unwrap();

    std::env::set_var("NFC_ATTENDANCE_BUSY_TIMEOUT_MS", "9000");
    std::env::set_var("NFC_ATTENDANCE_OUTPUT", "json");
    let config = Config::load_from_path(&path).unwrap();
    clear_env();

    assert_eq!(config.busy_timeout_ms, 9000);
    assert_eq!(config.output, OutputFormat::Json);
}

#[test]
fn test_cli_overrides_env() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();

    std::env::set_var("NFC_ATTENDANCE_DATABASE_PATH", "/from/env.db");
    let config = Config::load_from_path(dir.path().join("none.toml"))
        .unwrap()
        .with_overrides(Some(PathBuf::from("/from/cli.db")), None);
    clear_env();

    assert_eq!(config.database_path, PathBuf::from("/from/cli.db"));
}

#[test]
fn test_malformed_toml_is_an_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "busy_timeout_ms = \"soon\"\n").unwrap();

    let err = Config::load_from_path(&path).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to load configuration"));
}

#[test]
fn test_zero_timeout_is_an_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "busy_timeout_ms = 0\n").unwrap();

    let err = Config::load_from_path(&path).unwrap_err();
    assert!(err.to_string().contains("busy_timeout_ms"));
}

#[test]
fn test_timeout_beyond_sqlite_limit_is_an_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "busy_timeout_ms = 3000000000\n").unwrap();

    assert!(Config::load_from_path(&path).is_err());
}

#[test]
fn test_bad_env_override_never_redirects_database() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "database_path = \"/srv/prod/attendance.db\"\n").unwrap();

    std::env::set_var("NFC_ATTENDANCE_BUSY_TIMEOUT_MS", "5s");
    let result = Config::load_from_path(&path);
    clear_env();

    // The load must fail outright rather than fall back to the default
    // database location.
    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("Failed to load configuration"));
}

#[test]
fn test_toml_round_trip_through_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let config = Config {
        database_path: dir.path().join("a.db"),
        busy_timeout_ms: 42,
        output: OutputFormat::Json,
    };
    fs::write(&path, config.to_toml().unwrap()).unwrap();

    assert_eq!(Config::load_from_path(&path).unwrap(), config);
}

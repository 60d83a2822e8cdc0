use crate::models::config::Config;
use crate::models::error::{BackupError, Result};
use log::{info, warn};
use std::fs;
use std::path::Path;

/// Validates the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    info!("Validating configuration...");

    validate_numeric_values(config)?;

    if config.backup_type.trim().is_empty() {
        return Err(BackupError::ConfigInvalid(
            "backup_type cannot be empty".to_string(),
        ));
    }

    validate_database_path(&config.database_file)?;

    if let Some(log_directory) = &config.log_directory {
        validate_log_directory(log_directory)?;
    }

    check_conflicting_flags(config);

    info!("Configuration validation passed");
    Ok(())
}

fn validate_numeric_values(config: &Config) -> Result<()> {
    if config.history_page_size == 0 {
        return Err(BackupError::ConfigInvalid(
            "history_page_size must be greater than 0".to_string(),
        ));
    }

    if config.history_page_size > 1000 {
        warn!(
            "history_page_size ({}) is very large; the history view may be slow to render",
            config.history_page_size
        );
    }

    Ok(())
}

/// Validate database file path
fn validate_database_path(db_file: &str) -> Result<()> {
    if db_file.is_empty() {
        return Err(BackupError::ConfigInvalid(
            "database_file cannot be empty. Provide a path or use ':memory:'".to_string(),
        ));
    }

    if db_file == ":memory:" {
        warn!("Using in-memory database, backup history will not survive a restart");
        return Ok(());
    }

    let path = Path::new(db_file);

    if path.exists() {
        if !path.is_file() {
            return Err(BackupError::ConfigInvalid(format!(
                "Database path exists but is not a file: {}",
                db_file
            )));
        }

        if let Err(e) = fs::OpenOptions::new().read(true).write(true).open(path) {
            return Err(BackupError::ConfigInvalid(format!(
                "Database file is not readable/writable: {}\nError: {}",
                db_file, e
            )));
        }
    } else if let Some(parent) = path.parent() {
        // The history store creates missing parent directories itself
        if !parent.as_os_str().is_empty() && parent.exists() {
            if let Err(e) = check_writable(parent) {
                return Err(BackupError::ConfigInvalid(format!(
                    "Database parent directory is not writable: {}\nError: {}",
                    db_file, e
                )));
            }
        }
    }

    Ok(())
}

fn validate_log_directory(log_directory: &str) -> Result<()> {
    if log_directory.trim().is_empty() {
        return Err(BackupError::ConfigInvalid(
            "log_directory cannot be empty when set".to_string(),
        ));
    }

    let path = Path::new(log_directory);
    if path.exists() && !path.is_dir() {
        return Err(BackupError::ConfigInvalid(format!(
            "log_directory exists but is not a directory: {}",
            log_directory
        )));
    }

    Ok(())
}

fn check_conflicting_flags(config: &Config) {
    if config.verify_hashes {
        info!("verify_hashes is enabled - every copied file will be read twice during validation");
    }

    if config.record_failed_runs && config.database_file == ":memory:" {
        warn!("record_failed_runs is enabled but the history is kept in memory only");
    }
}

/// Check if a directory is writable by attempting to create a temporary file
fn check_writable(path: &Path) -> std::io::Result<()> {
    let test_file = path.join(".rustytreebackup_write_test");

    fs::write(&test_file, b"test")?;
    fs::remove_file(&test_file)?;

    Ok(())
}

use crate::models::config_validator::validate_config;
use crate::models::error::{BackupError, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_database_file")]
    pub database_file: String,
    #[serde(default)]
    pub log_directory: Option<String>,
    #[serde(default = "default_history_page_size")]
    pub history_page_size: usize,
    #[serde(default = "default_backup_type")]
    pub backup_type: String,
    #[serde(default = "bool_false")]
    pub verify_hashes: bool,
    #[serde(default = "bool_false")]
    pub check_free_space: bool,
    #[serde(default = "bool_false")]
    pub record_failed_runs: bool,
}

fn default_database_file() -> String {
    "data/backup_history.db".to_string()
}
const fn default_history_page_size() -> usize {
    10
}
fn default_backup_type() -> String {
    "Full Backup".to_string()
}
const fn bool_false() -> bool {
    false
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_file: default_database_file(),
            log_directory: None,
            history_page_size: default_history_page_size(),
            backup_type: default_backup_type(),
            verify_hashes: false,
            check_free_space: false,
            record_failed_runs: false,
        }
    }
}

pub fn setup_config(config_file: &str) -> Result<Config> {
    let config_path = PathBuf::from(config_file);
    info!("Loading config from: {}", config_path.display());

    let config_str = fs::read_to_string(&config_path).map_err(|cause| {
        BackupError::ConfigRead {
            path: config_path.clone(),
            cause,
        }
    })?;

    let config: Config = serde_json::from_str(&config_str).map_err(|cause| {
        BackupError::ConfigParse {
            path: config_path,
            cause,
        }
    })?;

    validate_config(&config)?;

    Ok(config)
}

/// The `log_directory` of a config file, read without logging or validation so
/// the logger can be installed before the config is loaded.
pub fn read_log_directory(config_file: &str) -> Option<String> {
    let config_str = fs::read_to_string(config_file).ok()?;
    serde_json::from_str::<Config>(&config_str)
        .ok()?
        .log_directory
}

/// Like `setup_config`, but a missing file yields the built-in defaults.
pub fn setup_config_or_default(config_file: &str) -> Result<Config> {
    match setup_config(config_file) {
        Err(BackupError::ConfigRead { path, cause })
            if cause.kind() == std::io::ErrorKind::NotFound =>
        {
            warn!(
                "Config file {} not found, using default configuration",
                path.display()
            );
            let config = Config::default();
            validate_config(&config)?;
            Ok(config)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_load_valid_config_with_all_fields() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("history.db");
        let log_dir = temp_dir.path().join("logs");

        let config_content = format!(
            r#"{{
            "database_file": "{}",
            "log_directory": "{}",
            "history_page_size": 25,
            "backup_type": "Migration Backup",
            "verify_hashes": true,
            "check_free_space": true,
            "record_failed_runs": true
        }}"#,
            db_path.to_str().unwrap().replace('\\', "\\\\"),
            log_dir.to_str().unwrap().replace('\\', "\\\\")
        );
        let temp_file = write_config(&config_content);

        let config = setup_config(temp_file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.database_file, db_path.to_str().unwrap());
        assert_eq!(config.log_directory.as_deref(), log_dir.to_str());
        assert_eq!(config.history_page_size, 25);
        assert_eq!(config.backup_type, "Migration Backup");
        assert!(config.verify_hashes);
        assert!(config.check_free_space);
        assert!(config.record_failed_runs);
    }

    #[test]
    fn test_load_config_with_defaults() {
        let temp_file = write_config(r#"{ "database_file": ":memory:" }"#);

        let config = setup_config(temp_file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.database_file, ":memory:");
        assert_eq!(config.log_directory, None);
        assert_eq!(config.history_page_size, 10);
        assert_eq!(config.backup_type, "Full Backup");
        assert!(!config.verify_hashes);
        assert!(!config.check_free_space);
        assert!(!config.record_failed_runs);
    }

    #[test]
    fn test_error_on_missing_config_file() {
        let result = setup_config("/this/does/not/exist/config.json");

        match result {
            Err(BackupError::ConfigRead { .. }) => {}
            _ => panic!("Expected ConfigRead error"),
        }
    }

    #[test]
    fn test_missing_config_file_falls_back_to_defaults() {
        let config = setup_config_or_default("/this/does/not/exist/config.json").unwrap();
        assert_eq!(config.history_page_size, 10);
        assert_eq!(config.database_file, "data/backup_history.db");
    }

    #[test]
    fn test_read_log_directory() {
        let with_logs = write_config(r#"{ "log_directory": "/var/log/backups" }"#);
        let without_logs = write_config(r#"{ "database_file": ":memory:" }"#);
        let broken = write_config(r#"{ "log_directory": "#);

        assert_eq!(
            read_log_directory(with_logs.path().to_str().unwrap()).as_deref(),
            Some("/var/log/backups")
        );
        assert_eq!(read_log_directory(without_logs.path().to_str().unwrap()), None);
        assert_eq!(read_log_directory(broken.path().to_str().unwrap()), None);
        assert_eq!(read_log_directory("/this/does/not/exist/config.json"), None);
    }

    #[test]
    fn test_error_on_invalid_json() {
        let temp_file = write_config(r#"{ "database_file": ":memory:", "#);

        match setup_config(temp_file.path().to_str().unwrap()) {
            Err(BackupError::ConfigParse { .. }) => {}
            _ => panic!("Expected ConfigParse error"),
        }
    }

    #[test]
    fn test_invalid_values_are_rejected_after_parsing() {
        let temp_file =
            write_config(r#"{ "database_file": ":memory:", "history_page_size": 0 }"#);

        match setup_config(temp_file.path().to_str().unwrap()) {
            Err(BackupError::ConfigInvalid(message)) => {
                assert!(message.contains("history_page_size"))
            }
            _ => panic!("Expected ConfigInvalid error"),
        }
    }
}

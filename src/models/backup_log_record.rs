use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Status column of the history table. Stored with the labels the history
/// view has always shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BackupStatus {
    InProgress,
    Completed,
    Partial,
    Failed,
    Interrupted,
}

impl BackupStatus {
    pub fn label(&self) -> &'static str {
        match self {
            BackupStatus::InProgress => "Em progresso",
            BackupStatus::Completed => "Concluído",
            BackupStatus::Partial => "Parcial",
            BackupStatus::Failed => "Falha",
            BackupStatus::Interrupted => "Interrompido",
        }
    }
}

impl fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BackupStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Em progresso" => Ok(BackupStatus::InProgress),
            "Concluído" => Ok(BackupStatus::Completed),
            "Parcial" => Ok(BackupStatus::Partial),
            "Falha" => Ok(BackupStatus::Failed),
            "Interrompido" => Ok(BackupStatus::Interrupted),
            other => Err(format!("unknown backup status '{}'", other)),
        }
    }
}

/// One row of the backup history. `backup_id` is assigned by the store and
/// ignored on insert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupLogRecord {
    pub backup_id: i64,
    pub user_id: i64,
    pub backup_type: String,
    pub ticket_number: Option<String>,
    pub start_time: DateTime<Local>,
    pub end_time: Option<DateTime<Local>>,
    pub duration: Option<f64>,
    pub source_path: Option<String>,
    pub destination_path: Option<String>,
    pub total_size: Option<u64>,
    pub total_files: Option<u64>,
    pub copied_files: Option<u64>,
    pub status: BackupStatus,
}

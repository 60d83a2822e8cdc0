use crate::models::error::ErrorKind;
use serde::Serialize;

/// Everything the pipeline reports to its listeners, in the order it happens.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BackupEvent {
    Started,
    CheckingConnectivity,
    EnvironmentReady,
    CountingFiles {
        total_files: u64,
        total_bytes: u64,
    },
    CopyingFiles,
    ProgressUpdate {
        progress_percent: u8,
        files_copied: u64,
        total_files: u64,
    },
    Validating,
    Completed {
        duration_seconds: f64,
        total_files: u64,
        total_bytes: u64,
    },
    /// Published after `Completed` once the run has been written to the history.
    HistoryRecorded {
        backup_id: i64,
    },
    Error {
        error_kind: ErrorKind,
        message: String,
    },
}

impl BackupEvent {
    pub fn error(error_kind: ErrorKind, message: impl Into<String>) -> Self {
        BackupEvent::Error {
            error_kind,
            message: message.into(),
        }
    }

    /// Short name used in log lines and JSON output.
    pub fn name(&self) -> &'static str {
        match self {
            BackupEvent::Started => "started",
            BackupEvent::CheckingConnectivity => "checking_connectivity",
            BackupEvent::EnvironmentReady => "environment_ready",
            BackupEvent::CountingFiles { .. } => "counting_files",
            BackupEvent::CopyingFiles => "copying_files",
            BackupEvent::ProgressUpdate { .. } => "progress_update",
            BackupEvent::Validating => "validating",
            BackupEvent::Completed { .. } => "completed",
            BackupEvent::HistoryRecorded { .. } => "history_recorded",
            BackupEvent::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_event_tag() {
        let event = BackupEvent::ProgressUpdate {
            progress_percent: 50,
            files_copied: 1,
            total_files: 2,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "progress_update");
        assert_eq!(json["progress_percent"], 50);
        assert_eq!(json["files_copied"], 1);
    }

    #[test]
    fn test_error_event_carries_kind() {
        let event = BackupEvent::error(ErrorKind::SourceNotFound, "missing");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "error");
        assert_eq!(json["error_kind"], "source_not_found");
        assert_eq!(json["message"], "missing");
        assert_eq!(event.name(), "error");
    }
}

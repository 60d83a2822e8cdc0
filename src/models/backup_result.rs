use crate::models::error::ErrorKind;
use serde::Serialize;

/// Counters accumulated over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackupMetrics {
    pub total_files: u64,
    pub total_bytes: u64,
    pub copied_files: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome of `BackupOrchestrator::run`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupResult {
    pub success: bool,
    pub metrics: BackupMetrics,
    pub duration_seconds: f64,
    pub error: Option<ErrorInfo>,
    /// History row written for this run, if any.
    pub backup_id: Option<i64>,
}

#[cfg(test)]
impl BackupResult {
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|error| error.kind)
    }
}

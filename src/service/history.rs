use crate::models::backup_log_record::BackupLogRecord;
use crate::models::error::StorageError;

/// Append-only store of finished runs.
pub trait HistoryRecorder: Send + Sync {
    /// Persist `entry` and return the id the store assigned to it.
    fn record(&self, entry: &BackupLogRecord) -> Result<i64, StorageError>;

    /// Up to `limit` records, newest first.
    fn list_recent(&self, limit: usize) -> Result<Vec<BackupLogRecord>, StorageError>;
}

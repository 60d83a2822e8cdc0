use crate::models::backup_event::BackupEvent;
use crate::models::backup_log_record::BackupLogRecord;
use crate::models::error::{ListenerError, StorageError};
use crate::service::event_bus::BackupListener;
use crate::service::history::HistoryRecorder;
use std::fs;
use std::sync::Mutex;
use tempfile::TempDir;

/// Listener that keeps every event it sees.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<BackupEvent>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<BackupEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl BackupListener for RecordingListener {
    fn on_event(&self, event: &BackupEvent) -> Result<(), ListenerError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// `a.txt` (10 bytes) and `sub/b.txt` (20 bytes).
pub fn sample_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), b"0123456789").unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/b.txt"), b"abcdefghijklmnopqrst").unwrap();
    dir
}

/// History store kept in a vector, ids starting at 1.
#[derive(Default)]
pub struct MemoryHistory {
    records: Mutex<Vec<BackupLogRecord>>,
}

impl MemoryHistory {
    pub fn records(&self) -> Vec<BackupLogRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl HistoryRecorder for MemoryHistory {
    fn record(&self, entry: &BackupLogRecord) -> Result<i64, StorageError> {
        let mut records = self.records.lock().unwrap();
        let mut stored = entry.clone();
        stored.backup_id = records.len() as i64 + 1;
        records.push(stored);
        Ok(records.len() as i64)
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<BackupLogRecord>, StorageError> {
        let records = self.records.lock().unwrap();
        Ok(records.iter().rev().take(limit).cloned().collect())
    }
}

use crate::models::backup_event::BackupEvent;
use crate::models::error::ListenerError;
use crate::service::event_bus::BackupListener;
use crate::utils::progress::{format_bytes, format_duration};
use log::{debug, error, info, warn};
use std::sync::Mutex;
use tokio::sync::broadcast;

/// Writes the run's events to the log. Per-file progress and the events the
/// orchestrator already logs with more detail go to `debug`.
#[derive(Debug, Default)]
pub struct LogListener;

impl BackupListener for LogListener {
    fn on_event(&self, event: &BackupEvent) -> Result<(), ListenerError> {
        match event {
            BackupEvent::Started => debug!("Backup started"),
            BackupEvent::CheckingConnectivity => info!("Checking source and destination"),
            BackupEvent::EnvironmentReady => info!("Source and destination are ready"),
            BackupEvent::CountingFiles {
                total_files: 0,
                total_bytes: 0,
            } => debug!("Counting files"),
            BackupEvent::CountingFiles {
                total_files,
                total_bytes,
            } => info!(
                "Counted {} files ({})",
                total_files,
                format_bytes(*total_bytes)
            ),
            BackupEvent::CopyingFiles => info!("Copying files"),
            BackupEvent::ProgressUpdate {
                progress_percent,
                files_copied,
                total_files,
            } => debug!(
                "Progress: {}% ({}/{} files)",
                progress_percent, files_copied, total_files
            ),
            BackupEvent::Validating => info!("Validating copied files"),
            BackupEvent::Completed {
                duration_seconds,
                total_files,
                total_bytes,
            } => info!(
                "Backup completed in {}: {} files, {}",
                format_duration(*duration_seconds),
                total_files,
                format_bytes(*total_bytes)
            ),
            BackupEvent::HistoryRecorded { backup_id } => {
                debug!("Backup saved to history as #{}", backup_id)
            }
            BackupEvent::Error {
                error_kind,
                message,
            } => {
                if error_kind.is_fatal() {
                    error!("[{}] {}", error_kind, message)
                } else {
                    warn!("[{}] {}", error_kind, message)
                }
            }
        }
        Ok(())
    }
}

/// Fans events out to subscribers on other threads. Subscribers whose
/// receiver has been dropped are forgotten on the next event.
pub struct EventChannel {
    subscribers: Mutex<Vec<broadcast::Sender<BackupEvent>>>,
    capacity: usize,
}

impl EventChannel {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            capacity,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BackupEvent> {
        let (tx, rx) = broadcast::channel(self.capacity);
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl BackupListener for EventChannel {
    fn on_event(&self, event: &BackupEvent) -> Result<(), ListenerError> {
        let mut subscribers = self
            .subscribers
            .lock()
            .map_err(|e| ListenerError(format!("subscriber list poisoned: {}", e)))?;
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        Ok(())
    }
}

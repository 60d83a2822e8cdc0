use crate::models::backup_event::BackupEvent;
use crate::models::backup_log_record::{BackupLogRecord, BackupStatus};
use crate::models::backup_request::BackupRequest;
use crate::models::backup_result::{BackupMetrics, BackupResult, ErrorInfo};
use crate::models::config::Config;
use crate::models::error::{Cancelled, EnvironmentError, ErrorKind};
use crate::service::copy::{copy_tree, CopyReport};
use crate::service::enumerate::count_files;
use crate::service::environment::{check_free_space, validate_environment};
use crate::service::event_bus::{EventBus, ListenerHandle};
use crate::service::history::HistoryRecorder;
use crate::service::validate::validate_copy;
use crate::session::StopSignal;
use chrono::{DateTime, Local};
use log::{debug, info, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// Knobs taken from the configuration file.
#[derive(Debug, Clone)]
pub struct BackupOptions {
    pub backup_type: String,
    pub verify_hashes: bool,
    pub check_free_space: bool,
    pub record_failed_runs: bool,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl BackupOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            backup_type: config.backup_type.clone(),
            verify_hashes: config.verify_hashes,
            check_free_space: config.check_free_space,
            record_failed_runs: config.record_failed_runs,
        }
    }
}

/// Where the orchestrator is in the current (or last) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupState {
    Idle,
    Started,
    CheckingConnectivity,
    EnvironmentReady,
    CountingFiles,
    CopyingFiles,
    Validating,
    Completed,
    Failed,
}

/// Terminal failure of a run, already classified.
struct RunFailure {
    kind: ErrorKind,
    message: String,
}

impl RunFailure {
    /// A panic inside one of the stages.
    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|detail| detail.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "no details".to_string());
        RunFailure {
            kind: ErrorKind::Unknown,
            message: format!("Unexpected internal error: {}", detail),
        }
    }
}

impl From<EnvironmentError> for RunFailure {
    fn from(e: EnvironmentError) -> Self {
        RunFailure {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl From<Cancelled> for RunFailure {
    fn from(e: Cancelled) -> Self {
        RunFailure {
            kind: ErrorKind::Cancelled,
            message: e.to_string(),
        }
    }
}

/// Drives one backup at a time through environment check, counting,
/// copying and validation, reporting every step on its event bus.
pub struct BackupOrchestrator {
    bus: EventBus,
    options: BackupOptions,
    stop_signal: StopSignal,
    history: Option<Arc<dyn HistoryRecorder>>,
    state: BackupState,
}

impl BackupOrchestrator {
    pub fn new(
        options: BackupOptions,
        stop_signal: StopSignal,
        history: Option<Arc<dyn HistoryRecorder>>,
    ) -> Self {
        Self {
            bus: EventBus::new(),
            options,
            stop_signal,
            history,
            state: BackupState::Idle,
        }
    }

    pub fn attach(&mut self, listener: ListenerHandle) -> bool {
        self.bus.attach(listener)
    }

    pub fn detach(&mut self, listener: &ListenerHandle) -> bool {
        self.bus.detach(listener)
    }

    pub fn state(&self) -> BackupState {
        self.state
    }

    /// Run a full backup of `request`. Blocks until the run has completed or
    /// failed; the outcome is also reported as events.
    pub fn run(&mut self, request: &BackupRequest) -> BackupResult {
        let started_at = Local::now();
        let timer = Instant::now();
        let mut metrics = BackupMetrics::default();

        self.transition(BackupState::Started);
        info!(
            "Starting backup of {} to {}",
            request.source_path().display(),
            request.destination_path().display()
        );
        self.bus.publish(&BackupEvent::Started);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.execute(request, &mut metrics)))
            .unwrap_or_else(|payload| Err(RunFailure::from_panic(payload)));

        match outcome {
            Ok(report) => {
                let duration_seconds = timer.elapsed().as_secs_f64();
                self.transition(BackupState::Completed);
                debug!(
                    "Backup completed: {} of {} files copied in {:.2}s",
                    metrics.copied_files, metrics.total_files, duration_seconds
                );
                self.bus.publish(&BackupEvent::Completed {
                    duration_seconds,
                    total_files: metrics.total_files,
                    total_bytes: metrics.total_bytes,
                });

                let status = if report.files_failed > 0 {
                    BackupStatus::Partial
                } else {
                    BackupStatus::Completed
                };
                let backup_id =
                    self.record_history(request, &metrics, started_at, duration_seconds, status);

                BackupResult {
                    success: true,
                    metrics,
                    duration_seconds,
                    error: None,
                    backup_id,
                }
            }
            Err(failure) => {
                let duration_seconds = timer.elapsed().as_secs_f64();
                self.transition(BackupState::Failed);
                debug!("Backup failed ({}): {}", failure.kind, failure.message);
                self.bus
                    .publish(&BackupEvent::error(failure.kind, failure.message.clone()));

                let backup_id = if self.options.record_failed_runs {
                    let status = if failure.kind == ErrorKind::Cancelled {
                        BackupStatus::Interrupted
                    } else {
                        BackupStatus::Failed
                    };
                    self.record_history(request, &metrics, started_at, duration_seconds, status)
                } else {
                    None
                };

                BackupResult {
                    success: false,
                    metrics,
                    duration_seconds,
                    error: Some(ErrorInfo {
                        kind: failure.kind,
                        message: failure.message,
                    }),
                    backup_id,
                }
            }
        }
    }

    fn execute(
        &mut self,
        request: &BackupRequest,
        metrics: &mut BackupMetrics,
    ) -> Result<CopyReport, RunFailure> {
        let source_path = request.source_path();
        let destination_path = request.destination_path();

        self.transition(BackupState::CheckingConnectivity);
        self.bus.publish(&BackupEvent::CheckingConnectivity);
        validate_environment(source_path, destination_path, &self.bus)?;
        self.transition(BackupState::EnvironmentReady);

        self.transition(BackupState::CountingFiles);
        let (total_files, total_bytes) = count_files(source_path, &self.bus);
        metrics.total_files = total_files;
        metrics.total_bytes = total_bytes;

        if self.options.check_free_space {
            check_free_space(destination_path, total_bytes)?;
        }

        self.transition(BackupState::CopyingFiles);
        self.bus.publish(&BackupEvent::CopyingFiles);
        let report = copy_tree(
            source_path,
            destination_path,
            total_files,
            &self.bus,
            &self.stop_signal,
            metrics,
        )?;
        if report.files_failed > 0 {
            warn!("{} files could not be copied", report.files_failed);
        }

        self.transition(BackupState::Validating);
        self.bus.publish(&BackupEvent::Validating);
        let problems = validate_copy(
            source_path,
            destination_path,
            self.options.verify_hashes,
            &self.stop_signal,
        )?;

        if !problems.is_empty() {
            let details = problems
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(RunFailure {
                kind: ErrorKind::ValidationFailed,
                message: format!(
                    "Backup validation failed with {} errors: {}",
                    problems.len(),
                    details
                ),
            });
        }

        Ok(report)
    }

    /// Store the run in the history, if one is configured. A failing store
    /// only produces a warning.
    fn record_history(
        &self,
        request: &BackupRequest,
        metrics: &BackupMetrics,
        started_at: DateTime<Local>,
        duration_seconds: f64,
        status: BackupStatus,
    ) -> Option<i64> {
        let history = self.history.as_ref()?;

        let entry = BackupLogRecord {
            backup_id: 0,
            user_id: request.user_id(),
            backup_type: self.options.backup_type.clone(),
            ticket_number: request.ticket_number().map(str::to_string),
            start_time: started_at,
            end_time: Some(Local::now()),
            duration: Some(duration_seconds),
            source_path: Some(request.source_path().display().to_string()),
            destination_path: Some(request.destination_path().display().to_string()),
            total_size: Some(metrics.total_bytes),
            total_files: Some(metrics.total_files),
            copied_files: Some(metrics.copied_files),
            status,
        };

        match history.record(&entry) {
            Ok(backup_id) => {
                info!("Backup recorded in history as #{} ({})", backup_id, status);
                self.bus.publish(&BackupEvent::HistoryRecorded { backup_id });
                Some(backup_id)
            }
            Err(e) => {
                warn!("Failed to record backup in history: {}", e);
                None
            }
        }
    }

    fn transition(&mut self, next: BackupState) {
        debug!("Backup state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

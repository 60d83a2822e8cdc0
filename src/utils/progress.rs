use crate::models::backup_event::BackupEvent;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a spinner for indeterminate progress operations
pub fn create_spinner(msg: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✔"]),
    );
    spinner.set_message(msg.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Create a progress bar counting copied files
pub fn create_progress_bar(total: u64, prefix: &str) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} files {percent}% ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━━╸"),
    );
    bar.set_prefix(prefix.to_string());
    bar
}

/// Format bytes into human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// `HH:MM:SS`, fractions of a second dropped.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Terminal view of a running backup, updated from its events.
#[derive(Default)]
pub struct ConsoleRenderer {
    spinner: Option<ProgressBar>,
    bar: Option<ProgressBar>,
    total_files: u64,
}

impl ConsoleRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, event: &BackupEvent) {
        match event {
            BackupEvent::Started => self.set_status("Starting backup..."),
            BackupEvent::CheckingConnectivity => {
                self.set_status("[1/4] Checking source and destination...")
            }
            BackupEvent::EnvironmentReady => self.set_status("[1/4] Source and destination ready"),
            BackupEvent::CountingFiles {
                total_files: 0,
                total_bytes: 0,
            } => self.set_status("[2/4] Counting files..."),
            BackupEvent::CountingFiles {
                total_files,
                total_bytes,
            } => {
                self.total_files = *total_files;
                self.set_status(&format!(
                    "[2/4] Found {} files ({})",
                    total_files,
                    format_bytes(*total_bytes)
                ));
            }
            BackupEvent::CopyingFiles => {
                self.finish_spinner(None);
                self.bar = Some(create_progress_bar(self.total_files, "[3/4] Copying"));
            }
            BackupEvent::ProgressUpdate { files_copied, .. } => {
                if let Some(bar) = &self.bar {
                    bar.set_position(*files_copied);
                }
            }
            BackupEvent::Validating => {
                if let Some(bar) = self.bar.take() {
                    bar.finish();
                }
                self.set_status("[4/4] Validating copy...");
            }
            BackupEvent::Completed {
                duration_seconds,
                total_files,
                total_bytes,
            } => {
                self.finish_spinner(Some(format!(
                    "Backup completed in {}: {} files, {}",
                    format_duration(*duration_seconds),
                    total_files,
                    format_bytes(*total_bytes)
                )));
            }
            BackupEvent::HistoryRecorded { backup_id } => {
                self.println(&format!("Saved to backup history as #{}", backup_id));
            }
            BackupEvent::Error {
                error_kind,
                message,
            } => {
                let line = format!("[{}] {}", error_kind, message);
                if error_kind.is_fatal() {
                    if let Some(bar) = self.bar.take() {
                        bar.abandon();
                    }
                    self.finish_spinner(Some(format!("Backup failed: {}", line)));
                } else {
                    self.println(&line);
                }
            }
        }
    }

    /// Clear anything still drawn.
    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.abandon();
        }
        self.finish_spinner(None);
    }

    fn set_status(&mut self, msg: &str) {
        match &self.spinner {
            Some(spinner) => spinner.set_message(msg.to_string()),
            None => self.spinner = Some(create_spinner(msg)),
        }
    }

    fn finish_spinner(&mut self, msg: Option<String>) {
        let spinner = self.spinner.take().unwrap_or_else(ProgressBar::hidden);
        match msg {
            Some(msg) => {
                spinner.finish_with_message(msg.clone());
                if spinner.is_hidden() {
                    eprintln!("{}", msg);
                }
            }
            None => spinner.finish(),
        }
    }

    fn println(&self, line: &str) {
        match self.bar.as_ref().or(self.spinner.as_ref()) {
            Some(progress) if !progress.is_hidden() => progress.println(line),
            _ => eprintln!("{}", line),
        }
    }
}

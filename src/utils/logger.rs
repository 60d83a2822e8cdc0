use crate::models::error::{BackupError, Result};
use chrono::{Local, NaiveDate};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

/// Message sent from logger to background worker
enum LogMessage {
    Line { date: NaiveDate, line: String },
    /// Answered once every line queued before it has been written
    Flush(Sender<()>),
}

/// Logger that echoes to stderr and appends to `backup_YYYYMMDD.log` in a
/// directory, writing the file from a background thread.
pub struct FileLogger {
    level: LevelFilter,
    tx: Sender<LogMessage>,
}

impl FileLogger {
    /// Create the log directory and start the background writer
    pub fn new(directory: &Path, level: LevelFilter) -> Result<Self> {
        fs::create_dir_all(directory).map_err(|e| {
            BackupError::Logger(format!(
                "cannot create log directory {}: {}",
                directory.display(),
                e
            ))
        })?;

        let (tx, rx) = mpsc::channel::<LogMessage>();
        let directory = directory.to_path_buf();
        thread::spawn(move || {
            log_writer_worker(directory, rx);
        });

        Ok(FileLogger { level, tx })
    }
}

fn level_name(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARNING",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

/// `backup_YYYYMMDD.log`
pub fn log_file_name(date: NaiveDate) -> String {
    format!("backup_{}.log", date.format("%Y%m%d"))
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let now = Local::now();
        let line = format!(
            "{} - {} - {}",
            now.format("%Y-%m-%d %H:%M:%S"),
            level_name(record.level()),
            record.args()
        );
        eprintln!("{}", line);

        // The writer thread only goes away with the process
        let _ = self.tx.send(LogMessage::Line {
            date: now.date_naive(),
            line,
        });
    }

    /// Blocks until the writer has caught up with everything logged so far.
    fn flush(&self) {
        let (ack_tx, ack_rx) = mpsc::channel();
        if self.tx.send(LogMessage::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }
}

/// Background worker that appends log lines, reopening when the day changes
fn log_writer_worker(directory: PathBuf, rx: Receiver<LogMessage>) {
    let mut current: Option<(NaiveDate, File)> = None;

    while let Ok(message) = rx.recv() {
        match message {
            LogMessage::Line { date, line } => {
                if current.as_ref().map(|(open_date, _)| *open_date) != Some(date) {
                    current = OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(directory.join(log_file_name(date)))
                        .ok()
                        .map(|file| (date, file));
                }

                // Errors are dropped; logging them would feed back into this logger
                if let Some((_, file)) = current.as_mut() {
                    let _ = file.write_all(format!("{}\n", line).as_bytes());
                }
            }
            LogMessage::Flush(ack) => {
                if let Some((_, file)) = current.as_mut() {
                    let _ = file.flush();
                }
                let _ = ack.send(());
            }
        }
    }
}

/// Install a `FileLogger` writing into `directory` as the global logger
pub fn init_file_logger(directory: &str, level: LevelFilter) -> Result<()> {
    let logger = FileLogger::new(Path::new(directory), level)?;
    log::set_boxed_logger(Box::new(logger))
        .map_err(|e| BackupError::Logger(e.to_string()))?;
    log::set_max_level(level);
    Ok(())
}

/// Map a `--log-level` value to a filter, defaulting to `Info`. "warning"
/// is accepted as well, matching the label written to the log.
pub fn parse_level(level: &str) -> LevelFilter {
    if level.eq_ignore_ascii_case("warning") {
        return LevelFilter::Warn;
    }
    level.parse().unwrap_or(LevelFilter::Info)
}

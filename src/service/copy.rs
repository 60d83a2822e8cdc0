use crate::models::backup_event::BackupEvent;
use crate::models::backup_result::BackupMetrics;
use crate::models::error::{Cancelled, ErrorKind};
use crate::service::event_bus::EventBus;
use crate::session::StopSignal;
use crate::utils::directory::{error_path, relative_to, walk_files};
use log::debug;
use std::fs;
use std::io;
use std::path::Path;

/// Files copied and files given up on during one pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CopyReport {
    pub files_copied: u64,
    pub files_failed: u64,
}

/// Mirror every file below `source_path` into `destination_path`.
///
/// A file that cannot be copied is reported as an `InaccessibleFile` error
/// event and skipped. `metrics.copied_files` advances after every copied file
/// and a `ProgressUpdate` follows it, unless `total_files` is zero.
pub fn copy_tree(
    source_path: &Path,
    destination_path: &Path,
    total_files: u64,
    bus: &EventBus,
    stop_signal: &StopSignal,
    metrics: &mut BackupMetrics,
) -> Result<CopyReport, Cancelled> {
    let mut report = CopyReport::default();

    for entry in walk_files(source_path) {
        if stop_signal.is_stop_requested() {
            return Err(Cancelled);
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                report.files_failed += 1;
                report_inaccessible(bus, &error_path(source_path, &e), &e.to_string());
                continue;
            }
        };

        let relative_path = relative_to(source_path, entry.path());
        let target = destination_path.join(&relative_path);

        if let Err(e) = copy_file(entry.path(), &target) {
            report.files_failed += 1;
            report_inaccessible(bus, &relative_path, &e.to_string());
            continue;
        }

        debug!("Copied {}", relative_path.display());
        report.files_copied += 1;
        metrics.copied_files = report.files_copied;

        if total_files > 0 {
            bus.publish(&BackupEvent::ProgressUpdate {
                progress_percent: progress_percent(report.files_copied, total_files),
                files_copied: report.files_copied,
                total_files,
            });
        }
    }

    Ok(report)
}

/// Whole-file copy: the source is read completely before the target is written.
fn copy_file(source: &Path, target: &Path) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let contents = fs::read(source)?;
    fs::write(target, contents)
}

fn report_inaccessible(bus: &EventBus, relative_path: &Path, cause: &str) {
    let message = format!("Failed to copy {}: {}", relative_path.display(), cause);
    debug!("{}", message);
    bus.publish(&BackupEvent::error(ErrorKind::InaccessibleFile, message));
}

/// `floor(copied / total * 100)`, capped at 100 in case the tree grew after
/// it was counted.
pub fn progress_percent(files_copied: u64, total_files: u64) -> u8 {
    if total_files == 0 {
        return 100;
    }
    (files_copied.saturating_mul(100) / total_files).min(100) as u8
}

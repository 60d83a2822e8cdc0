use crate::models::backup_event::BackupEvent;
use crate::service::event_bus::EventBus;
use crate::utils::directory::walk_files;
use log::debug;
use std::fs;
use std::path::Path;

/// Count the files below `source_path` and sum their sizes. Entries whose
/// metadata cannot be read are left out of both totals.
pub fn count_files(source_path: &Path, bus: &EventBus) -> (u64, u64) {
    bus.publish(&BackupEvent::CountingFiles {
        total_files: 0,
        total_bytes: 0,
    });

    let mut total_files = 0u64;
    let mut total_bytes = 0u64;

    for entry in walk_files(source_path) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry while counting: {}", e);
                continue;
            }
        };

        // Through the link, so a symlinked file counts with its target's size
        match fs::metadata(entry.path()) {
            Ok(metadata) => {
                total_files += 1;
                total_bytes += metadata.len();
            }
            Err(e) => debug!(
                "Skipping {} while counting: {}",
                entry.path().display(),
                e
            ),
        }
    }

    debug!(
        "Found {} files ({} bytes) in {}",
        total_files,
        total_bytes,
        source_path.display()
    );
    bus.publish(&BackupEvent::CountingFiles {
        total_files,
        total_bytes,
    });

    (total_files, total_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::{sample_tree, RecordingListener};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_counts_files_and_bytes() {
        let source = sample_tree();
        let recorder = Arc::new(RecordingListener::default());
        let mut bus = EventBus::new();
        bus.attach(recorder.clone());

        let totals = count_files(source.path(), &bus);

        assert_eq!(totals, (2, 30));
        assert_eq!(
            recorder.events(),
            vec![
                BackupEvent::CountingFiles {
                    total_files: 0,
                    total_bytes: 0
                },
                BackupEvent::CountingFiles {
                    total_files: 2,
                    total_bytes: 30
                },
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_file_counts_with_target_size() {
        let source = sample_tree();
        std::os::unix::fs::symlink(source.path().join("sub/b.txt"), source.path().join("c.txt"))
            .unwrap();

        assert_eq!(count_files(source.path(), &EventBus::new()), (3, 50));
    }

    #[test]
    fn test_empty_tree_counts_zero() {
        let source = TempDir::new().unwrap();
        let bus = EventBus::new();
        assert_eq!(count_files(source.path(), &bus), (0, 0));
    }

    #[test]
    fn test_missing_root_counts_zero() {
        let temp_dir = TempDir::new().unwrap();
        let bus = EventBus::new();
        assert_eq!(count_files(&temp_dir.path().join("gone"), &bus), (0, 0));
    }
}

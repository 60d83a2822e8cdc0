use crate::models::error::{Cancelled, ValidationError};
use crate::service::hash::hash_file;
use crate::session::StopSignal;
use crate::utils::directory::{error_path, relative_to, walk_files};
use log::debug;
use std::fs;
use std::io;
use std::path::Path;

/// Walk the source again and check every file against its mirror in the
/// destination. Problems are collected rather than returned early; an empty
/// list means the copy is complete.
pub fn validate_copy(
    source_path: &Path,
    destination_path: &Path,
    verify_hashes: bool,
    stop_signal: &StopSignal,
) -> Result<Vec<ValidationError>, Cancelled> {
    let mut errors = Vec::new();

    for entry in walk_files(source_path) {
        if stop_signal.is_stop_requested() {
            return Err(Cancelled);
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                errors.push(ValidationError::Unreadable {
                    relative_path: error_path(source_path, &e),
                    message: e.to_string(),
                });
                continue;
            }
        };

        let relative_path = relative_to(source_path, entry.path());
        let target = destination_path.join(&relative_path);

        if let Some(error) = check_file(entry.path(), &target, &relative_path, verify_hashes) {
            debug!("Validation problem: {}", error);
            errors.push(error);
        }
    }

    Ok(errors)
}

fn check_file(
    source: &Path,
    target: &Path,
    relative_path: &Path,
    verify_hashes: bool,
) -> Option<ValidationError> {
    let unreadable = |e: io::Error| ValidationError::Unreadable {
        relative_path: relative_path.to_path_buf(),
        message: e.to_string(),
    };

    let destination_size = match fs::metadata(target) {
        Ok(metadata) => metadata.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Some(ValidationError::MissingAtDestination {
                relative_path: relative_path.to_path_buf(),
            })
        }
        Err(e) => return Some(unreadable(e)),
    };

    let source_size = match fs::metadata(source) {
        Ok(metadata) => metadata.len(),
        Err(e) => return Some(unreadable(e)),
    };

    if source_size != destination_size {
        return Some(ValidationError::SizeMismatch {
            relative_path: relative_path.to_path_buf(),
            source_size,
            destination_size,
        });
    }

    if verify_hashes {
        let matches = hash_file(source)
            .and_then(|source_hash| Ok(source_hash == hash_file(target)?));
        match matches {
            Ok(true) => {}
            Ok(false) => {
                return Some(ValidationError::ContentMismatch {
                    relative_path: relative_path.to_path_buf(),
                })
            }
            Err(e) => return Some(unreadable(e)),
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::sample_tree;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn copied_sample() -> (TempDir, TempDir) {
        let source = sample_tree();
        let destination = TempDir::new().unwrap();
        fs::create_dir_all(destination.path().join("sub")).unwrap();
        fs::copy(source.path().join("a.txt"), destination.path().join("a.txt")).unwrap();
        fs::copy(
            source.path().join("sub/b.txt"),
            destination.path().join("sub/b.txt"),
        )
        .unwrap();
        (source, destination)
    }

    #[test]
    fn test_complete_copy_has_no_errors() {
        let (source, destination) = copied_sample();

        let errors =
            validate_copy(source.path(), destination.path(), true, &StopSignal::new()).unwrap();

        assert!(errors.is_empty());
    }

    #[test]
    fn test_truncated_file_is_a_size_mismatch() {
        let (source, destination) = copied_sample();
        fs::write(destination.path().join("sub/b.txt"), b"short").unwrap();

        let errors =
            validate_copy(source.path(), destination.path(), false, &StopSignal::new()).unwrap();

        assert_eq!(
            errors,
            vec![ValidationError::SizeMismatch {
                relative_path: PathBuf::from("sub/b.txt"),
                source_size: 20,
                destination_size: 5,
            }]
        );
    }

    #[test]
    fn test_missing_file_is_reported() {
        let (source, destination) = copied_sample();
        fs::remove_file(destination.path().join("a.txt")).unwrap();

        let errors =
            validate_copy(source.path(), destination.path(), false, &StopSignal::new()).unwrap();

        assert_eq!(
            errors,
            vec![ValidationError::MissingAtDestination {
                relative_path: PathBuf::from("a.txt"),
            }]
        );
    }

    #[test]
    fn test_same_size_different_content_needs_hashes() {
        let (source, destination) = copied_sample();
        fs::write(destination.path().join("a.txt"), b"XXXXXXXXXX").unwrap();

        let without_hashes =
            validate_copy(source.path(), destination.path(), false, &StopSignal::new()).unwrap();
        assert!(without_hashes.is_empty());

        let with_hashes =
            validate_copy(source.path(), destination.path(), true, &StopSignal::new()).unwrap();
        assert_eq!(
            with_hashes,
            vec![ValidationError::ContentMismatch {
                relative_path: PathBuf::from("a.txt"),
            }]
        );
    }

    #[test]
    fn test_extra_destination_files_are_ignored() {
        let (source, destination) = copied_sample();
        fs::write(destination.path().join("old_file.txt"), b"left over").unwrap();

        let errors =
            validate_copy(source.path(), destination.path(), false, &StopSignal::new()).unwrap();

        assert!(errors.is_empty());
    }

    #[test]
    fn test_stop_signal_cancels_validation() {
        let (source, destination) = copied_sample();
        let stop_signal = StopSignal::new();
        stop_signal.request_stop();

        assert_eq!(
            validate_copy(source.path(), destination.path(), false, &stop_signal),
            Err(Cancelled)
        );
    }
}

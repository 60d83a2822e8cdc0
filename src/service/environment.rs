use crate::models::backup_event::BackupEvent;
use crate::models::error::EnvironmentError;
use crate::service::event_bus::EventBus;
use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the marker file written and removed to prove the destination is writable.
pub const PROBE_FILE_NAME: &str = ".test";

/// Confirm the source exists, the destination exists (creating it when
/// missing) and the destination accepts writes. Publishes `EnvironmentReady`
/// on success.
pub fn validate_environment(
    source_path: &Path,
    destination_path: &Path,
    bus: &EventBus,
) -> Result<(), EnvironmentError> {
    check_source(source_path)?;
    check_not_nested(source_path, destination_path)?;
    prepare_destination(destination_path)?;
    probe_writable(destination_path)?;

    debug!(
        "Environment ready: {} -> {}",
        source_path.display(),
        destination_path.display()
    );
    bus.publish(&BackupEvent::EnvironmentReady);
    Ok(())
}

fn check_source(source_path: &Path) -> Result<(), EnvironmentError> {
    match fs::metadata(source_path) {
        Ok(_) => Ok(()),
        Err(cause) => Err(match cause.kind() {
            io::ErrorKind::NotFound => EnvironmentError::SourceNotFound {
                path: source_path.to_path_buf(),
            },
            io::ErrorKind::PermissionDenied => EnvironmentError::SourceAccessDenied {
                path: source_path.to_path_buf(),
                cause,
            },
            _ => EnvironmentError::SourceUnreachable {
                path: source_path.to_path_buf(),
                cause,
            },
        }),
    }
}

fn prepare_destination(destination_path: &Path) -> Result<(), EnvironmentError> {
    if destination_path.is_dir() {
        return Ok(());
    }

    debug!("Creating destination {}", destination_path.display());
    fs::create_dir_all(destination_path).map_err(|cause| EnvironmentError::DestinationUnwritable {
        path: destination_path.to_path_buf(),
        cause,
    })
}

/// Runs before the destination is created, so a rejected destination leaves
/// nothing behind in the source tree.
fn check_not_nested(source_path: &Path, destination_path: &Path) -> Result<(), EnvironmentError> {
    let (Ok(source), Some(destination)) = (
        fs::canonicalize(source_path),
        canonicalize_existing(destination_path),
    ) else {
        return Ok(());
    };

    if destination.starts_with(&source) {
        return Err(EnvironmentError::DestinationInsideSource {
            source_path: source_path.to_path_buf(),
            destination: destination_path.to_path_buf(),
        });
    }
    Ok(())
}

/// Canonical form of the nearest existing ancestor of `path`, with the
/// missing components appended again.
fn canonicalize_existing(path: &Path) -> Option<PathBuf> {
    let mut missing = Vec::new();
    let mut current = path;
    loop {
        match fs::canonicalize(current) {
            Ok(canonical) => {
                return Some(missing.iter().rev().fold(canonical, |acc, part| acc.join(part)))
            }
            Err(_) => {
                missing.push(current.file_name()?);
                current = match current.parent() {
                    Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
                    Some(parent) => parent,
                    None => return None,
                };
            }
        }
    }
}

fn probe_writable(destination_path: &Path) -> Result<(), EnvironmentError> {
    let probe = destination_path.join(PROBE_FILE_NAME);
    let unwritable = |cause| EnvironmentError::DestinationUnwritable {
        path: destination_path.to_path_buf(),
        cause,
    };

    fs::write(&probe, b"test").map_err(unwritable)?;
    fs::remove_file(&probe).map_err(unwritable)?;
    Ok(())
}

/// Fail with `InsufficientSpace` when the destination filesystem cannot hold
/// `required_bytes` more.
pub fn check_free_space(destination_path: &Path, required_bytes: u64) -> Result<(), EnvironmentError> {
    let available = fs4::available_space(destination_path).map_err(|cause| {
        EnvironmentError::DestinationUnwritable {
            path: destination_path.to_path_buf(),
            cause,
        }
    })?;

    debug!(
        "Free space at {}: {} bytes available, {} required",
        destination_path.display(),
        available,
        required_bytes
    );

    if available < required_bytes {
        return Err(EnvironmentError::InsufficientSpace {
            path: destination_path.to_path_buf(),
            required: required_bytes,
            available,
        });
    }
    Ok(())
}

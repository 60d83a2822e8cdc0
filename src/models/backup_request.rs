use crate::models::error::{BackupError, Result};
use std::path::{Path, PathBuf};

/// A single backup job as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRequest {
    source_path: PathBuf,
    destination_path: PathBuf,
    ticket_number: Option<String>,
    user_id: i64,
}

impl BackupRequest {
    /// Build a request, rejecting empty source or destination paths.
    pub fn new(
        source_path: impl Into<PathBuf>,
        destination_path: impl Into<PathBuf>,
        ticket_number: Option<String>,
        user_id: i64,
    ) -> Result<Self> {
        let source_path = source_path.into();
        let destination_path = destination_path.into();

        if source_path.as_os_str().is_empty() {
            return Err(BackupError::InvalidRequest(
                "source path cannot be empty".to_string(),
            ));
        }
        if destination_path.as_os_str().is_empty() {
            return Err(BackupError::InvalidRequest(
                "destination path cannot be empty".to_string(),
            ));
        }

        let ticket_number = ticket_number
            .map(|ticket| ticket.trim().to_string())
            .filter(|ticket| !ticket.is_empty());

        Ok(Self {
            source_path,
            destination_path,
            ticket_number,
            user_id,
        })
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn destination_path(&self) -> &Path {
        &self.destination_path
    }

    pub fn ticket_number(&self) -> Option<&str> {
        self.ticket_number.as_deref()
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }
}

use serde::Serialize;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Failed to read config file '{}': {cause}", .path.display())]
    ConfigRead { path: PathBuf, cause: io::Error },

    #[error("Failed to parse config file '{}': {cause}", .path.display())]
    ConfigParse {
        path: PathBuf,
        cause: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Invalid backup request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to initialize logger: {0}")]
    Logger(String),
}

pub type Result<T> = std::result::Result<T, BackupError>;

/// Failures of the history store.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database file path cannot be empty")]
    EmptyPath,

    #[error("Failed to create database directory '{}': {cause}", .path.display())]
    CreateDirectory { path: PathBuf, cause: io::Error },

    #[error("Failed to create database connection pool for '{path}': {cause}")]
    Pool { path: String, cause: r2d2::Error },

    #[error("Failed to get database connection from pool: {0}")]
    Connection(#[from] r2d2::Error),

    #[error("Database query failed for '{operation}': {cause}")]
    Query {
        operation: String,
        cause: rusqlite::Error,
    },

    #[error("Failed to insert into {table}: {cause}")]
    Insert {
        table: String,
        cause: rusqlite::Error,
    },
}

/// Failures detected while checking the source and destination before a run.
#[derive(Error, Debug)]
pub enum EnvironmentError {
    #[error("Source path does not exist: {}", .path.display())]
    SourceNotFound { path: PathBuf },

    #[error("Permission denied reading source '{}': {cause}", .path.display())]
    SourceAccessDenied { path: PathBuf, cause: io::Error },

    #[error("Source '{}' is unreachable: {cause}", .path.display())]
    SourceUnreachable { path: PathBuf, cause: io::Error },

    #[error("Destination '{}' is not writable: {cause}", .path.display())]
    DestinationUnwritable { path: PathBuf, cause: io::Error },

    #[error(
        "Destination '{}' is inside the source tree '{}'",
        .destination.display(),
        .source_path.display()
    )]
    DestinationInsideSource {
        source_path: PathBuf,
        destination: PathBuf,
    },

    #[error(
        "Insufficient space at '{}': {required} bytes required, {available} bytes available",
        .path.display()
    )]
    InsufficientSpace {
        path: PathBuf,
        required: u64,
        available: u64,
    },
}

impl EnvironmentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SourceNotFound { .. } => ErrorKind::SourceNotFound,
            Self::SourceAccessDenied { .. } => ErrorKind::AuthError,
            Self::SourceUnreachable { .. } => ErrorKind::ConnectionLost,
            Self::DestinationUnwritable { .. } | Self::DestinationInsideSource { .. } => {
                ErrorKind::DestinationUnwritable
            }
            Self::InsufficientSpace { .. } => ErrorKind::InsufficientSpace,
        }
    }
}

/// A single discrepancy found while checking the copied tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("File not found at destination: {}", .relative_path.display())]
    MissingAtDestination { relative_path: PathBuf },

    #[error(
        "Size differs for file {}: source {source_size} bytes, destination {destination_size} bytes",
        .relative_path.display()
    )]
    SizeMismatch {
        relative_path: PathBuf,
        source_size: u64,
        destination_size: u64,
    },

    #[error("Content differs for file: {}", .relative_path.display())]
    ContentMismatch { relative_path: PathBuf },

    #[error("Failed to check file {}: {message}", .relative_path.display())]
    Unreadable {
        relative_path: PathBuf,
        message: String,
    },
}

#[cfg(test)]
impl ValidationError {
    pub fn relative_path(&self) -> &PathBuf {
        match self {
            Self::MissingAtDestination { relative_path }
            | Self::SizeMismatch { relative_path, .. }
            | Self::ContentMismatch { relative_path }
            | Self::Unreadable { relative_path, .. } => relative_path,
        }
    }
}

/// The stop signal was raised while the pipeline was walking the tree.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Backup cancelled by user")]
pub struct Cancelled;

/// Error returned by a listener; caught and logged by the event bus.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct ListenerError(pub String);

/// Classification carried by `BackupEvent::Error` and `ErrorInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SourceNotFound,
    DestinationUnwritable,
    ConnectionLost,
    AuthError,
    InsufficientSpace,
    InaccessibleFile,
    ValidationFailed,
    Cancelled,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SourceNotFound => "source_not_found",
            ErrorKind::DestinationUnwritable => "destination_unwritable",
            ErrorKind::ConnectionLost => "connection_lost",
            ErrorKind::AuthError => "auth_error",
            ErrorKind::InsufficientSpace => "insufficient_space",
            ErrorKind::InaccessibleFile => "inaccessible_file",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// True for kinds that end the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ErrorKind::InaccessibleFile)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

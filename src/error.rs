//! Error types for HDrive.

use serde::Serialize;
use thiserror::Error;

/// Machine-readable failure kind carried by every structured error result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    PathViolation,
    FolderNotFound,
    FileNotFound,
    ParentNotFound,
    NotFound,
    InvalidName,
    NoFileProvided,
    MissingParameter,
    InvalidParameter,
    DuplicatePath,
    PhysicalCreateFailed,
    IoError,
    StorageError,
    MirrorDivergence,
    ConfigError,
}

impl ErrorKind {
    /// Whether this kind means a requested entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ErrorKind::FolderNotFound
                | ErrorKind::FileNotFound
                | ErrorKind::ParentNotFound
                | ErrorKind::NotFound
        )
    }

    /// Whether this kind is caused by bad client input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ErrorKind::PathViolation
                | ErrorKind::InvalidName
                | ErrorKind::NoFileProvided
                | ErrorKind::MissingParameter
                | ErrorKind::InvalidParameter
        )
    }
}

/// Common error type for HDrive.
///
/// Messages only ever mention logical paths. Physical locations are reported
/// through `tracing` on the server side.
#[derive(Error, Debug)]
pub enum DriveError {
    /// A path resolved outside the configured drive root.
    #[error("path escapes the drive root: {0}")]
    PathViolation(String),

    /// No folder is indexed at the given logical path.
    #[error("folder not found: {0}")]
    FolderNotFound(String),

    /// No file is indexed at the given logical path, or its bytes are gone.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// The parent of a folder being created does not exist.
    #[error("parent folder not found: {0}")]
    ParentNotFound(String),

    /// A physical entry is absent.
    #[error("{0} not found")]
    NotFound(String),

    /// Folder or file name is empty or unusable.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// An upload request carried no file payload.
    #[error("no file provided")]
    NoFileProvided,

    /// A required parameter was absent.
    #[error("missing required parameter: {0}")]
    MissingParameter(String),

    /// A parameter was present but outside its accepted range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Another entry already occupies the logical path.
    #[error("path already exists: {0}")]
    DuplicatePath(String),

    /// The physical directory could not be created (index insert rolled back).
    #[error("could not create physical folder: {0}")]
    PhysicalCreateFailed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Index storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Index and physical storage disagree after a failed compensation.
    #[error("index and filesystem diverged: {0}")]
    MirrorDivergence(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DriveError {
    /// The failure kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriveError::PathViolation(_) => ErrorKind::PathViolation,
            DriveError::FolderNotFound(_) => ErrorKind::FolderNotFound,
            DriveError::FileNotFound(_) => ErrorKind::FileNotFound,
            DriveError::ParentNotFound(_) => ErrorKind::ParentNotFound,
            DriveError::NotFound(_) => ErrorKind::NotFound,
            DriveError::InvalidName(_) => ErrorKind::InvalidName,
            DriveError::NoFileProvided => ErrorKind::NoFileProvided,
            DriveError::MissingParameter(_) => ErrorKind::MissingParameter,
            DriveError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            DriveError::DuplicatePath(_) => ErrorKind::DuplicatePath,
            DriveError::PhysicalCreateFailed(_) => ErrorKind::PhysicalCreateFailed,
            DriveError::Io(_) => ErrorKind::IoError,
            DriveError::Storage(_) => ErrorKind::StorageError,
            DriveError::MirrorDivergence(_) => ErrorKind::MirrorDivergence,
            DriveError::Config(_) => ErrorKind::ConfigError,
        }
    }
}

impl From<sqlx::Error> for DriveError {
    fn from(e: sqlx::Error) -> Self {
        DriveError::Storage(e.to_string())
    }
}

/// Returns true if the database error is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

/// Result type alias for HDrive operations.
pub type Result<T> = std::result::Result<T, DriveError>;

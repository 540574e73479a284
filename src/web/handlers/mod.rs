//! API handlers for the drive.

pub mod drive;

pub use drive::*;

use crate::drive::DriveService;

/// Shared state of all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Drive operations.
    pub service: DriveService,
    /// Maximum accepted upload body, in bytes.
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Create a new AppState.
    pub fn new(service: DriveService, max_upload_bytes: usize) -> Self {
        Self {
            service,
            max_upload_bytes,
        }
    }
}

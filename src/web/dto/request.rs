//! Request DTOs for the drive API.
//!
//! Every operation reads its parameters from the query string, for GET and
//! POST alike.

use serde::Deserialize;

use crate::web::error::ApiError;

/// Parameters naming a folder (`listFolder`, `uploadFile`, `verifyFolder`).
#[derive(Debug, Default, Deserialize)]
pub struct FolderQuery {
    /// Logical folder path, `/` when absent.
    #[serde(default)]
    pub path: Option<String>,
}

impl FolderQuery {
    /// The folder path, defaulting to the root.
    pub fn path(&self) -> &str {
        self.path.as_deref().unwrap_or("/")
    }
}

/// Parameters naming a file (`fileInfo`).
#[derive(Debug, Default, Deserialize)]
pub struct FileQuery {
    /// Logical file path (required).
    #[serde(default)]
    pub path: Option<String>,
}

impl FileQuery {
    /// The file path, or a 400 when absent or empty.
    pub fn path(&self) -> Result<&str, ApiError> {
        required(&self.path, "path")
    }
}

/// Parameters of `createFolder`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateFolderQuery {
    /// New folder name (required).
    #[serde(default)]
    pub name: Option<String>,
    /// Parent folder path, `/` when absent.
    #[serde(default)]
    pub parent: Option<String>,
}

impl CreateFolderQuery {
    /// The folder name, or a 400 when absent.
    ///
    /// Whitespace-only names pass through so the drive reports them as
    /// invalid names.
    pub fn name(&self) -> Result<&str, ApiError> {
        self.name
            .as_deref()
            .ok_or_else(|| ApiError::bad_request("missing required parameter: name"))
    }

    /// The parent path, defaulting to the root.
    pub fn parent(&self) -> &str {
        self.parent.as_deref().unwrap_or("/")
    }
}

/// Parameters of `generateSharedLink`.
#[derive(Debug, Default, Deserialize)]
pub struct SharedLinkQuery {
    /// Logical file path (required).
    #[serde(default)]
    pub path: Option<String>,
    /// Lifetime in minutes; absent, empty or 0 never expires.
    #[serde(default)]
    pub expires: Option<String>,
}

impl SharedLinkQuery {
    /// The file path, or a 400 when absent or empty.
    pub fn path(&self) -> Result<&str, ApiError> {
        required(&self.path, "path")
    }

    /// The requested lifetime in minutes.
    ///
    /// Negative and non-numeric values are rejected.
    pub fn expires_in_minutes(&self) -> Result<Option<u32>, ApiError> {
        match self.expires.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse::<u32>().map(Some).map_err(|_| {
                ApiError::bad_request("expires must be a non-negative number of minutes")
            }),
        }
    }
}

/// Parameters of `search`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    /// Search term (required).
    #[serde(default)]
    pub q: Option<String>,
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, ApiError> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::bad_request(format!(
            "missing required parameter: {name}"
        ))),
    }
}

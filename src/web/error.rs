//! API error handling for the HDrive HTTP layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::ErrorKind;
use crate::DriveError;

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad request (400).
    BadRequest,
    /// Not found (404).
    NotFound,
    /// Conflict (409).
    Conflict,
    /// Payload too large (413).
    PayloadTooLarge,
    /// Internal server error (500).
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ErrorKind> for ErrorCode {
    fn from(kind: ErrorKind) -> Self {
        if kind.is_not_found() {
            ErrorCode::NotFound
        } else if kind.is_client_error() {
            ErrorCode::BadRequest
        } else if kind == ErrorKind::DuplicatePath {
            ErrorCode::Conflict
        } else {
            ErrorCode::InternalError
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Error details.
    pub error: ErrorDetail,
}

/// Error detail.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error code.
    pub code: ErrorCode,
    /// Drive failure kind, when the error came from a drive operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    /// Human-readable message.
    pub message: String,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    kind: Option<ErrorKind>,
    message: String,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            kind: None,
            message: message.into(),
        }
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create a payload too large error.
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PayloadTooLarge, message)
    }

    /// Create an internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// The error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The drive failure kind, if any.
    pub fn kind(&self) -> Option<ErrorKind> {
        self.kind
    }

    /// The message sent to the client.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                kind: self.kind,
                message: self.message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<DriveError> for ApiError {
    fn from(err: DriveError) -> Self {
        let kind = err.kind();
        let code = ErrorCode::from(kind);

        // Backend faults are logged in full and reported generically.
        let message = match &err {
            DriveError::Io(_) | DriveError::Storage(_) | DriveError::Config(_) => {
                tracing::error!("Internal error: {}", err);
                "An internal error occurred".to_string()
            }
            _ => {
                if code == ErrorCode::InternalError {
                    tracing::error!("Drive operation failed: {}", err);
                }
                err.to_string()
            }
        };

        Self {
            code,
            kind: Some(kind),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status() {
        assert_eq!(ErrorCode::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::PayloadTooLarge.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_drive_error_mapping() {
        let cases = [
            (DriveError::FolderNotFound("/x".into()), ErrorCode::NotFound),
            (DriveError::FileNotFound("/x".into()), ErrorCode::NotFound),
            (DriveError::ParentNotFound("/x".into()), ErrorCode::NotFound),
            (DriveError::NotFound("shared link".into()), ErrorCode::NotFound),
            (DriveError::PathViolation("/..".into()), ErrorCode::BadRequest),
            (DriveError::InvalidName("x".into()), ErrorCode::BadRequest),
            (DriveError::NoFileProvided, ErrorCode::BadRequest),
            (DriveError::MissingParameter("path".into()), ErrorCode::BadRequest),
            (DriveError::InvalidParameter("expires".into()), ErrorCode::BadRequest),
            (DriveError::DuplicatePath("/x".into()), ErrorCode::Conflict),
            (DriveError::PhysicalCreateFailed("/x".into()), ErrorCode::InternalError),
            (DriveError::MirrorDivergence("/x".into()), ErrorCode::InternalError),
            (DriveError::Storage("locked".into()), ErrorCode::InternalError),
        ];

        for (err, expected) in cases {
            let kind = err.kind();
            let api_err = ApiError::from(err);
            assert_eq!(api_err.code(), expected);
            assert_eq!(api_err.kind(), Some(kind));
        }
    }

    #[test]
    fn test_backend_errors_are_not_leaked() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "/srv/secret/path");
        let api_err = ApiError::from(DriveError::Io(io));
        assert_eq!(api_err.message(), "An internal error occurred");
        assert_eq!(api_err.kind(), Some(ErrorKind::IoError));
    }

    #[test]
    fn test_client_errors_keep_message() {
        let api_err = ApiError::from(DriveError::FolderNotFound("/docs".to_string()));
        assert_eq!(api_err.message(), "folder not found: /docs");
    }

    #[test]
    fn test_api_error_constructors() {
        assert_eq!(ApiError::bad_request("bad").code(), ErrorCode::BadRequest);
        assert_eq!(ApiError::not_found("missing").code(), ErrorCode::NotFound);
        assert_eq!(ApiError::internal("error").code(), ErrorCode::InternalError);
        assert!(ApiError::not_found("missing").kind().is_none());
    }
}

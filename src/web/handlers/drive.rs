//! Drive API handlers.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, Multipart, Path, Query, State},
    http::{header, Response, StatusCode},
    Json,
};

use crate::drive::{
    CreatedFolder, Download, FileInfo, FolderListing, MirrorReport, SearchResults,
    SharedLinkResult, Upload, UploadedFile,
};
use crate::web::dto::{
    ApiResponse, CreateFolderQuery, FileQuery, FolderQuery, SearchQuery, SharedLinkQuery,
};
use crate::web::error::ApiError;

use super::AppState;

/// Content-Disposition disposition type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

impl Disposition {
    fn as_str(&self) -> &'static str {
        match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        }
    }
}

/// Create a Content-Disposition header value with proper encoding.
///
/// Uses RFC 5987 encoding for non-ASCII filenames and properly escapes
/// special characters to prevent header injection.
fn content_disposition_header(disposition: Disposition, filename: &str) -> String {
    let kind = disposition.as_str();
    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            _ => c,
        })
        .collect();

    if filename.is_ascii() && !filename.chars().any(|c| c.is_control() || c == '"' || c == '\\') {
        return format!("{kind}; filename=\"{filename}\"");
    }

    let encoded = urlencoding::encode(filename);
    format!("{kind}; filename=\"{sanitized}\"; filename*=UTF-8''{encoded}")
}

fn file_response(download: Download, disposition: Disposition) -> Result<Response<Body>, ApiError> {
    let content_type = mime_guess::from_path(&download.file.name)
        .first_or_octet_stream()
        .to_string();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(disposition, &download.file.name),
        )
        .header(header::CONTENT_LENGTH, download.content.len())
        .body(Body::from(download.content))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// GET|POST /api/listFolder?path= - List a folder.
pub async fn list_folder(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FolderQuery>,
) -> Result<Json<ApiResponse<FolderListing>>, ApiError> {
    let listing = state.service.list_folder(query.path()).await?;
    Ok(Json(ApiResponse::new(listing)))
}

/// GET|POST /api/fileInfo?path= - Describe a file.
pub async fn file_info(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FileQuery>,
) -> Result<Json<ApiResponse<FileInfo>>, ApiError> {
    let info = state.service.file_info(query.path()?).await?;
    Ok(Json(ApiResponse::new(info)))
}

/// GET|POST /api/createFolder?name=&parent= - Create a folder.
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CreateFolderQuery>,
) -> Result<Json<ApiResponse<CreatedFolder>>, ApiError> {
    let created = state
        .service
        .create_folder(query.name()?, query.parent())
        .await?;
    Ok(Json(ApiResponse::new(created)))
}

/// POST /api/uploadFile?path= - Upload a file.
///
/// Request body: multipart/form-data with a "file" field. A request that is
/// not multipart, or whose "file" field has no file name, carries no file.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FolderQuery>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse<UploadedFile>>, ApiError> {
    let upload = match multipart {
        Ok(multipart) => read_upload(multipart, state.max_upload_bytes).await?,
        Err(rejection) => {
            tracing::debug!("Upload without multipart body: {}", rejection);
            None
        }
    };

    let uploaded = state.service.upload_file(query.path(), upload).await?;
    Ok(Json(ApiResponse::new(uploaded)))
}

async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> Result<Option<Upload>, ApiError> {
    let too_large = || {
        ApiError::payload_too_large(format!(
            "File too large (max {}MB)",
            max_bytes / 1024 / 1024
        ))
    };

    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return too_large();
        }
        tracing::warn!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("").to_string();
        let content = field.bytes().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                return too_large();
            }
            tracing::warn!("Failed to read file content: {}", e);
            ApiError::bad_request("Failed to read file")
        })?;

        if !file_name.is_empty() {
            upload = Some(Upload::new(file_name, content.to_vec()));
        }
    }

    Ok(upload)
}

/// GET|POST /api/generateSharedLink?path=&expires= - Issue a shared link.
pub async fn generate_shared_link(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SharedLinkQuery>,
) -> Result<Json<ApiResponse<SharedLinkResult>>, ApiError> {
    let expires = query.expires_in_minutes()?;
    let link = state
        .service
        .generate_shared_link(query.path()?, expires)
        .await?;
    Ok(Json(ApiResponse::new(link)))
}

/// GET /api/search?q= - Search folder and file names.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<SearchResults>>, ApiError> {
    let results = state
        .service
        .search(query.q.as_deref().unwrap_or(""))
        .await?;
    Ok(Json(ApiResponse::new(results)))
}

/// GET /api/verifyFolder?path= - Compare a folder's index with its directory.
pub async fn verify_folder(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FolderQuery>,
) -> Result<Json<ApiResponse<MirrorReport>>, ApiError> {
    let report = state.service.verify_folder(query.path()).await?;
    Ok(Json(ApiResponse::new(report)))
}

/// Any other /api/{operation}.
pub async fn unknown_operation(Path(operation): Path<String>) -> ApiError {
    tracing::debug!(operation = %operation, "Unknown API operation");
    ApiError::not_found("API method not found")
}

/// GET /{download_prefix}/{*path} - Serve a file by logical path.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Response<Body>, ApiError> {
    let download = state.service.open_download(&path).await?;
    file_response(download, Disposition::Inline)
}

/// GET /shared/{token} - Serve a file through a shared link.
pub async fn shared_download(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Response<Body>, ApiError> {
    let download = state.service.resolve_shared_link(&token).await?;
    file_response(download, Disposition::Attachment)
}

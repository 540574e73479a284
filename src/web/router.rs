//! Router configuration for the drive API.

use axum::{
    extract::DefaultBodyLimit,
    routing::{any, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    create_folder, download, file_info, generate_shared_link, list_folder, search,
    shared_download, unknown_operation, upload_file, verify_folder, AppState,
};
use super::middleware::create_cors_layer;

/// Create the main router.
///
/// Mounts the `/api/{operation}` endpoints, file downloads under
/// `/{download_prefix}/` and shared links under `/shared/`.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let upload_limit = app_state.max_upload_bytes;

    let api_routes = Router::new()
        .route("/listFolder", get(list_folder).post(list_folder))
        .route("/fileInfo", get(file_info).post(file_info))
        .route("/createFolder", get(create_folder).post(create_folder))
        .route(
            "/uploadFile",
            post(upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/generateSharedLink",
            get(generate_shared_link).post(generate_shared_link),
        )
        .route("/search", get(search))
        .route("/verifyFolder", get(verify_folder))
        .route("/:operation", any(unknown_operation));

    let download_route = format!("/{}/*path", app_state.service.download_prefix());

    Router::new()
        .nest("/api", api_routes)
        .route(&download_route, get(download))
        .route("/shared/:token", get(shared_download))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_health_router() {
        let _router = create_health_router();
        // Should not panic
    }
}

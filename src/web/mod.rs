//! HTTP layer for HDrive.
//!
//! Exposes the drive operations as `/api/{operation}` endpoints and serves
//! file downloads and shared links.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::{create_health_router, create_router};
pub use server::WebServer;

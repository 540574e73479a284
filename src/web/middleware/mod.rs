//! Middleware for the drive API.

mod cors;

pub use cors::create_cors_layer;

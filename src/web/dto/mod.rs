//! Data Transfer Objects for the drive API.

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;

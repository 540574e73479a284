//! HDrive - a web drive backed by a folder/file index.
//!
//! A relational index of folders, files and shared links is kept consistent
//! with a physical directory tree under a configured root. Every physical
//! path handed out stays inside that root.

pub mod activity;
pub mod config;
pub mod datetime;
pub mod db;
pub mod drive;
pub mod error;
pub mod logging;
pub mod web;

pub use activity::{ActivityEntry, ActivityLogger, ActivityRepository};
pub use config::Config;
pub use db::Database;
pub use drive::{
    DriveFile, DriveItem, DriveService, FilesystemMirror, Folder, PathResolver, ShareLinkIssuer,
    SharedLink, Upload,
};
pub use error::{DriveError, ErrorKind, Result};
pub use web::WebServer;

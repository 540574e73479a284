//! Drive module for HDrive.
//!
//! This module keeps a relational folder/file index consistent with a
//! physical directory tree:
//! - Logical path normalization and containment-checked physical resolution
//! - Folder, file and shared link repositories
//! - Async filesystem mirror
//! - The drive service that orders index and filesystem effects

mod file;
mod folder;
mod mirror;
pub mod path;
mod service;
mod share;

pub use file::{DriveFile, FileRepository, NewFile};
pub use folder::{Folder, FolderRepository, NewFolder};
pub use mirror::{FileStat, FilesystemMirror, MirrorEntry};
pub use path::PathResolver;
pub use service::{
    CreatedFolder, Download, DriveItem, DriveService, FileInfo, FolderListing, MirrorReport,
    SearchResults, SharedLinkResult, Upload, UploadedFile,
};
pub use share::{generate_token, ShareLinkIssuer, SharedLink, SharedLinkRepository, TOKEN_BYTES};

/// Extensions whose content fileInfo returns inline (compared case-insensitively).
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "js", "css", "html", "json"];

/// Maximum number of results per kind returned by a name search.
pub const SEARCH_LIMIT: i64 = 100;

/// Whether content with this extension is returned inline.
pub fn is_text_extension(extension: &str) -> bool {
    TEXT_EXTENSIONS
        .iter()
        .any(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Build a `%term%` LIKE pattern with `\`, `%` and `_` escaped.
///
/// Queries using it must declare `ESCAPE '\'`.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

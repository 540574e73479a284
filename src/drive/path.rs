//! Logical path normalization and physical path resolution.
//!
//! Logical paths are the stable identifiers stored in the index (`/`,
//! `/docs`, `/docs/reports/a.txt`). Physical paths are derived by joining a
//! logical path onto the drive root; every physical path handed out by
//! [`PathResolver`] is guaranteed to be the root itself or a descendant.

use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::{DriveError, Result};

/// Normalize a user-supplied logical path.
///
/// Surrounding slashes are trimmed, empty and `.` segments are dropped, and
/// the result carries exactly one leading slash. The root is `/`. `..`
/// segments are kept literally; [`PathResolver::resolve_physical`] decides
/// whether they stay inside the root.
pub fn normalize(raw: &str) -> String {
    let segments: Vec<&str> = raw
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    format!("/{}", segments.join("/"))
}

/// Compose a child logical path, avoiding a double slash under the root.
pub fn child_path(parent: &str, name: &str) -> String {
    format!("{}/{}", parent.trim_end_matches('/'), name)
}

/// Extension of a file name: the substring after the last `.`, case preserved.
///
/// Returns an empty string when the name has no dot.
pub fn extension_of(name: &str) -> &str {
    name.rfind('.').map(|i| &name[i + 1..]).unwrap_or("")
}

/// Validate a folder or file name and return it trimmed.
///
/// Names must be a single path segment: not empty, not `.` or `..`, and free
/// of separators and NUL bytes.
pub fn validate_name(raw: &str) -> Result<String> {
    let name = raw.trim();

    if name.is_empty() {
        return Err(DriveError::InvalidName("name is empty".to_string()));
    }
    if name == "." || name == ".." {
        return Err(DriveError::InvalidName(format!("'{name}' is reserved")));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(DriveError::InvalidName(format!(
            "'{name}' contains a path separator"
        )));
    }

    Ok(name.to_string())
}

/// Reduce a client-supplied upload name to its basename and validate it.
///
/// Both `/` and `\` count as separators, so `../../etc/passwd` and
/// `C:\temp\a.txt` become `passwd` and `a.txt`.
pub fn sanitize_file_name(raw: &str) -> Result<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    validate_name(base)
}

/// Maps logical paths onto the physical drive root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    /// Canonical physical root.
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver for the given root directory.
    ///
    /// The root must exist; it is canonicalized once so that later
    /// containment checks compare canonical paths.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().canonicalize()?;
        if !root.is_dir() {
            return Err(DriveError::Config("drive root is not a directory".to_string()));
        }
        Ok(Self { root })
    }

    /// The canonical physical root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a logical path to a canonical physical path under the root.
    ///
    /// `..` segments are applied lexically and may never climb above the
    /// root. The deepest existing ancestor of the target is then
    /// canonicalized, so a symlink inside the drive that points elsewhere is
    /// caught. Targets that do not exist yet (a folder about to be created)
    /// resolve to their would-be location.
    pub fn resolve_physical(&self, logical: &str) -> Result<PathBuf> {
        let violation = || DriveError::PathViolation(logical.to_string());

        let mut segments: Vec<&str> = Vec::new();
        for segment in logical.split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop().ok_or_else(violation)?;
                }
                s if s.contains('\0') => return Err(violation()),
                s => {
                    // Reject anything the platform would parse as more than a
                    // plain name (drive prefixes on Windows).
                    let mut components = Path::new(s).components();
                    match (components.next(), components.next()) {
                        (Some(Component::Normal(_)), None) => segments.push(s),
                        _ => return Err(violation()),
                    }
                }
            }
        }

        let mut existing = self.root.clone();
        let mut pending = segments.iter();
        let mut remainder: Vec<&str> = Vec::new();

        for &segment in pending.by_ref() {
            let candidate = existing.join(segment);
            match candidate.symlink_metadata() {
                Ok(_) => existing = candidate,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    remainder.push(segment);
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }
        remainder.extend(pending);

        let canonical = match existing.canonicalize() {
            Ok(path) => path,
            // Dangling symlink: its target is outside anything we can vouch for.
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(violation()),
            Err(e) => return Err(e.into()),
        };

        if !canonical.starts_with(&self.root) {
            warn!(
                logical = logical,
                resolved = %canonical.display(),
                "Rejected path outside the drive root"
            );
            return Err(violation());
        }

        Ok(remainder
            .into_iter()
            .fold(canonical, |path, segment| path.join(segment)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_resolver() -> (TempDir, PathResolver) {
        let temp_dir = TempDir::new().unwrap();
        let resolver = PathResolver::new(temp_dir.path()).unwrap();
        (temp_dir, resolver)
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("///"), "/");
        assert_eq!(normalize("docs"), "/docs");
        assert_eq!(normalize("/docs/"), "/docs");
        assert_eq!(normalize("docs//reports/./a.txt"), "/docs/reports/a.txt");
        assert_eq!(normalize("/docs/../x"), "/docs/../x");
    }

    #[test]
    fn test_normalize_idempotent() {
        for raw in ["", "/", "a", "/a/b/", "//a//./b", "../x", "a/../../b", " spaced /name "] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_child_path() {
        assert_eq!(child_path("/", "docs"), "/docs");
        assert_eq!(child_path("/docs", "reports"), "/docs/reports");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("a.txt"), "txt");
        assert_eq!(extension_of("README.MD"), "MD");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of("Makefile"), "");
        assert_eq!(extension_of(".env"), "env");
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  reports ").unwrap(), "reports");
        assert!(matches!(validate_name("   "), Err(DriveError::InvalidName(_))));
        assert!(matches!(validate_name(".."), Err(DriveError::InvalidName(_))));
        assert!(matches!(validate_name("a/b"), Err(DriveError::InvalidName(_))));
        assert!(matches!(validate_name("a\\b"), Err(DriveError::InvalidName(_))));
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("a.txt").unwrap(), "a.txt");
        assert_eq!(sanitize_file_name("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_file_name("C:\\temp\\a.txt").unwrap(), "a.txt");
        assert!(sanitize_file_name("dir/").is_err());
        assert!(sanitize_file_name("..").is_err());
    }

    #[test]
    fn test_resolve_root() {
        let (_temp_dir, resolver) = setup_resolver();
        assert_eq!(resolver.resolve_physical("/").unwrap(), resolver.root());
    }

    #[test]
    fn test_resolve_existing_and_missing() {
        let (_temp_dir, resolver) = setup_resolver();
        std::fs::create_dir(resolver.root().join("docs")).unwrap();

        assert_eq!(
            resolver.resolve_physical("/docs").unwrap(),
            resolver.root().join("docs")
        );
        assert_eq!(
            resolver.resolve_physical("/docs/reports/a.txt").unwrap(),
            resolver.root().join("docs").join("reports").join("a.txt")
        );
    }

    #[test]
    fn test_resolve_parent_segments_inside_root() {
        let (_temp_dir, resolver) = setup_resolver();
        assert_eq!(
            resolver.resolve_physical("/a/../b").unwrap(),
            resolver.root().join("b")
        );
    }

    #[test]
    fn test_resolve_traversal_rejected() {
        let (_temp_dir, resolver) = setup_resolver();

        for logical in ["/..", "/../etc/passwd", "/a/../../b", "../../", "/docs/..\\..\\x"] {
            let result = resolver.resolve_physical(logical);
            assert!(
                matches!(result, Err(DriveError::PathViolation(_))),
                "{logical:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_resolve_absolute_injection_stays_inside() {
        let (_temp_dir, resolver) = setup_resolver();
        let resolved = resolver.resolve_physical("//etc/passwd").unwrap();
        assert!(resolved.starts_with(resolver.root()));
    }

    #[test]
    fn test_resolve_nul_rejected() {
        let (_temp_dir, resolver) = setup_resolver();
        assert!(matches!(
            resolver.resolve_physical("/a\0b"),
            Err(DriveError::PathViolation(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_symlink_escape_rejected() {
        let (_temp_dir, resolver) = setup_resolver();
        let outside = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), resolver.root().join("escape")).unwrap();

        assert!(matches!(
            resolver.resolve_physical("/escape"),
            Err(DriveError::PathViolation(_))
        ));
        assert!(matches!(
            resolver.resolve_physical("/escape/new-folder"),
            Err(DriveError::PathViolation(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_symlink_inside_root_allowed() {
        let (_temp_dir, resolver) = setup_resolver();
        std::fs::create_dir(resolver.root().join("real")).unwrap();
        std::os::unix::fs::symlink(resolver.root().join("real"), resolver.root().join("alias"))
            .unwrap();

        assert_eq!(
            resolver.resolve_physical("/alias").unwrap(),
            resolver.root().join("real")
        );
    }

    #[test]
    fn test_resolve_never_escapes() {
        let (_temp_dir, resolver) = setup_resolver();
        let inputs = [
            "/", "a", "a/b/c", "../", "../../", "/a/../..", "./././", "a/./../b/../..",
            "..\\..", "/a//b/../../..", "%2e%2e/x", "/tmp", "/etc/../..",
        ];

        for raw in inputs {
            if let Ok(path) = resolver.resolve_physical(&normalize(raw)) {
                assert!(path.starts_with(resolver.root()), "{raw:?} escaped to {path:?}");
            }
        }
    }
}

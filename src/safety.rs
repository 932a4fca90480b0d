//! Refusal of filesystem roots as source or destination.
//!
//! The organizer has no idea which directories matter to the system, so the
//! one automatic guard it applies is refusing to operate on a root such as
//! `/` or `C:\`.

use std::path::{Path, PathBuf};

/// Resolves `path` to an absolute form, following symlinks when it exists.
///
/// Paths that don't exist yet (a destination about to be created) are made
/// absolute against the working directory and have `.`/`..` folded away.
pub fn resolve_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut folded = PathBuf::new();
    for component in absolute.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                folded.pop();
            }
            other => folded.push(other),
        }
    }
    folded
}

/// Root paths recognized on this host.
fn filesystem_roots() -> Vec<PathBuf> {
    #[cfg(windows)]
    {
        (b'A'..=b'Z')
            .flat_map(|drive| {
                let letter = drive as char;
                [
                    PathBuf::from(format!("{}:\\", letter)),
                    PathBuf::from(format!("{}:/", letter)),
                    PathBuf::from(format!("\\\\?\\{}:\\", letter)),
                ]
            })
            .collect()
    }
    #[cfg(not(windows))]
    {
        vec![PathBuf::from("/")]
    }
}

/// Returns true if `path` resolves to a filesystem root.
///
/// ```
/// use declutter::safety::is_unsafe_root;
/// use std::path::Path;
///
/// # #[cfg(unix)]
/// assert!(is_unsafe_root(Path::new("/")));
/// # #[cfg(unix)]
/// assert!(is_unsafe_root(Path::new("/tmp/..")));
/// ```
pub fn is_unsafe_root(path: &Path) -> bool {
    let resolved = resolve_path(path);
    resolved.parent().is_none() || filesystem_roots().iter().any(|root| *root == resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    #[test]
    fn test_posix_root_is_unsafe() {
        assert!(is_unsafe_root(Path::new("/")));
        assert!(is_unsafe_root(Path::new("//")));
        assert!(is_unsafe_root(Path::new("/usr/..")));
    }

    #[test]
    fn test_regular_directory_is_safe() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        assert!(!is_unsafe_root(temp_dir.path()));
        assert!(!is_unsafe_root(&temp_dir.path().join("not-created-yet")));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_nonexistent_folds_parent_components() {
        let resolved = resolve_path(Path::new("/nonexistent-declutter/a/../b/./c"));
        assert_eq!(resolved, PathBuf::from("/nonexistent-declutter/b/c"));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonexistent_path_escaping_to_root_is_unsafe() {
        assert!(is_unsafe_root(Path::new("/nonexistent-declutter/..")));
    }

    #[test]
    fn test_relative_path_resolves_absolute() {
        let resolved = resolve_path(Path::new("some-relative-dir-that-does-not-exist"));
        assert!(resolved.is_absolute());
    }
}

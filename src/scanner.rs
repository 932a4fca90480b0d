//! Directory traversal producing candidate files.
//!
//! Pruning happens in a `walkdir` filter predicate, so a directory is judged
//! before the walker ever descends into it.

use crate::category::CategoryTable;
use crate::config::CompiledFilters;
use crate::safety::resolve_path;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Tooling directories that are never descended into.
pub const IGNORED_DIRS: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    ".bzr",
    ".idea",
    ".vscode",
    ".vs",
    "__pycache__",
    "node_modules",
    ".venv",
    "venv",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    ".cargo",
];

/// Returns true if `name` is on the tooling ignore-list.
pub fn is_ignored_dir_name(name: &str) -> bool {
    IGNORED_DIRS.contains(&name)
}

/// Walks a source tree and yields the files eligible for organizing.
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
    filters: CompiledFilters,
    category_dirs: HashSet<PathBuf>,
    nested_destination: Option<PathBuf>,
    protected: HashSet<PathBuf>,
    max_depth: Option<usize>,
}

impl Scanner {
    /// Creates a scanner over `root`.
    ///
    /// Every folder `table` can produce under `destination` is pruned. When
    /// `destination` lies strictly inside `root`, its whole subtree is pruned
    /// as well. Both paths are expected to be resolved already.
    pub fn new(
        root: &Path,
        destination: &Path,
        table: &CategoryTable,
        filters: CompiledFilters,
    ) -> Self {
        let category_dirs = table
            .folder_names()
            .into_iter()
            .map(|name| destination.join(name))
            .collect();

        let nested_destination = (destination != root && destination.starts_with(root))
            .then(|| destination.to_path_buf());

        Self {
            root: root.to_path_buf(),
            filters,
            category_dirs,
            nested_destination,
            protected: HashSet::new(),
            max_depth: None,
        }
    }

    /// Limits descent: at depth 0 only the root's own files are scanned.
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Files that must never be yielded (the program, its log, journal, config).
    pub fn with_protected<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.protected
            .extend(paths.into_iter().map(|p| resolve_path(p.as_ref())));
        self
    }

    /// Lazily yields candidate files in file-name order.
    pub fn candidates(&self) -> impl Iterator<Item = PathBuf> + '_ {
        let mut walker = WalkDir::new(&self.root).sort_by_file_name();
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth + 1);
        }

        walker
            .into_iter()
            .filter_entry(|entry| self.admits(entry))
            .filter_map(|result| match result {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(DirEntry::into_path)
    }

    fn admits(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return true;
        }

        let path = entry.path();
        let relative = path.strip_prefix(&self.root).unwrap_or(path);

        if entry.file_type().is_dir() {
            return self.should_descend(entry, relative);
        }

        if self.protected.contains(path) {
            tracing::debug!(path = %path.display(), "skipping protected file");
            return false;
        }

        self.filters.admits(path, relative, false)
    }

    fn should_descend(&self, entry: &DirEntry, relative: &Path) -> bool {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy();

        if is_ignored_dir_name(&name) {
            tracing::debug!(path = %path.display(), "pruning tooling directory");
            return false;
        }

        if self.category_dirs.contains(path) {
            tracing::debug!(path = %path.display(), "pruning category folder");
            return false;
        }

        if self.nested_destination.as_deref() == Some(path) {
            tracing::debug!(path = %path.display(), "pruning destination root");
            return false;
        }

        self.filters.admits(path, relative, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExcludeRules, FilterRules};
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent");
        }
        fs::write(path, "x").expect("Failed to write file");
    }

    fn scan(scanner: &Scanner, root: &Path) -> Vec<String> {
        let mut found: Vec<String> = scanner
            .candidates()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        found.sort();
        found
    }

    fn default_scanner(root: &Path) -> Scanner {
        Scanner::new(
            root,
            root,
            &CategoryTable::default(),
            FilterRules::default().compile().unwrap(),
        )
    }

    #[test]
    fn test_recurses_and_skips_ignored_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let root = resolve_path(temp_dir.path());
        touch(&root, "a.jpg");
        touch(&root, "nested/deeper/b.txt");
        touch(&root, "node_modules/pkg/index.js");
        touch(&root, "__pycache__/mod.pyc");

        let found = scan(&default_scanner(&root), &root);
        assert_eq!(found, vec!["a.jpg", "nested/deeper/b.txt"]);
    }

    #[test]
    fn test_hidden_entries_excluded_by_default() {
        let temp_dir = TempDir::new().unwrap();
        let root = resolve_path(temp_dir.path());
        touch(&root, ".secret");
        touch(&root, ".config/settings.json");
        touch(&root, "visible.txt");

        let found = scan(&default_scanner(&root), &root);
        assert_eq!(found, vec!["visible.txt"]);

        let rules = FilterRules {
            include_hidden: true,
            ..Default::default()
        };
        let scanner = Scanner::new(
            &root,
            &root,
            &CategoryTable::default(),
            rules.compile().unwrap(),
        );
        assert_eq!(
            scan(&scanner, &root),
            vec![".config/settings.json", ".secret", "visible.txt"]
        );
    }

    #[test]
    fn test_exclude_patterns_prune_dirs_and_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = resolve_path(temp_dir.path());
        touch(&root, "keep.txt");
        touch(&root, "skip.tmp");
        touch(&root, "build/output.bin");

        let rules = FilterRules {
            exclude: ExcludeRules {
                patterns: vec!["*.tmp".to_string(), "build".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        let scanner = Scanner::new(
            &root,
            &root,
            &CategoryTable::default(),
            rules.compile().unwrap(),
        );
        assert_eq!(scan(&scanner, &root), vec!["keep.txt"]);
    }

    #[test]
    fn test_depth_limit() {
        let temp_dir = TempDir::new().unwrap();
        let root = resolve_path(temp_dir.path());
        touch(&root, "top.txt");
        touch(&root, "one/mid.txt");
        touch(&root, "one/two/low.txt");

        let scanner = default_scanner(&root).with_max_depth(Some(0));
        assert_eq!(scan(&scanner, &root), vec!["top.txt"]);

        let scanner = default_scanner(&root).with_max_depth(Some(1));
        assert_eq!(scan(&scanner, &root), vec!["one/mid.txt", "top.txt"]);
    }

    #[test]
    fn test_category_folders_are_pruned() {
        let temp_dir = TempDir::new().unwrap();
        let root = resolve_path(temp_dir.path());
        touch(&root, "Images/old.jpg");
        touch(&root, "Others/thing.xyz");
        touch(&root, "Projects/Images/kept.jpg");
        touch(&root, "new.jpg");

        let found = scan(&default_scanner(&root), &root);
        assert_eq!(found, vec!["Projects/Images/kept.jpg", "new.jpg"]);
    }

    #[test]
    fn test_nested_destination_is_pruned() {
        let temp_dir = TempDir::new().unwrap();
        let root = resolve_path(temp_dir.path());
        let destination = root.join("sorted");
        touch(&root, "a.jpg");
        touch(&root, "sorted/Images/a.jpg");
        touch(&root, "sorted/loose.txt");

        let scanner = Scanner::new(
            &root,
            &destination,
            &CategoryTable::default(),
            FilterRules::default().compile().unwrap(),
        );
        assert_eq!(scan(&scanner, &root), vec!["a.jpg"]);
    }

    #[test]
    fn test_protected_files_never_yielded() {
        let temp_dir = TempDir::new().unwrap();
        let root = resolve_path(temp_dir.path());
        touch(&root, "journal.json");
        touch(&root, "declutter.log");
        touch(&root, "photo.png");

        let scanner =
            default_scanner(&root).with_protected([root.join("journal.json"), root.join("declutter.log")]);
        assert_eq!(scan(&scanner, &root), vec!["photo.png"]);
    }

    #[test]
    fn test_ignored_dir_names() {
        assert!(is_ignored_dir_name(".git"));
        assert!(is_ignored_dir_name("node_modules"));
        assert!(!is_ignored_dir_name("src"));
    }
}

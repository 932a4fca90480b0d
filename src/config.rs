//! Configuration file support: category definitions and file filtering rules.
//!
//! Configuration is stored in TOML:
//!
//! ```toml
//! merge_with_defaults = false
//!
//! [categories]
//! Images = [".jpg", ".png"]
//! Ebooks = [".epub", ".mobi"]
//!
//! [filters]
//! include_hidden = false
//!
//! [filters.exclude]
//! filenames = [".DS_Store", "Thumbs.db"]
//! patterns = ["*.tmp", "**/build/**"]
//! extensions = ["part", "crdownload"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//! ```
//!
//! A broken or missing file is never fatal: [`ConfigFile::load_or_default`]
//! logs a warning and returns the built-in defaults. Individual category
//! entries that fail validation are dropped one by one.

use crate::category::{CategoryIssue, CategoryTable};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory when no path is given.
pub const LOCAL_CONFIG_NAME: &str = ".declutter.toml";

/// Errors that can occur while loading configuration or compiling filters.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// The file exists but could not be read.
    #[error("failed to read configuration {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Invalid TOML syntax or structure.
    #[error("invalid configuration {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Invalid glob pattern provided.
    #[error("invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),
    /// Invalid regex pattern provided with the actual error reason.
    #[error("invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    /// Union custom categories into the built-in table instead of replacing it.
    #[serde(default)]
    pub merge_with_defaults: bool,

    /// Category name to extension list. Values are checked one by one so a
    /// single bad entry doesn't invalidate the whole file.
    #[serde(default)]
    pub categories: BTreeMap<String, toml::Value>,

    #[serde(default)]
    pub filters: FilterRules,

    /// Top-level keys this version doesn't know. They are logged and ignored.
    #[serde(flatten)]
    pub unknown: BTreeMap<String, toml::Value>,
}

/// Root-level filter rules configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether hidden entries (starting with ".") are scanned. Defaults to false.
    #[serde(default)]
    pub include_hidden: bool,

    /// Rules for excluding entries.
    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Rules for including files (whitelist, overrides exclude rules).
    #[serde(default)]
    pub include: IncludeRules,
}

/// Rules for excluding entries from organization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact names to exclude (e.g., ".DS_Store", "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns, matched against the bare name and the full path.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File extensions to exclude, with or without the dot.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns matched against the bare name.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Rules for including files, overriding exclude rules (whitelist).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncludeRules {
    /// Glob patterns that override exclude rules.
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl ConfigFile {
    /// Finds the configuration file to use.
    ///
    /// Order: the explicit path, `./.declutter.toml`, then
    /// `<config dir>/declutter/config.toml`.
    pub fn discover(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        let local = PathBuf::from(LOCAL_CONFIG_NAME);
        if local.is_file() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|dir| dir.join("declutter").join("config.toml"))
            .filter(|path| path.is_file())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        for key in config.unknown.keys() {
            tracing::warn!(path = %path.display(), key = %key, "ignoring unknown configuration key");
        }
        Ok(config)
    }

    /// Loads `path` if given, falling back to defaults on any error.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match Self::load_from_file(path) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded configuration");
                config
            }
            Err(e) => {
                tracing::warn!(error = %e, "using built-in configuration");
                Self::default()
            }
        }
    }

    /// Splits the raw category values into typed entries.
    ///
    /// Non-list values and non-string elements are reported and dropped.
    pub fn category_entries(&self) -> (Vec<(String, Vec<String>)>, Vec<CategoryIssue>) {
        let mut entries = Vec::new();
        let mut issues = Vec::new();

        for (name, value) in &self.categories {
            let Some(items) = value.as_array() else {
                issues.push(CategoryIssue::NotAList {
                    category: name.clone(),
                });
                continue;
            };

            let mut extensions = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str() {
                    Some(ext) => extensions.push(ext.to_string()),
                    None => issues.push(CategoryIssue::NotAString {
                        category: name.clone(),
                        value: item.to_string(),
                    }),
                }
            }
            entries.push((name.clone(), extensions));
        }

        (entries, issues)
    }

    /// Builds the validated category table.
    ///
    /// `force_merge` enables merge mode even if the file doesn't ask for it.
    /// Every dropped entry is logged as a warning and returned.
    pub fn category_table(&self, force_merge: bool) -> (CategoryTable, Vec<CategoryIssue>) {
        if self.categories.is_empty() {
            return (CategoryTable::default(), Vec::new());
        }

        let (entries, mut issues) = self.category_entries();
        let (table, table_issues) = if self.merge_with_defaults || force_merge {
            CategoryTable::merged_with_defaults(entries)
        } else {
            CategoryTable::from_entries(entries)
        };
        issues.extend(table_issues);

        for issue in &issues {
            tracing::warn!(%issue, "dropped category entry");
        }

        (table, issues)
    }
}

impl FilterRules {
    /// Compile rules into optimized filter structures for matching.
    pub fn compile(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(self)
    }
}

/// Compiled, optimized filter structures for efficient matching.
#[derive(Debug, Clone)]
pub struct CompiledFilters {
    include_hidden: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
        })
        .collect()
}

impl CompiledFilters {
    fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            include_hidden: rules.include_hidden,
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns: compile_globs(&rules.exclude.patterns)?,
            exclude_regexes,
            include_patterns: compile_globs(&rules.include.patterns)?,
        })
    }

    /// Whether hidden entries take part in the run.
    pub fn include_hidden(&self) -> bool {
        self.include_hidden
    }

    /// Check if a file should be included in organization (not excluded).
    ///
    /// Equivalent to [`Self::admits`] with the path used as its own relative
    /// path.
    pub fn should_include(&self, file_path: &Path) -> bool {
        self.admits(file_path, file_path, false)
    }

    /// Decides whether an entry passes the filters.
    ///
    /// Checks run in this order, with early termination:
    /// 1. Include patterns (whitelist) - if matched, always include
    /// 2. Hidden filter - if hidden and disabled, exclude
    /// 3. Exact name match - if matched, exclude
    /// 4. Extension match (files only) - if matched, exclude
    /// 5. Glob match on name, full path, or path relative to the scan root
    /// 6. Regex match on the name
    pub fn admits(&self, path: &Path, relative: &Path, is_dir: bool) -> bool {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.matches_any(&self.include_patterns, &name, path, relative) {
            return true;
        }

        if !self.include_hidden && name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(name.as_ref()) {
            return false;
        }

        if !is_dir
            && let Some(ext) = path.extension()
            && self
                .exclude_extensions
                .contains(&ext.to_string_lossy().to_lowercase())
        {
            return false;
        }

        if self.matches_any(&self.exclude_patterns, &name, path, relative) {
            return false;
        }

        !self.exclude_regexes.iter().any(|regex| regex.is_match(&name))
    }

    fn matches_any(&self, patterns: &[Pattern], name: &str, path: &Path, relative: &Path) -> bool {
        patterns.iter().any(|pattern| {
            pattern.matches(name) || pattern.matches_path(path) || pattern.matches_path(relative)
        })
    }
}

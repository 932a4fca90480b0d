//! Run statistics and the structured run report.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Counters accumulated over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Candidate files produced by the scanner.
    pub scanned: usize,
    pub moved: usize,
    pub copied: usize,
    /// Files whose destination name had to be disambiguated.
    pub renamed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Empty directories removed (or that would be, in a dry run).
    pub removed_dirs: usize,
    /// Files per category, counted for planned operations in dry runs and
    /// for completed operations otherwise.
    pub by_category: BTreeMap<String, usize>,
}

impl RunSummary {
    pub fn record_category(&mut self, category: &str) {
        *self.by_category.entry(category.to_string()).or_insert(0) += 1;
    }

    /// Files that were (or would be) placed into a category folder.
    pub fn organized(&self) -> usize {
        self.by_category.values().sum()
    }
}

/// Whether files are moved or copied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    #[default]
    Move,
    Copy,
}

impl std::fmt::Display for OperationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Move => write!(f, "move"),
            Self::Copy => write!(f, "copy"),
        }
    }
}

/// A [`RunSummary`] together with the run metadata, ready to render or dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: String,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub mode: OperationMode,
    pub dry_run: bool,
    /// Journal key of the session written by this run, if any.
    pub session: Option<String>,
    pub summary: RunSummary,
}

impl RunReport {
    pub fn new(
        source: &Path,
        destination: &Path,
        mode: OperationMode,
        dry_run: bool,
        summary: RunSummary,
    ) -> Self {
        Self {
            generated_at: chrono::Local::now().to_rfc3339(),
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            mode,
            dry_run,
            session: None,
            summary,
        }
    }

    /// Writes the report as pretty JSON, creating parent directories.
    pub fn write_json(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        fs::write(path, json)
    }
}

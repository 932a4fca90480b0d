/// Persistent move journal and rollback.
///
/// Every real organize run that moved at least one file leaves a [`Session`]
/// in the journal file. A session can later be reversed with
/// [`Journal::rollback`], which moves each file back to where it came from,
/// last move first.
///
/// The whole journal is read at the start of every journal-touching call and
/// rewritten in full after each mutation, so only one process should use a
/// journal file at a time.
use crate::naming;
use crate::organizer::move_file;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// One reversible move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// Where the file was before the run.
    pub src: PathBuf,
    /// Where the run put it.
    pub dst: PathBuf,
}

/// All moves of one real run, keyed by a creation-ordered timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub timestamp: String,
    pub source_root: PathBuf,
    pub destination_root: PathBuf,
    pub moves: Vec<MoveRecord>,
}

/// Read-only view of a session for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub timestamp: String,
    pub source_root: PathBuf,
    pub destination_root: PathBuf,
    pub move_count: usize,
}

/// Errors raised by journal operations.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    /// The journal is missing or holds no sessions.
    #[error("no organize history available")]
    NoHistoryAvailable,
    /// No stored session carries the requested timestamp.
    #[error("no session with timestamp '{0}'")]
    SessionNotFound(String),
    #[error("failed to read journal {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write journal {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The journal file is not valid JSON of the expected shape.
    #[error("journal {} is corrupted: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Which session a rollback reverses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackTarget {
    Latest,
    Timestamp(String),
}

impl FromStr for RollbackTarget {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("latest") {
            Ok(Self::Latest)
        } else {
            Ok(Self::Timestamp(s.to_string()))
        }
    }
}

impl fmt::Display for RollbackTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Timestamp(ts) => write!(f, "{}", ts),
        }
    }
}

/// Represents the result of a rollback.
#[derive(Debug, Default)]
pub struct RollbackReport {
    /// Timestamp of the session that was reversed.
    pub timestamp: String,
    /// Number of files moved back (or that would be, in a dry run).
    pub restored: usize,
    /// Restorations that landed under a new name: (original path, actual path).
    pub renamed: Vec<(PathBuf, PathBuf)>,
    /// Records whose file was no longer at its recorded destination.
    pub skipped: Vec<(PathBuf, String)>,
    /// Records that could not be restored; they stay in the journal.
    pub failed: Vec<(PathBuf, String)>,
    pub dry_run: bool,
}

impl RollbackReport {
    fn new(timestamp: String, dry_run: bool) -> Self {
        Self {
            timestamp,
            dry_run,
            ..Default::default()
        }
    }

    /// Returns the total number of records processed.
    pub fn total_processed(&self) -> usize {
        self.restored + self.failed.len() + self.skipped.len()
    }

    /// Returns true if every record was restored.
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

enum RestoreFailure {
    Vanished,
    Failed(String),
}

/// Handle on a journal file.
#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<local data dir>/declutter/journal.json`, or a file in the working
    /// directory when the platform has no data dir.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .map(|dir| dir.join("declutter").join("journal.json"))
            .unwrap_or_else(|| PathBuf::from(".declutter_journal.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads every stored session in append order. A missing file is an
    /// empty journal.
    pub fn load(&self) -> Result<Vec<Session>, JournalError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|source| JournalError::Read {
            path: self.path.clone(),
            source,
        })?;

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|source| JournalError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Rewrites the journal through a temporary file and a rename.
    fn save(&self, sessions: &[Session]) -> Result<(), JournalError> {
        let write_err = |source| JournalError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let json = serde_json::to_string_pretty(sessions)
            .map_err(|e| write_err(std::io::Error::other(e)))?;

        let mut tmp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "journal.json".into());
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        fs::write(&tmp_path, json).map_err(write_err)?;
        fs::rename(&tmp_path, &self.path).map_err(write_err)?;
        Ok(())
    }

    /// Stores a new session and returns it.
    ///
    /// The timestamp is the current local time, bumped past the newest
    /// stored key if the clock hasn't moved on, so keys stay unique and
    /// increasing.
    pub fn append(
        &self,
        source_root: &Path,
        destination_root: &Path,
        moves: Vec<MoveRecord>,
    ) -> Result<Session, JournalError> {
        let mut sessions = self.load()?;
        let timestamp = next_timestamp(
            Local::now().naive_local(),
            sessions.last().map(|s| s.timestamp.as_str()),
        );

        let session = Session {
            timestamp,
            source_root: source_root.to_path_buf(),
            destination_root: destination_root.to_path_buf(),
            moves,
        };
        sessions.push(session.clone());
        self.save(&sessions)?;

        tracing::info!(
            session = %session.timestamp,
            moves = session.moves.len(),
            journal = %self.path.display(),
            "session recorded"
        );
        Ok(session)
    }

    /// Lists stored sessions, oldest first.
    pub fn list(&self) -> Result<Vec<SessionInfo>, JournalError> {
        Ok(self
            .load()?
            .into_iter()
            .map(|s| SessionInfo {
                move_count: s.moves.len(),
                timestamp: s.timestamp,
                source_root: s.source_root,
                destination_root: s.destination_root,
            })
            .collect())
    }

    /// Reverses one session.
    ///
    /// Records are processed last to first. A file missing from its recorded
    /// destination is skipped. When the original location is occupied, the
    /// file is restored under a disambiguated name. Parent directories are
    /// recreated as needed.
    ///
    /// Afterwards the session is removed from the journal. Records that
    /// failed with an I/O error are kept under the same timestamp so the
    /// rollback can be retried. A dry run only reports and never touches
    /// files or the journal.
    ///
    /// # Errors
    ///
    /// [`JournalError::NoHistoryAvailable`] for an empty journal and
    /// [`JournalError::SessionNotFound`] for an unknown timestamp; neither
    /// mutates anything.
    pub fn rollback(
        &self,
        target: &RollbackTarget,
        dry_run: bool,
    ) -> Result<RollbackReport, JournalError> {
        let mut sessions = self.load()?;
        if sessions.is_empty() {
            return Err(JournalError::NoHistoryAvailable);
        }

        let index = match target {
            RollbackTarget::Latest => sessions.len() - 1,
            RollbackTarget::Timestamp(ts) => sessions
                .iter()
                .position(|s| &s.timestamp == ts)
                .ok_or_else(|| JournalError::SessionNotFound(ts.clone()))?,
        };

        let session = &sessions[index];
        tracing::info!(
            session = %session.timestamp,
            moves = session.moves.len(),
            dry_run,
            "rolling back session"
        );

        let mut report = RollbackReport::new(session.timestamp.clone(), dry_run);
        let mut planned = HashSet::new();
        let mut unresolved = Vec::new();

        for record in session.moves.iter().rev() {
            match restore_record(record, dry_run, &mut planned) {
                Ok(restored_to) => {
                    report.restored += 1;
                    if restored_to != record.src {
                        report.renamed.push((record.src.clone(), restored_to));
                    }
                }
                Err(RestoreFailure::Vanished) => {
                    tracing::warn!(
                        dst = %record.dst.display(),
                        "file no longer at recorded location, skipping"
                    );
                    report.skipped.push((
                        record.dst.clone(),
                        "File not found at recorded location".to_string(),
                    ));
                }
                Err(RestoreFailure::Failed(reason)) => {
                    tracing::error!(
                        src = %record.src.display(),
                        dst = %record.dst.display(),
                        %reason,
                        "failed to restore file"
                    );
                    report.failed.push((record.dst.clone(), reason));
                    unresolved.push(record.clone());
                }
            }
        }

        if dry_run {
            return Ok(report);
        }

        if unresolved.is_empty() {
            sessions.remove(index);
        } else {
            unresolved.reverse();
            sessions[index].moves = unresolved;
        }
        self.save(&sessions)?;

        Ok(report)
    }
}

/// Moves one record's file back, returning the path it was restored to.
fn restore_record(
    record: &MoveRecord,
    dry_run: bool,
    planned: &mut HashSet<PathBuf>,
) -> Result<PathBuf, RestoreFailure> {
    match fs::symlink_metadata(&record.dst) {
        Ok(meta) if !meta.is_dir() => {}
        _ => return Err(RestoreFailure::Vanished),
    }

    let (Some(parent), Some(file_name)) = (record.src.parent(), record.src.file_name()) else {
        return Err(RestoreFailure::Failed(
            "recorded source has no parent directory".to_string(),
        ));
    };

    let name = naming::resolve_with(parent, &file_name.to_string_lossy(), |candidate| {
        candidate.symlink_metadata().is_ok() || planned.contains(candidate)
    })
    .map_err(|e| RestoreFailure::Failed(e.to_string()))?;
    let target = parent.join(name);

    if target != record.src {
        tracing::warn!(
            original = %record.src.display(),
            restored_as = %target.display(),
            "original location is occupied, restoring under a new name"
        );
    }

    if dry_run {
        tracing::info!(from = %record.dst.display(), to = %target.display(), "would restore");
        planned.insert(target.clone());
        return Ok(target);
    }

    fs::create_dir_all(parent).map_err(|e| {
        RestoreFailure::Failed(format!("could not create {}: {}", parent.display(), e))
    })?;
    move_file(&record.dst, &target)
        .map_err(|e| RestoreFailure::Failed(format!("failed to restore file: {}", e)))?;

    tracing::info!(from = %record.dst.display(), to = %target.display(), "restored");
    Ok(target)
}

/// Produces a key strictly greater than `last`.
fn next_timestamp(now: NaiveDateTime, last: Option<&str>) -> String {
    let mut stamp = now;
    if let Some(last) = last.and_then(|l| NaiveDateTime::parse_from_str(l, TIMESTAMP_FORMAT).ok())
        && stamp <= last
    {
        stamp = last + chrono::Duration::microseconds(1);
    }
    stamp.format(TIMESTAMP_FORMAT).to_string()
}

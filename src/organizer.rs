/// Organize runs: classify, place, record.
///
/// [`FileOrganizer::run`] takes a fully populated [`OrganizeRequest`], checks
/// it against the safety rules, then moves or copies every candidate file into
/// its category folder (or only reports what it would do in a dry run).
/// Every real move lands in a ledger that is stored in the [`Journal`] as one
/// session once all files have been processed.
use crate::category::CategoryTable;
use crate::config::{CompiledFilters, ConfigError, FilterRules};
use crate::journal::{Journal, JournalError, MoveRecord};
use crate::naming::{self, NamingError};
use crate::safety::{is_unsafe_root, resolve_path};
use crate::scanner::{Scanner, is_ignored_dir_name};
use crate::summary::{OperationMode, RunReport, RunSummary};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Everything one run needs. The CLI layer builds it; the organizer never
/// reads arguments or the environment itself.
#[derive(Debug, Clone)]
pub struct OrganizeRequest {
    pub source: PathBuf,
    /// Where category folders are created. Defaults to `source`.
    pub destination: Option<PathBuf>,
    pub dry_run: bool,
    /// A real run is refused unless this is set.
    pub confirmed: bool,
    pub mode: OperationMode,
    pub cleanup_empty_dirs: bool,
    /// Exclude patterns, hidden-file policy and friends.
    pub filters: FilterRules,
    /// `Some(0)` limits the run to the source's own files.
    pub max_depth: Option<usize>,
    pub categories: CategoryTable,
    /// Where to write the JSON run report, if anywhere.
    pub report: Option<PathBuf>,
    /// Files that are never candidates, such as the program, its log and config.
    /// The journal the run records into is always protected.
    pub protected_paths: Vec<PathBuf>,
}

impl OrganizeRequest {
    /// A dry run over `source` with default categories and filters.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: None,
            dry_run: true,
            confirmed: false,
            mode: OperationMode::Move,
            cleanup_empty_dirs: false,
            filters: FilterRules::default(),
            max_depth: None,
            categories: CategoryTable::default(),
            report: None,
            protected_paths: Vec::new(),
        }
    }

    pub fn destination_root(&self) -> &Path {
        self.destination.as_deref().unwrap_or(&self.source)
    }
}

/// Errors that abort a run before any file is touched.
#[derive(Debug, thiserror::Error)]
pub enum OrganizeError {
    /// Source or destination resolves to a filesystem root.
    #[error("refusing to operate on {role} {}: it is a filesystem root", path.display())]
    UnsafeRoot { role: &'static str, path: PathBuf },
    /// Real run requested without confirmation.
    #[error("a real run needs explicit confirmation (or use a dry run)")]
    NotConfirmed,
    #[error("source {} is not an accessible directory", path.display())]
    InvalidSource { path: PathBuf },
    #[error("invalid filter: {0}")]
    InvalidFilter(#[from] ConfigError),
}

/// Why a single file could not be placed.
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error(transparent)]
    Naming(#[from] NamingError),
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to {mode} {} to {}: {source}", from.display(), to.display())]
    Transfer {
        mode: OperationMode,
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}

/// Why a candidate was left where it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The file already sits in its own category folder.
    AlreadyOrganized,
    /// The category path exists but is not a directory.
    CategoryPathNotDir(PathBuf),
}

/// What happened to one candidate file.
#[derive(Debug)]
pub enum ItemOutcome {
    Moved {
        from: PathBuf,
        to: PathBuf,
        category: String,
        renamed: bool,
    },
    Copied {
        from: PathBuf,
        to: PathBuf,
        category: String,
        renamed: bool,
    },
    /// Dry run: the operation that would have been performed.
    Planned {
        from: PathBuf,
        to: PathBuf,
        category: String,
        renamed: bool,
        mode: OperationMode,
    },
    Skipped {
        path: PathBuf,
        reason: SkipReason,
    },
    Failed {
        path: PathBuf,
        error: ItemError,
    },
}

/// Progress hook for callers that want to display a run as it happens.
pub trait RunObserver {
    fn on_start(&self, _total: usize) {}
    fn on_item(&self, _outcome: &ItemOutcome) {}
    fn on_dir_removed(&self, _path: &Path, _dry_run: bool) {}
    fn on_finish(&self, _summary: &RunSummary) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Result of a finished run.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    /// Set when moves happened but the session could not be stored.
    pub journal_error: Option<JournalError>,
}

/// Per-run mutable state.
#[derive(Default)]
struct Ledger {
    summary: RunSummary,
    moves: Vec<MoveRecord>,
    /// Dry run: destinations already promised to earlier files.
    planned: HashSet<PathBuf>,
    /// Dry run: sources that would have been moved away.
    vacated: HashSet<PathBuf>,
}

/// Organizes files by moving them into category subdirectories.
pub struct FileOrganizer<'a> {
    request: &'a OrganizeRequest,
    journal: &'a Journal,
    observer: &'a dyn RunObserver,
}

impl<'a> FileOrganizer<'a> {
    pub fn new(request: &'a OrganizeRequest, journal: &'a Journal) -> Self {
        Self {
            request,
            journal,
            observer: &NoopObserver,
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn RunObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Performs the run.
    ///
    /// Safety checks come first: both roots are tested with
    /// [`is_unsafe_root`], then a real run must be confirmed. Nothing on disk
    /// changes if any check fails. Per-file failures don't abort the run;
    /// they are logged, counted, and left out of the ledger.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use declutter::journal::Journal;
    /// use declutter::organizer::{FileOrganizer, OrganizeRequest};
    ///
    /// let request = OrganizeRequest::new("/home/user/Downloads");
    /// let journal = Journal::new("/home/user/.local/share/declutter/journal.json");
    /// let outcome = FileOrganizer::new(&request, &journal).run().unwrap();
    /// println!("{} files would be organized", outcome.report.summary.organized());
    /// ```
    pub fn run(&self) -> Result<RunOutcome, OrganizeError> {
        let request = self.request;

        if is_unsafe_root(&request.source) {
            tracing::error!(path = %request.source.display(), "source is a filesystem root");
            return Err(OrganizeError::UnsafeRoot {
                role: "source",
                path: request.source.clone(),
            });
        }
        if is_unsafe_root(request.destination_root()) {
            tracing::error!(
                path = %request.destination_root().display(),
                "destination is a filesystem root"
            );
            return Err(OrganizeError::UnsafeRoot {
                role: "destination",
                path: request.destination_root().to_path_buf(),
            });
        }
        if !request.dry_run && !request.confirmed {
            return Err(OrganizeError::NotConfirmed);
        }

        let source = resolve_path(&request.source);
        if !source.is_dir() {
            return Err(OrganizeError::InvalidSource { path: source });
        }

        let filters = request.filters.compile()?;

        // Created lazily with the first category folder.
        let destination = resolve_path(request.destination_root());

        tracing::info!(
            source = %source.display(),
            destination = %destination.display(),
            mode = %request.mode,
            dry_run = request.dry_run,
            "starting organize run"
        );

        let candidates: Vec<PathBuf> =
            Scanner::new(&source, &destination, &request.categories, filters.clone())
                .with_max_depth(request.max_depth)
                .with_protected(&request.protected_paths)
                .with_protected([self.journal.path()])
                .candidates()
                .collect();

        let mut ledger = Ledger::default();
        ledger.summary.scanned = candidates.len();
        self.observer.on_start(candidates.len());

        for path in &candidates {
            let outcome = self.process(path, &destination, &mut ledger);
            self.observer.on_item(&outcome);
        }

        let mut report = RunReport::new(
            &source,
            &destination,
            request.mode,
            request.dry_run,
            RunSummary::default(),
        );
        let mut journal_error = None;

        if !request.dry_run && request.mode == OperationMode::Move && !ledger.moves.is_empty() {
            let moves = std::mem::take(&mut ledger.moves);
            match self.journal.append(&source, &destination, moves.clone()) {
                Ok(session) => report.session = Some(session.timestamp),
                Err(e) => {
                    tracing::error!(error = %e, "moves could not be recorded; they cannot be rolled back");
                    for record in &moves {
                        tracing::error!(
                            src = %record.src.display(),
                            dst = %record.dst.display(),
                            "unrecorded move"
                        );
                    }
                    journal_error = Some(e);
                }
            }
        }

        if request.cleanup_empty_dirs {
            self.remove_empty_dirs(&source, &destination, &filters, &mut ledger);
        }

        report.summary = ledger.summary;

        if let Some(path) = &request.report {
            match report.write_json(path) {
                Ok(()) => tracing::info!(path = %path.display(), "run report written"),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "could not write run report")
                }
            }
        }

        self.observer.on_finish(&report.summary);
        Ok(RunOutcome {
            report,
            journal_error,
        })
    }

    fn process(&self, path: &Path, destination: &Path, ledger: &mut Ledger) -> ItemOutcome {
        let request = self.request;
        let category = request.categories.classify_path(path);
        let folder = destination.join(category);

        if path.parent() == Some(folder.as_path()) {
            tracing::debug!(path = %path.display(), category, "already organized");
            ledger.summary.skipped += 1;
            return ItemOutcome::Skipped {
                path: path.to_path_buf(),
                reason: SkipReason::AlreadyOrganized,
            };
        }

        if folder.exists() && !folder.is_dir() {
            tracing::warn!(
                path = %path.display(),
                folder = %folder.display(),
                "category path exists but is not a directory, skipping"
            );
            ledger.summary.skipped += 1;
            return ItemOutcome::Skipped {
                path: path.to_path_buf(),
                reason: SkipReason::CategoryPathNotDir(folder),
            };
        }

        match self.place(path, &folder, ledger) {
            Ok((to, renamed)) => {
                if renamed {
                    ledger.summary.renamed += 1;
                }
                ledger.summary.record_category(category);
                let (from, category) = (path.to_path_buf(), category.to_string());

                if request.dry_run {
                    ItemOutcome::Planned {
                        from,
                        to,
                        category,
                        renamed,
                        mode: request.mode,
                    }
                } else if request.mode == OperationMode::Move {
                    ledger.summary.moved += 1;
                    ledger.moves.push(MoveRecord {
                        src: from.clone(),
                        dst: to.clone(),
                    });
                    ItemOutcome::Moved {
                        from,
                        to,
                        category,
                        renamed,
                    }
                } else {
                    ledger.summary.copied += 1;
                    ItemOutcome::Copied {
                        from,
                        to,
                        category,
                        renamed,
                    }
                }
            }
            Err(error) => {
                tracing::error!(path = %path.display(), %error, "could not organize file");
                ledger.summary.failed += 1;
                ItemOutcome::Failed {
                    path: path.to_path_buf(),
                    error,
                }
            }
        }
    }

    /// Resolves the final name and performs (or simulates) the transfer.
    fn place(
        &self,
        path: &Path,
        folder: &Path,
        ledger: &mut Ledger,
    ) -> Result<(PathBuf, bool), ItemError> {
        let request = self.request;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let name = if request.dry_run {
            naming::resolve_with(folder, &file_name, |candidate| {
                candidate.symlink_metadata().is_ok() || ledger.planned.contains(candidate)
            })?
        } else {
            naming::resolve(folder, &file_name)?
        };
        let target = folder.join(&name);
        let renamed = name != file_name;

        if renamed {
            tracing::warn!(
                file = %file_name,
                renamed_to = %name,
                folder = %folder.display(),
                "name conflict, using a numbered name"
            );
        }

        if request.dry_run {
            tracing::info!(
                from = %path.display(),
                to = %target.display(),
                mode = %request.mode,
                "would place file"
            );
            ledger.planned.insert(target.clone());
            if request.mode == OperationMode::Move {
                ledger.vacated.insert(path.to_path_buf());
            }
            return Ok((target, renamed));
        }

        if !folder.exists() {
            fs::create_dir_all(folder).map_err(|source| ItemError::CreateDir {
                path: folder.to_path_buf(),
                source,
            })?;
            tracing::info!(folder = %folder.display(), "created category folder");
        }

        let result = match request.mode {
            OperationMode::Move => move_file(path, &target),
            OperationMode::Copy => fs::copy(path, &target).map(|_| ()),
        };
        result.map_err(|source| ItemError::Transfer {
            mode: request.mode,
            from: path.to_path_buf(),
            to: target.clone(),
            source,
        })?;

        tracing::info!(
            from = %path.display(),
            to = %target.display(),
            mode = %request.mode,
            "placed file"
        );
        Ok((target, renamed))
    }

    /// Removes empty directories under `root`, deepest first.
    ///
    /// The root, the destination, tooling directories and anything the
    /// filters exclude are left alone. In a dry run a directory counts as
    /// empty when everything in it would have been moved out or removed.
    fn remove_empty_dirs(
        &self,
        root: &Path,
        destination: &Path,
        filters: &CompiledFilters,
        ledger: &mut Ledger,
    ) {
        let dry_run = self.request.dry_run;
        let mut gone = std::mem::take(&mut ledger.vacated);

        let walker = WalkDir::new(root)
            .contents_first(true)
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                let path = entry.path();
                let relative = path.strip_prefix(root).unwrap_or(path);
                !is_ignored_dir_name(&entry.file_name().to_string_lossy())
                    && filters.admits(path, relative, true)
            });

        for entry in walker.filter_map(Result::ok) {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                continue;
            }
            let path = entry.path();
            if path == destination {
                continue;
            }

            let empty = match fs::read_dir(path) {
                Ok(children) => children
                    .filter_map(Result::ok)
                    .all(|child| gone.contains(&child.path())),
                Err(_) => false,
            };
            if !empty {
                continue;
            }

            if dry_run {
                tracing::info!(path = %path.display(), "would remove empty directory");
            } else if let Err(e) = fs::remove_dir(path) {
                tracing::warn!(path = %path.display(), error = %e, "could not remove empty directory");
                continue;
            } else {
                tracing::info!(path = %path.display(), "removed empty directory");
            }

            ledger.summary.removed_dirs += 1;
            gone.insert(path.to_path_buf());
            self.observer.on_dir_removed(path, dry_run);
        }
    }
}

/// Renames `from` to `to`, copying and deleting when they sit on different
/// filesystems.
pub(crate) fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExcludeRules;
    use crate::journal::RollbackTarget;
    use tempfile::TempDir;

    struct Setup {
        _temp_dir: TempDir,
        root: PathBuf,
        journal: Journal,
    }

    fn setup() -> Setup {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = resolve_path(&temp_dir.path().join("inbox"));
        fs::create_dir(&root).unwrap();
        let journal = Journal::new(temp_dir.path().join("journal.json"));
        Setup {
            _temp_dir: temp_dir,
            root,
            journal,
        }
    }

    fn real(root: &Path) -> OrganizeRequest {
        OrganizeRequest {
            dry_run: false,
            confirmed: true,
            ..OrganizeRequest::new(root)
        }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let s = setup();
        write(&s.root, "a.jpg", "img");
        write(&s.root, "b.txt", "txt");

        let request = OrganizeRequest::new(&s.root);
        let outcome = FileOrganizer::new(&request, &s.journal).run().unwrap();

        let summary = &outcome.report.summary;
        assert_eq!(summary.scanned, 2);
        assert_eq!(summary.moved, 0);
        assert_eq!(summary.by_category.get("Images"), Some(&1));
        assert!(s.root.join("a.jpg").exists());
        assert!(!s.root.join("Images").exists());
        assert!(!s.journal.path().exists());
    }

    #[test]
    fn test_real_run_requires_confirmation() {
        let s = setup();
        write(&s.root, "a.jpg", "img");

        let request = OrganizeRequest {
            dry_run: false,
            ..OrganizeRequest::new(&s.root)
        };
        let result = FileOrganizer::new(&request, &s.journal).run();

        assert!(matches!(result, Err(OrganizeError::NotConfirmed)));
        assert!(s.root.join("a.jpg").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_root_destination_refused() {
        let s = setup();
        write(&s.root, "a.jpg", "img");

        let request = OrganizeRequest {
            destination: Some(PathBuf::from("/")),
            ..real(&s.root)
        };
        let result = FileOrganizer::new(&request, &s.journal).run();

        assert!(matches!(
            result,
            Err(OrganizeError::UnsafeRoot {
                role: "destination",
                ..
            })
        ));
        assert!(s.root.join("a.jpg").exists());
    }

    #[test]
    fn test_missing_source_is_rejected() {
        let s = setup();
        let request = real(&s.root.join("missing"));
        let result = FileOrganizer::new(&request, &s.journal).run();
        assert!(matches!(result, Err(OrganizeError::InvalidSource { .. })));
    }

    #[test]
    fn test_invalid_filter_aborts_before_mutation() {
        let s = setup();
        write(&s.root, "a.jpg", "img");

        let request = OrganizeRequest {
            filters: FilterRules {
                exclude: ExcludeRules {
                    patterns: vec!["[oops".to_string()],
                    ..Default::default()
                },
                ..Default::default()
            },
            ..real(&s.root)
        };
        let result = FileOrganizer::new(&request, &s.journal).run();

        assert!(matches!(result, Err(OrganizeError::InvalidFilter(_))));
        assert!(s.root.join("a.jpg").exists());
    }

    #[test]
    fn test_move_records_session() {
        let s = setup();
        write(&s.root, "a.jpg", "img");
        write(&s.root, "sub/notes.txt", "txt");

        let request = real(&s.root);
        let outcome = FileOrganizer::new(&request, &s.journal).run().unwrap();

        assert_eq!(outcome.report.summary.moved, 2);
        assert!(outcome.report.session.is_some());
        assert!(s.root.join("Images/a.jpg").exists());
        assert!(s.root.join("Documents/notes.txt").exists());

        let sessions = s.journal.load().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].moves.len(), 2);
        assert_eq!(sessions[0].moves[0].src, s.root.join("a.jpg"));
    }

    #[test]
    fn test_collisions_get_numbered_names() {
        let s = setup();
        write(&s.root, "Documents/report.pdf", "existing");
        write(&s.root, "report.pdf", "first");
        write(&s.root, "nested/report.pdf", "second");

        let request = real(&s.root);
        let outcome = FileOrganizer::new(&request, &s.journal).run().unwrap();

        assert_eq!(outcome.report.summary.renamed, 2);
        let docs = s.root.join("Documents");
        assert_eq!(fs::read_to_string(docs.join("report.pdf")).unwrap(), "existing");
        assert!(docs.join("report (1).pdf").exists());
        assert!(docs.join("report (2).pdf").exists());
    }

    #[test]
    fn test_dry_run_predicts_numbered_names() {
        let s = setup();
        write(&s.root, "report.pdf", "first");
        write(&s.root, "nested/report.pdf", "second");

        struct Collect(std::cell::RefCell<Vec<PathBuf>>);
        impl RunObserver for Collect {
            fn on_item(&self, outcome: &ItemOutcome) {
                if let ItemOutcome::Planned { to, .. } = outcome {
                    self.0.borrow_mut().push(to.clone());
                }
            }
        }

        let observer = Collect(Default::default());
        let request = OrganizeRequest::new(&s.root);
        let outcome = FileOrganizer::new(&request, &s.journal)
            .with_observer(&observer)
            .run()
            .unwrap();

        assert_eq!(outcome.report.summary.renamed, 1);
        let mut planned = observer.0.into_inner();
        planned.sort();
        let docs = s.root.join("Documents");
        assert_eq!(
            planned,
            vec![docs.join("report (1).pdf"), docs.join("report.pdf")]
        );
    }

    #[test]
    fn test_copy_mode_keeps_sources_and_skips_journal() {
        let s = setup();
        write(&s.root, "a.jpg", "img");

        let request = OrganizeRequest {
            mode: OperationMode::Copy,
            ..real(&s.root)
        };
        let outcome = FileOrganizer::new(&request, &s.journal).run().unwrap();

        assert_eq!(outcome.report.summary.copied, 1);
        assert_eq!(outcome.report.summary.moved, 0);
        assert!(outcome.report.session.is_none());
        assert!(s.root.join("a.jpg").exists());
        assert!(s.root.join("Images/a.jpg").exists());
        assert!(!s.journal.path().exists());
    }

    #[test]
    fn test_category_path_that_is_a_file_is_skipped() {
        let s = setup();
        let destination = s.root.parent().unwrap().join("sorted");
        write(&destination, "Images", "i am a file");
        write(&s.root, "a.jpg", "img");
        write(&s.root, "b.txt", "txt");

        let request = OrganizeRequest {
            destination: Some(destination.clone()),
            ..real(&s.root)
        };
        let outcome = FileOrganizer::new(&request, &s.journal).run().unwrap();

        let summary = &outcome.report.summary;
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.moved, 1);
        assert!(s.root.join("a.jpg").exists());
        assert!(destination.join("Images").is_file());
        assert!(destination.join("Documents/b.txt").exists());
    }

    #[test]
    fn test_file_already_in_its_category_is_skipped() {
        let s = setup();
        let destination = s.root.join("Images");
        write(&s.root, "a.jpg", "img");

        // Source is itself a category folder of the destination.
        let request = OrganizeRequest {
            source: destination.clone(),
            destination: Some(s.root.clone()),
            ..real(&s.root)
        };
        write(&destination, "b.jpg", "img");
        let outcome = FileOrganizer::new(&request, &s.journal).run().unwrap();

        assert_eq!(outcome.report.summary.skipped, 1);
        assert_eq!(outcome.report.summary.moved, 0);
        assert!(destination.join("b.jpg").exists());
    }

    #[test]
    fn test_separate_destination() {
        let s = setup();
        let destination = s.root.parent().unwrap().join("sorted");
        write(&s.root, "song.mp3", "mp3");

        let request = OrganizeRequest {
            destination: Some(destination.clone()),
            ..real(&s.root)
        };
        FileOrganizer::new(&request, &s.journal).run().unwrap();

        assert!(destination.join("Music/song.mp3").exists());
        assert!(!s.root.join("song.mp3").exists());
    }

    #[test]
    fn test_cleanup_removes_emptied_dirs() {
        let s = setup();
        write(&s.root, "deep/er/a.jpg", "img");
        write(&s.root, "keep/stay.xyz.part", "partial");
        fs::create_dir_all(s.root.join(".git/objects")).unwrap();

        let request = OrganizeRequest {
            cleanup_empty_dirs: true,
            filters: FilterRules {
                exclude: ExcludeRules {
                    extensions: vec!["part".to_string()],
                    ..Default::default()
                },
                ..Default::default()
            },
            ..real(&s.root)
        };
        let outcome = FileOrganizer::new(&request, &s.journal).run().unwrap();

        assert_eq!(outcome.report.summary.removed_dirs, 2);
        assert!(!s.root.join("deep").exists());
        assert!(s.root.join("keep/stay.xyz.part").exists());
        assert!(s.root.join(".git/objects").exists());
        assert!(s.root.join("Images/a.jpg").exists());
    }

    #[test]
    fn test_dry_run_cleanup_reports_without_removing() {
        let s = setup();
        write(&s.root, "deep/er/a.jpg", "img");

        let request = OrganizeRequest {
            cleanup_empty_dirs: true,
            ..OrganizeRequest::new(&s.root)
        };
        let outcome = FileOrganizer::new(&request, &s.journal).run().unwrap();

        assert_eq!(outcome.report.summary.removed_dirs, 2);
        assert!(s.root.join("deep/er/a.jpg").exists());
    }

    #[test]
    fn test_report_file_written() {
        let s = setup();
        write(&s.root, "a.jpg", "img");
        let report_path = s.root.parent().unwrap().join("report.json");

        let request = OrganizeRequest {
            report: Some(report_path.clone()),
            ..OrganizeRequest::new(&s.root)
        };
        FileOrganizer::new(&request, &s.journal).run().unwrap();

        let report: RunReport =
            serde_json::from_str(&fs::read_to_string(report_path).unwrap()).unwrap();
        assert!(report.dry_run);
        assert_eq!(report.summary.by_category.get("Images"), Some(&1));
    }

    #[test]
    fn test_journal_inside_source_is_never_moved() {
        let s = setup();
        let journal = Journal::new(s.root.join("journal.json"));
        write(&s.root, "a.jpg", "img");

        let request = real(&s.root);
        assert!(request.protected_paths.is_empty());
        FileOrganizer::new(&request, &journal).run().unwrap();
        assert!(s.root.join("journal.json").exists());

        let outcome = FileOrganizer::new(&request, &journal).run().unwrap();
        assert_eq!(outcome.report.summary.moved, 0);
        assert!(s.root.join("journal.json").exists());
        assert!(!s.root.join("Code/journal.json").exists());
        assert_eq!(journal.list().unwrap().len(), 1);

        journal.rollback(&RollbackTarget::Latest, false).unwrap();
        assert!(s.root.join("a.jpg").exists());
    }

    #[test]
    fn test_failed_file_does_not_stop_the_run() {
        let s = setup();
        write(&s.root, "a.jpg", "img");
        write(&s.root, "b.txt", "txt");
        write(&s.root, "c.pdf", "pdf");

        // Pulls one file out from under the run after the scan.
        struct Vanish {
            path: PathBuf,
            failed: std::cell::RefCell<Vec<PathBuf>>,
        }
        impl RunObserver for Vanish {
            fn on_start(&self, _total: usize) {
                fs::remove_file(&self.path).unwrap();
            }
            fn on_item(&self, outcome: &ItemOutcome) {
                if let ItemOutcome::Failed { path, error } = outcome {
                    assert!(matches!(error, ItemError::Transfer { .. }));
                    self.failed.borrow_mut().push(path.clone());
                }
            }
        }

        let observer = Vanish {
            path: s.root.join("b.txt"),
            failed: Default::default(),
        };
        let request = real(&s.root);
        let outcome = FileOrganizer::new(&request, &s.journal)
            .with_observer(&observer)
            .run()
            .unwrap();

        let summary = &outcome.report.summary;
        assert_eq!(summary.scanned, 3);
        assert_eq!(summary.moved, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.by_category.get("Documents"), Some(&1));
        assert_eq!(observer.failed.into_inner(), vec![s.root.join("b.txt")]);
        assert!(s.root.join("Images/a.jpg").exists());
        assert!(s.root.join("Documents/c.pdf").exists());

        let sessions = s.journal.load().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].moves.len(), 2);
        assert!(
            sessions[0]
                .moves
                .iter()
                .all(|record| record.src != s.root.join("b.txt"))
        );
    }

    #[test]
    fn test_destination_not_created_without_files() {
        let s = setup();
        let destination = s.root.parent().unwrap().join("sorted");

        let request = OrganizeRequest {
            destination: Some(destination.clone()),
            ..real(&s.root)
        };
        let outcome = FileOrganizer::new(&request, &s.journal).run().unwrap();

        assert_eq!(outcome.report.summary.scanned, 0);
        assert!(!destination.exists());
        assert!(!s.journal.path().exists());
    }
}

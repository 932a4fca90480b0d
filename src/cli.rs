//! Command-line interface module for declutter.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Merging configuration files with command-line flags
//! - Confirmation prompts for real runs
//! - Dispatching to organize, history and rollback

use crate::config::ConfigFile;
use crate::journal::{Journal, JournalError, RollbackTarget};
use crate::logging;
use crate::organizer::{FileOrganizer, OrganizeError, OrganizeRequest};
use crate::output::{OutputFormatter, ProgressObserver};
use crate::summary::OperationMode;
use clap::{Args, Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Sort files into category folders, preview first, roll back later.
#[derive(Debug, Parser)]
#[command(name = "declutter", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Journal file holding reversible sessions.
    #[arg(long, global = true, value_name = "FILE")]
    pub journal: Option<PathBuf>,

    /// Log file for the run.
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Show every placed file and debug logs on the console.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Organize a directory into category folders.
    Organize(OrganizeArgs),
    /// List the sessions recorded in the journal.
    History,
    /// Move the files of one session back to where they came from.
    Rollback {
        /// `latest` or a session timestamp from `declutter history`.
        #[arg(default_value = "latest")]
        target: RollbackTarget,

        /// Report what would be restored without touching anything.
        #[arg(short = 'n', long)]
        dry_run: bool,
    },
}

#[derive(Debug, Args)]
pub struct OrganizeArgs {
    /// Directory to organize.
    pub source: PathBuf,

    /// Put category folders here instead of inside the source.
    #[arg(short, long, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Preview the run without changing anything.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Don't ask for confirmation before a real run.
    #[arg(short, long)]
    pub yes: bool,

    /// Copy files instead of moving them. Copies are not journaled.
    #[arg(long)]
    pub copy: bool,

    /// Remove directories left empty by the run.
    #[arg(long)]
    pub cleanup: bool,

    /// Glob pattern to exclude (repeatable).
    #[arg(short, long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Also organize hidden files and descend into hidden directories.
    #[arg(long)]
    pub include_hidden: bool,

    /// How deep to descend; 0 means the source's own files only.
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Configuration file (default: ./.declutter.toml, then the user config dir).
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Add the configured categories to the built-in ones instead of replacing them.
    #[arg(long)]
    pub merge_defaults: bool,

    /// Write a JSON report of the run to this file.
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

/// Errors surfaced to the user by [`run_cli`].
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Organize(#[from] OrganizeError),
    #[error(transparent)]
    Journal(#[from] JournalError),
    #[error("failed to read confirmation: {0}")]
    Prompt(#[from] io::Error),
}

impl Cli {
    pub fn journal_path(&self) -> PathBuf {
        self.journal.clone().unwrap_or_else(Journal::default_path)
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(logging::default_log_path)
    }
}

/// Runs the parsed command line.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use declutter::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["declutter", "organize", "/path/to/directory", "--dry-run"]);
/// if let Err(e) = run_cli(&cli) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<(), CliError> {
    let journal = Journal::new(cli.journal_path());

    match &cli.command {
        Command::Organize(args) => organize(cli, args, &journal),
        Command::History => {
            OutputFormatter::history(&journal.list()?);
            Ok(())
        }
        Command::Rollback { target, dry_run } => {
            let report = journal.rollback(target, *dry_run)?;
            OutputFormatter::rollback_report(&report);
            Ok(())
        }
    }
}

fn organize(cli: &Cli, args: &OrganizeArgs, journal: &Journal) -> Result<(), CliError> {
    let config_path = ConfigFile::discover(args.config.as_deref());
    let config = ConfigFile::load_or_default(config_path.as_deref());

    let mut request = build_request(args, &config);
    request.protected_paths.push(journal.path().to_path_buf());
    request.protected_paths.push(cli.log_path());
    request.protected_paths.extend(config_path);
    if let Ok(exe) = std::env::current_exe() {
        request.protected_paths.push(exe);
    }

    if request.dry_run {
        OutputFormatter::dry_run_notice(&format!(
            "Analyzing contents of: {}",
            request.source.display()
        ));
    } else {
        OutputFormatter::info(&format!("Organizing contents of: {}", request.source.display()));
        request.confirmed = args.yes || confirm(&request)?;
    }

    let observer = ProgressObserver::new(cli.verbose);
    let outcome = match FileOrganizer::new(&request, journal)
        .with_observer(&observer)
        .run()
    {
        Ok(outcome) => outcome,
        Err(OrganizeError::NotConfirmed) => {
            OutputFormatter::warning("Aborted. No files were changed.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    OutputFormatter::run_summary(&outcome.report);

    match outcome.journal_error {
        Some(e) => {
            OutputFormatter::error("The moves above were NOT recorded and cannot be rolled back.");
            Err(e.into())
        }
        None => Ok(()),
    }
}

/// Applies the command-line flags on top of the loaded configuration.
pub fn build_request(args: &OrganizeArgs, config: &ConfigFile) -> OrganizeRequest {
    let (categories, _issues) = config.category_table(args.merge_defaults);

    let mut filters = config.filters.clone();
    filters.exclude.patterns.extend(args.exclude.iter().cloned());
    filters.include_hidden |= args.include_hidden;

    OrganizeRequest {
        destination: args.dest.clone(),
        dry_run: args.dry_run,
        confirmed: false,
        mode: if args.copy {
            OperationMode::Copy
        } else {
            OperationMode::Move
        },
        cleanup_empty_dirs: args.cleanup,
        filters,
        max_depth: args.max_depth,
        categories,
        report: args.report.clone(),
        ..OrganizeRequest::new(&args.source)
    }
}

fn confirm(request: &OrganizeRequest) -> io::Result<bool> {
    let verb = match request.mode {
        OperationMode::Move => "Move",
        OperationMode::Copy => "Copy",
    };
    print!(
        "{} files from {} into category folders under {}? [y/N] ",
        verb,
        request.source.display(),
        request.destination_root().display()
    );
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("arguments should parse")
    }

    fn organize_args(cli: Cli) -> OrganizeArgs {
        match cli.command {
            Command::Organize(args) => args,
            other => panic!("expected organize, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_organize_flags() {
        let args = organize_args(parse(&[
            "declutter",
            "organize",
            "downloads",
            "--dest",
            "sorted",
            "--dry-run",
            "--copy",
            "-e",
            "*.tmp",
            "--exclude",
            "build",
            "--max-depth",
            "2",
        ]));

        assert_eq!(args.source, PathBuf::from("downloads"));
        assert_eq!(args.dest, Some(PathBuf::from("sorted")));
        assert!(args.dry_run);
        assert!(args.copy);
        assert_eq!(args.exclude, vec!["*.tmp", "build"]);
        assert_eq!(args.max_depth, Some(2));
    }

    #[test]
    fn test_rollback_target_defaults_to_latest() {
        let cli = parse(&["declutter", "rollback"]);
        assert!(matches!(
            cli.command,
            Command::Rollback {
                target: RollbackTarget::Latest,
                dry_run: false
            }
        ));

        let cli = parse(&["declutter", "rollback", "2024-05-01T10:00:00.000000", "-n"]);
        match cli.command {
            Command::Rollback { target, dry_run } => {
                assert_eq!(
                    target,
                    RollbackTarget::Timestamp("2024-05-01T10:00:00.000000".to_string())
                );
                assert!(dry_run);
            }
            other => panic!("expected rollback, got {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["declutter", "history", "--journal", "j.json", "-v"]);
        assert_eq!(cli.journal_path(), PathBuf::from("j.json"));
        assert!(cli.verbose);
    }

    #[test]
    fn test_build_request_merges_flags_into_config() {
        let config: ConfigFile = toml::from_str(
            r#"
            [filters.exclude]
            patterns = ["*.part"]
            "#,
        )
        .unwrap();
        let args = organize_args(parse(&[
            "declutter",
            "organize",
            "inbox",
            "--exclude",
            "*.tmp",
            "--include-hidden",
            "--cleanup",
        ]));

        let request = build_request(&args, &config);
        assert_eq!(request.source, PathBuf::from("inbox"));
        assert_eq!(request.destination_root(), PathBuf::from("inbox").as_path());
        assert!(!request.dry_run);
        assert!(!request.confirmed);
        assert!(request.cleanup_empty_dirs);
        assert!(request.filters.include_hidden);
        assert_eq!(request.filters.exclude.patterns, vec!["*.part", "*.tmp"]);
        assert_eq!(request.mode, OperationMode::Move);
    }

    #[test]
    fn test_build_request_with_custom_categories() {
        let config: ConfigFile = toml::from_str(
            r#"
            [categories]
            Ebooks = [".epub", ".mobi"]
            "#,
        )
        .unwrap();
        let args = organize_args(parse(&["declutter", "organize", "inbox"]));
        let request = build_request(&args, &config);
        assert_eq!(request.categories.classify("epub", None), "Ebooks");
        assert_eq!(request.categories.classify(".jpg", None), "Others");

        let args = organize_args(parse(&["declutter", "organize", "inbox", "--merge-defaults"]));
        let request = build_request(&args, &config);
        assert_eq!(request.categories.classify(".epub", None), "Ebooks");
        assert_eq!(request.categories.classify(".jpg", None), "Images");
    }

    #[test]
    fn test_confirmation_answers() {
        assert!(is_yes("y\n"));
        assert!(is_yes("  YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
        assert!(!is_yes("yep"));
    }
}

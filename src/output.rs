//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output, including colored output,
//! progress tracking, and formatted tables. Library code never prints; it logs
//! through `tracing` and reports through [`RunObserver`], which this module
//! implements for the terminal.

use crate::journal::{RollbackReport, SessionInfo};
use crate::organizer::{ItemOutcome, RunObserver, SkipReason};
use crate::summary::{OperationMode, RunReport, RunSummary};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::Path;

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - Progress bars for operations
/// - Summary tables with statistics
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use declutter::output::OutputFormatter;
    /// OutputFormatter::success("Rollback complete");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar for file operations.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use declutter::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_with_message("Completed!");
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Prints the per-category table followed by the run counters.
    pub fn run_summary(report: &RunReport) {
        let summary = &report.summary;
        if report.dry_run {
            Self::header("DRY RUN SUMMARY");
        } else {
            Self::header("SUMMARY");
        }

        Self::category_table(&summary.by_category, summary.organized());
        println!();
        Self::counters(summary, report.mode, report.dry_run);

        if report.dry_run {
            println!();
            Self::dry_run_notice("No files were modified.");
        } else if let Some(session) = &report.session {
            println!();
            Self::success(&format!("Session {} recorded.", session));
            Self::plain(&format!(
                "Use 'declutter rollback {}' to revert these moves.",
                session
            ));
        }
    }

    /// Prints a table with file counts by category.
    pub fn category_table(category_counts: &BTreeMap<String, usize>, total_files: usize) {
        if category_counts.is_empty() {
            Self::plain("No files to organize.");
            return;
        }

        let max_category_len = category_counts
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max(8); // At least "Category" width

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = max_category_len
        );
        println!("{}", "-".repeat(max_category_len + 10));

        for (category, count) in category_counts {
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                plural(*count, "file"),
                width = max_category_len
            );
        }

        println!("{}", "-".repeat(max_category_len + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            plural(total_files, "file"),
            width = max_category_len
        );
    }

    fn counters(summary: &RunSummary, mode: OperationMode, dry_run: bool) {
        let (label, done) = match (mode, dry_run) {
            (OperationMode::Move, true) => ("Would move", summary.organized()),
            (OperationMode::Copy, true) => ("Would copy", summary.organized()),
            (OperationMode::Move, false) => ("Moved", summary.moved),
            (OperationMode::Copy, false) => ("Copied", summary.copied),
        };

        println!("  Scanned:  {}", summary.scanned);
        println!("  {}: {}", label, done);
        if summary.renamed > 0 {
            println!("  Renamed:  {}", summary.renamed.to_string().yellow());
        }
        if summary.skipped > 0 {
            println!("  Skipped:  {}", summary.skipped);
        }
        if summary.failed > 0 {
            println!("  Failed:   {}", summary.failed.to_string().red());
        }
        if summary.removed_dirs > 0 {
            let label = if dry_run { "Empty dirs to remove" } else { "Empty dirs removed" };
            println!("  {}: {}", label, summary.removed_dirs);
        }
    }

    /// Lists journal sessions, oldest first.
    pub fn history(sessions: &[SessionInfo]) {
        if sessions.is_empty() {
            Self::plain("No organize history available.");
            return;
        }

        Self::header("HISTORY");
        for session in sessions {
            println!(
                "{}  {} {}",
                session.timestamp.cyan(),
                session.move_count,
                plural(session.move_count, "move"),
            );
            println!("    from {}", session.source_root.display());
            if session.destination_root != session.source_root {
                println!("    into {}", session.destination_root.display());
            }
        }
    }

    /// Prints the outcome of a rollback.
    pub fn rollback_report(report: &RollbackReport) {
        if report.dry_run {
            Self::dry_run_notice(&format!(
                "Rollback of session {} would restore {} {}",
                report.timestamp,
                report.restored,
                plural(report.restored, "file")
            ));
        } else {
            Self::success(&format!(
                "Rolled back session {}: restored {} {}",
                report.timestamp,
                report.restored,
                plural(report.restored, "file")
            ));
        }

        for (original, actual) in &report.renamed {
            Self::warning(&format!(
                "{} was occupied, restored as {}",
                original.display(),
                actual.display()
            ));
        }

        if !report.skipped.is_empty() {
            println!("  Skipped: {}", report.skipped.len());
            for (path, reason) in &report.skipped {
                println!("    - {}: {}", path.display(), reason);
            }
        }

        if !report.failed.is_empty() {
            println!("  Failed: {}", report.failed.len().to_string().red());
            for (path, reason) in &report.failed {
                eprintln!("    - {}: {}", path.display(), reason);
            }
            if !report.dry_run {
                Self::warning("Failed moves were kept in the journal; fix the issues and retry.");
            }
        }
    }
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}

/// Drives a progress bar from a running organize pass.
///
/// Planned operations, renames, skips and failures are always printed;
/// completed moves only with `verbose`.
pub struct ProgressObserver {
    bar: ProgressBar,
    verbose: bool,
}

impl ProgressObserver {
    pub fn new(verbose: bool) -> Self {
        Self {
            bar: OutputFormatter::create_progress_bar(0),
            verbose,
        }
    }

    fn line(&self, message: String) {
        self.bar.suspend(|| println!("{}", message));
    }
}

impl RunObserver for ProgressObserver {
    fn on_start(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn on_item(&self, outcome: &ItemOutcome) {
        self.bar.inc(1);
        match outcome {
            ItemOutcome::Planned {
                from,
                to,
                category,
                renamed,
                mode,
            } => {
                let verb = match mode {
                    OperationMode::Move => "move",
                    OperationMode::Copy => "copy",
                };
                self.line(format!(
                    " - {}\n   → Would {} to {}/{}{}",
                    from.display(),
                    verb,
                    category,
                    file_name(to),
                    if *renamed { " (renamed)".yellow().to_string() } else { String::new() }
                ));
            }
            ItemOutcome::Moved {
                from,
                to,
                category,
                renamed,
            }
            | ItemOutcome::Copied {
                from,
                to,
                category,
                renamed,
            } => {
                self.bar.set_message(file_name(from));
                if *renamed {
                    self.line(format!(
                        "{} {} → {}/{} (name was taken)",
                        "⚠".yellow(),
                        from.display(),
                        category,
                        file_name(to)
                    ));
                } else if self.verbose {
                    self.line(format!(
                        "{} {} → {}/",
                        "✓".green(),
                        from.display(),
                        category
                    ));
                }
            }
            ItemOutcome::Skipped { path, reason } => match reason {
                SkipReason::AlreadyOrganized => {
                    if self.verbose {
                        self.line(format!("   {} already organized", path.display()));
                    }
                }
                SkipReason::CategoryPathNotDir(folder) => {
                    self.line(format!(
                        "{} {} skipped: {} is not a directory",
                        "⚠".yellow(),
                        path.display(),
                        folder.display()
                    ));
                }
            },
            ItemOutcome::Failed { path, error } => {
                self.line(format!("{} {}: {}", "✗".red(), path.display(), error));
            }
        }
    }

    fn on_dir_removed(&self, path: &Path, dry_run: bool) {
        if dry_run {
            self.line(format!(" - Would remove empty directory {}", path.display()));
        } else if self.verbose {
            self.line(format!("   Removed empty directory {}", path.display()));
        }
    }

    fn on_finish(&self, _summary: &RunSummary) {
        self.bar.finish_and_clear();
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

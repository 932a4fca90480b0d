//! declutter - sort a directory into category folders, safely.
//!
//! This library classifies files by extension (falling back to content
//! sniffing), moves or copies them into per-category folders, previews runs
//! without touching disk, and keeps a journal so any real run can be rolled
//! back. Category tables and filtering rules come from TOML configuration.

pub mod category;
pub mod cli;
pub mod config;
pub mod journal;
pub mod logging;
pub mod naming;
pub mod organizer;
pub mod output;
pub mod safety;
pub mod scanner;
pub mod summary;

pub use category::{CategoryIssue, CategoryTable};
pub use config::{CompiledFilters, ConfigError, ConfigFile, FilterRules};
pub use journal::{Journal, JournalError, RollbackReport, RollbackTarget, Session};
pub use organizer::{FileOrganizer, OrganizeError, OrganizeRequest, RunObserver};
pub use summary::{OperationMode, RunReport, RunSummary};

pub use cli::{Cli, run_cli};

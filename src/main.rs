use clap::Parser;
use declutter::cli::{Cli, run_cli};
use declutter::logging::{self, LogOptions};
use declutter::output::OutputFormatter;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let options = LogOptions {
        file: Some(cli.log_path()),
        verbose: cli.verbose,
    };
    let _log_guard = match logging::init(&options) {
        Ok(guard) => Some(guard),
        Err(e) => {
            OutputFormatter::warning(&format!("File logging disabled: {}", e));
            logging::init(&LogOptions {
                file: None,
                ..options
            })
            .ok()
        }
    };

    match run_cli(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            OutputFormatter::error(&format!("Error: {}", e));
            ExitCode::FAILURE
        }
    }
}

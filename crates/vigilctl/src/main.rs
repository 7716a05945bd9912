//! Vigil Control - single-host health check
//!
//! Collects sensor readings, scores them and prints a report.

use clap::Parser;
use std::time::Duration;
use vigilctl::cli::Cli;
use vigilctl::errors::{exit_code_for, EXIT_GENERAL_ERROR, EXIT_SUCCESS};
use vigilctl::sinks::{console::display_error, stderr_colors_enabled};
use vigilctl::{commands, logging};

/// How long shutdown waits for sensor reads abandoned at the deadline
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            display_error(&format!("cannot start runtime: {}", e), false);
            std::process::exit(EXIT_GENERAL_ERROR);
        }
    };

    let result = runtime.block_on(commands::run(cli));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    match result {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(e) => {
            display_error(&format!("{:#}", e), stderr_colors_enabled());
            std::process::exit(exit_code_for(&e));
        }
    }
}

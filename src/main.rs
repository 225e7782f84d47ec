mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod runner;
mod scope;
mod ui;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::Cli;
use std::io;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "aws-all", &mut io::stdout());
        return ExitCode::SUCCESS;
    }

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    match commands::exec::run(&ctx, cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn report_error(err: &anyhow::Error) {
    ui::error(&format!("{err:#}"));
    if let Some(fanout_err) = err.downcast_ref::<fanout::Error>() {
        let category = fanout_err.category();
        log::debug!("{}", category.description());
        ui::dim(category.advice());
    }
}

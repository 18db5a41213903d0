mod cli;
mod commands;
mod error;
mod field_map;
mod model;
mod store;
mod util;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, RecommendCommands};

fn main() -> ExitCode {
    init_tracing();

    match run() {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "command failed");
            for cause in err.chain().skip(1) {
                error!(cause = %cause, "caused by");
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Submit(args) => commands::submit::run(args),
        Commands::Results(args) => commands::results::run(args),
        Commands::Recommend(args) => match args.command {
            RecommendCommands::Add(add) => commands::recommend::add(add),
            RecommendCommands::Attach(attach) => commands::recommend::attach(attach),
            RecommendCommands::List(list) => commands::recommend::list(list),
        },
        Commands::Fields(args) => commands::fields::run(args),
        Commands::Status(args) => commands::status::run(args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

// ABOUTME: Entry point for the stratus CLI application.
// ABOUTME: Parses arguments, loads configuration and dispatches to command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use std::env;
use stratus::config::Config;
use stratus::error::Result;
use stratus::output::Output;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // -v wins; otherwise RUST_LOG, falling back to warnings only
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let output = Output::new(cli.output);
    let error_output = Output::new(cli.output);

    if let Err(e) = run(cli, output).await {
        error_output.error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: Output) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::discover_or_default(&env::current_dir()?)?,
    };

    match cli.command {
        Commands::Deploy(args) => {
            let config = select_environment(config, args.environment.as_deref())?;
            commands::deploy(config, args, cli.region, output).await
        }
        Commands::Package(args) => {
            let config = select_environment(config, args.environment.as_deref())?;
            commands::package(config, args, cli.region, output).await
        }
    }
}

fn select_environment(config: Config, environment: Option<&str>) -> Result<Config> {
    match environment {
        Some(name) => config.for_environment(name),
        None => Ok(config),
    }
}

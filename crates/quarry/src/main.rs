// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quarry - answers natural-language questions in Slack with SQL.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod check_config;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use quarry_config::ConfigError;
use quarry_config::model::QuarryConfig;

/// Quarry - answers natural-language questions in Slack with SQL.
#[derive(Parser, Debug)]
#[command(name = "quarry", version, about, long_about = None)]
struct Cli {
    /// Load this file instead of the standard config locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Slack events server (default).
    Serve,
    /// Validate the configuration and print a redacted summary.
    CheckConfig {
        /// Also ask the query service whether the API key is accepted.
        #[arg(long)]
        live: bool,
    },
}

fn load(path: Option<&PathBuf>) -> Result<QuarryConfig, Vec<ConfigError>> {
    match path {
        Some(path) => quarry_config::load_and_validate_path(path),
        None => quarry_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            quarry_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve::run_serve(config).await,
        Commands::CheckConfig { live } => check_config::run_check_config(&config, live).await,
    };

    if let Err(e) = result {
        eprintln!("quarry: {e}");
        std::process::exit(1);
    }
}

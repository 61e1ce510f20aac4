// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! gantry: run declarative CI pipelines from normalized JSON definitions.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gantry", version, about = "Declarative CI pipeline engine")]
struct Cli {
    /// Directory holding the store journal and driver state
    #[arg(long, global = true, default_value = ".gantry")]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a pipeline definition
    Run {
        /// Normalized pipeline JSON file
        file: PathBuf,
        /// Abort the whole run after this duration (e.g. "30m")
        #[arg(long)]
        timeout: Option<String>,
    },
    /// Register a pipeline in the store's pipeline list
    Set {
        /// Normalized pipeline JSON file
        file: PathBuf,
        /// Name to register under (defaults to the pipeline's name, then
        /// the file stem)
        #[arg(long)]
        name: Option<String>,
    },
    /// List registered pipelines
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run { file, timeout } => commands::run(&cli.store, &file, timeout).await,
        Command::Set { file, name } => commands::set(&cli.store, &file, name).await,
        Command::List => commands::list(&cli.store).await,
    }
}

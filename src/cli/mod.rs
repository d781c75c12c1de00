pub mod commands;
pub mod config;
pub mod output;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::crawler::Mode;
use output::OutputMode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Extraction mode
    #[arg(value_enum)]
    pub mode: Mode,

    /// Clear the response cache before running
    #[arg(short, long)]
    pub clear_cache: bool,

    /// Additional output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputMode>,

    /// Configuration file to use instead of the default one
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parse command line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Process the command
pub async fn process_command(cli: Cli, config: config::ParserConfig) -> Result<()> {
    commands::run(cli, config).await
}

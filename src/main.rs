use anyhow::Result;
use tracing::{info, error};

mod cli;
mod crawler;
mod storage;
mod utils;

use cli::config::ParserConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = cli::parse_args();

    let (config, created) = match &args.config {
        Some(path) => (ParserConfig::load_from_file(path)?, None),
        None => ParserConfig::load_default()?,
    };

    // Initialize logging
    utils::init_logging(args.verbose, Some(&config.paths.log_file))?;

    info!("Parser started, v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = created {
        info!("Default configuration not found. Created {}", path.display());
    }
    info!("Command line arguments: {:?}", args);

    // Process commands
    match cli::process_command(args, config).await {
        Ok(_) => {
            info!("Parser finished");
            Ok(())
        }
        Err(e) => {
            error!("Parser failed: {:#}", e);
            Err(e)
        }
    }
}

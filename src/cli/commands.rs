use anyhow::Result;
use tracing::{error, info};

use crate::cli::config::ParserConfig;
use crate::cli::output::control_output;
use crate::cli::Cli;
use crate::crawler::{self, CachedSession, Table};
use crate::storage::cache::ResponseCache;

/// Run the selected mode and render its rows
pub async fn run(cli: Cli, config: ParserConfig) -> Result<()> {
    let cache = ResponseCache::from_settings(&config.cache);
    let mut session = CachedSession::new(&config.http, cache)?;

    if cli.clear_cache {
        info!("Clearing response cache");
        session.clear_cache()?;
    }

    let outcome = crawler::run_mode(cli.mode, &mut session, &config).await;

    // Keep whatever was fetched even if the mode failed
    let persisted = session.persist_cache();

    let stats = session.stats();
    info!(
        "Requests: {}, cache hits: {}, failures: {}, bytes downloaded: {}",
        stats.requests, stats.cache_hits, stats.failures, stats.bytes_downloaded
    );

    if let Some(table) = settle(outcome, persisted)? {
        control_output(&table, cli.output, cli.mode, &config.paths)?;
    }

    Ok(())
}

/// Combine the mode's outcome with the cache write. A failed mode reports
/// its own error; a cache write failure is then only logged.
fn settle(outcome: Result<Option<Table>>, persisted: Result<()>) -> Result<Option<Table>> {
    match (outcome, persisted) {
        (Ok(table), Ok(())) => Ok(table),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cache_err)) => {
            error!("Failed to save response cache: {:#}", cache_err);
            Err(e)
        }
    }
}

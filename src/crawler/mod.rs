pub mod download;
pub mod error;
pub mod latest_versions;
pub mod lookup;
pub mod pep;
pub mod session;
pub mod table;
pub mod whats_new;

use anyhow::Result;
use clap::ValueEnum;
use std::fmt;

use crate::cli::config::ParserConfig;

// Re-export common types
pub use session::{CachedSession, Session};
pub use table::Table;

/// Extraction mode selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Changelog pages of every Python version
    WhatsNew,
    /// Documented versions and their release status
    LatestVersions,
    /// Download the PDF (A4) documentation archive
    Download,
    /// Count PEP statuses and report index/detail mismatches
    Pep,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::WhatsNew => "whats-new",
            Mode::LatestVersions => "latest-versions",
            Mode::Download => "download",
            Mode::Pep => "pep",
        };
        f.write_str(name)
    }
}

/// Run one extraction mode.
///
/// `Ok(None)` means there is nothing to render: the entry page could not be
/// fetched, or the mode produces a file instead of rows.
pub async fn run_mode(mode: Mode, session: &mut dyn Session, config: &ParserConfig) -> Result<Option<Table>> {
    match mode {
        Mode::WhatsNew => whats_new::whats_new(session, &config.urls.main_doc_url).await,
        Mode::LatestVersions => latest_versions::latest_versions(session, &config.urls.main_doc_url).await,
        Mode::Download => {
            download::download(session, &config.urls.main_doc_url, &config.paths.downloads_dir).await?;
            Ok(None)
        }
        Mode::Pep => pep::pep(session, &config.urls.pep_url, &config.expected_status).await,
    }
}

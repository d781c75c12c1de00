use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};
use url::Url;

use crate::cli::config::HttpSettings;
use crate::storage::cache::ResponseCache;

/// Outcome of fetching a page.
///
/// `Absent` means the page could not be loaded; callers skip the unit of
/// work that needed it and carry on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    Text(String),
    Absent,
}

impl FetchResult {
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text),
            Self::Absent => None,
        }
    }
}

/// Handle used by the extraction modes to reach the network
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Session: Send {
    /// Fetch a page as text. Never fails: errors are logged and reported
    /// as `FetchResult::Absent`.
    async fn fetch(&mut self, url: &Url) -> FetchResult;

    /// Stream a binary payload into `dest`, returning the bytes written
    async fn download(&mut self, url: &Url, dest: &Path) -> Result<u64>;
}

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Page fetches requested
    pub requests: usize,

    /// Fetches answered from the cache
    pub cache_hits: usize,

    /// Fetches that ended as `Absent`
    pub failures: usize,

    /// Bytes written by downloads
    pub bytes_downloaded: u64,
}

/// HTTP session with a response cache in front of it
pub struct CachedSession {
    client: reqwest::Client,
    cache: ResponseCache,
    stats: FetchStats,
}

impl CachedSession {
    /// Create a new session
    pub fn new(settings: &HttpSettings, cache: ResponseCache) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            cache,
            stats: FetchStats::default(),
        })
    }

    pub fn stats(&self) -> FetchStats {
        self.stats
    }

    /// Drop every cached page
    pub fn clear_cache(&mut self) -> Result<()> {
        self.cache.clear()
    }

    /// Write the cache back to disk
    pub fn persist_cache(&mut self) -> Result<()> {
        self.cache.persist()
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .context("Request failed")?
            .error_for_status()
            .context("Server returned an error status")?;
        Ok(response)
    }

    async fn get_text(&self, url: &Url) -> Result<String> {
        let response = self.get(url).await?;
        response.text().await.context("Failed to decode response body")
    }
}

#[async_trait]
impl Session for CachedSession {
    async fn fetch(&mut self, url: &Url) -> FetchResult {
        self.stats.requests += 1;

        if let Some(body) = self.cache.get(url.as_str()) {
            debug!("Cache hit: {}", url);
            self.stats.cache_hits += 1;
            return FetchResult::Text(body.to_string());
        }

        match self.get_text(url).await {
            Ok(text) => {
                debug!("Fetched: {}", url);
                self.cache.insert(url.as_str(), text.clone());
                FetchResult::Text(text)
            }
            Err(e) => {
                error!("Failed to load page {}: {:#}", url, e);
                self.stats.failures += 1;
                FetchResult::Absent
            }
        }
    }

    async fn download(&mut self, url: &Url, dest: &Path) -> Result<u64> {
        let response = self
            .get(url)
            .await
            .context(format!("Failed to download {}", url))?;

        // The archive only appears under `dest` once the whole body is on disk
        let partial = partial_path(dest);
        let written = match write_body(response, &partial).await {
            Ok(written) => written,
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(&partial).await {
                    debug!("Could not remove {}: {}", partial.display(), remove_err);
                }
                return Err(e.context(format!("Failed to download {}", url)));
            }
        };

        tokio::fs::rename(&partial, dest)
            .await
            .context(format!("Failed to move download to: {}", dest.display()))?;

        info!("Downloaded {} bytes from {}", written, url);
        self.stats.bytes_downloaded += written;
        Ok(written)
    }
}

/// Sibling of `dest` that receives the body while it is being streamed
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(OsString::from).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

async fn write_body(response: reqwest::Response, path: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(path)
        .await
        .context(format!("Failed to create file: {}", path.display()))?;

    let mut written = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Failed to read response body")?;
        file.write_all(&chunk)
            .await
            .context(format!("Failed to write to: {}", path.display()))?;
        written += chunk.len() as u64;
    }
    file.flush()
        .await
        .context(format!("Failed to flush: {}", path.display()))?;

    Ok(written)
}

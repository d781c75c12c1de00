use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::cli::config::CacheSettings;

/// A cached page body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedPage {
    /// Decoded response text
    pub body: String,

    /// When the page was fetched from the network
    pub fetched_at: DateTime<Utc>,
}

/// Response cache keyed by URL.
///
/// Entries live in memory and, when a file path is set, are written back to
/// a JSON file so later runs can reuse them.
#[derive(Debug, Default)]
pub struct ResponseCache {
    /// Cached pages by URL
    entries: HashMap<String, CachedPage>,

    /// How long an entry stays valid (None = forever)
    ttl: Option<Duration>,

    /// Backing file, if persistent
    path: Option<PathBuf>,

    /// Whether the entries differ from the backing file
    dirty: bool,
}

impl ResponseCache {
    /// Create a cache that is never written to disk
    pub fn in_memory(ttl: Option<Duration>) -> Self {
        Self {
            ttl,
            ..Default::default()
        }
    }

    /// Build the cache described by the settings
    pub fn from_settings(settings: &CacheSettings) -> Self {
        let ttl = settings.ttl_secs.and_then(|secs| {
            let ttl = i64::try_from(secs).ok().and_then(Duration::try_seconds);
            if ttl.is_none() {
                warn!("Cache TTL of {} seconds is out of range, entries will not expire", secs);
            }
            ttl
        });
        if settings.enabled {
            Self::open(&settings.path, ttl)
        } else {
            // A zero TTL turns every lookup into a miss
            Self::in_memory(Some(Duration::zero()))
        }
    }

    /// Open a persistent cache, loading existing entries from `path`.
    ///
    /// An unreadable or corrupt file is logged and replaced on the next save.
    pub fn open(path: &Path, ttl: Option<Duration>) -> Self {
        let entries = if path.exists() {
            match Self::load_entries(path) {
                Ok(entries) => {
                    debug!("Loaded {} cached pages from {}", entries.len(), path.display());
                    entries
                }
                Err(e) => {
                    warn!("Ignoring unreadable cache file {}: {:#}", path.display(), e);
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Self {
            entries,
            ttl,
            path: Some(path.to_path_buf()),
            dirty: false,
        }
    }

    fn load_entries(path: &Path) -> Result<HashMap<String, CachedPage>> {
        let contents = fs::read_to_string(path)
            .context(format!("Failed to read cache file: {}", path.display()))?;
        let entries = serde_json::from_str(&contents)
            .context(format!("Failed to parse cache file: {}", path.display()))?;
        Ok(entries)
    }

    /// Look up a fresh entry for `url`
    pub fn get(&self, url: &str) -> Option<&str> {
        let page = self.entries.get(url)?;
        if let Some(ttl) = self.ttl {
            if Utc::now() - page.fetched_at >= ttl {
                return None;
            }
        }
        Some(&page.body)
    }

    /// Store a freshly fetched body
    pub fn insert(&mut self, url: &str, body: String) {
        self.insert_page(
            url,
            CachedPage {
                body,
                fetched_at: Utc::now(),
            },
        );
    }

    fn insert_page(&mut self, url: &str, page: CachedPage) {
        self.entries.insert(url.to_string(), page);
        self.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drop every entry, including the backing file
    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.dirty = false;

        if let Some(path) = &self.path {
            if path.exists() {
                fs::remove_file(path)
                    .context(format!("Failed to remove cache file: {}", path.display()))?;
            }
        }

        debug!("Response cache cleared");
        Ok(())
    }

    /// Write the entries back to the backing file, if anything changed
    pub fn persist(&mut self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .context(format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let contents = serde_json::to_string(&self.entries)
            .context("Failed to serialize response cache")?;
        fs::write(path, contents)
            .context(format!("Failed to write cache file: {}", path.display()))?;

        debug!("Saved {} cached pages to {}", self.len(), path.display());
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_entries_are_misses() {
        let mut cache = ResponseCache::in_memory(Some(Duration::minutes(10)));
        cache.insert("https://example.com/fresh", "fresh".to_string());
        cache.insert_page(
            "https://example.com/stale",
            CachedPage {
                body: "stale".to_string(),
                fetched_at: Utc::now() - Duration::hours(1),
            },
        );

        assert_eq!(cache.get("https://example.com/fresh"), Some("fresh"));
        assert_eq!(cache.get("https://example.com/stale"), None);
        assert_eq!(cache.get("https://example.com/missing"), None);
    }

    #[test]
    fn test_persisted_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        let mut cache = ResponseCache::open(&path, None);
        cache.insert("https://example.com/", "<html></html>".to_string());
        cache.persist().unwrap();

        let reopened = ResponseCache::open(&path, None);
        assert_eq!(reopened.get("https://example.com/"), Some("<html></html>"));

        let mut reopened = reopened;
        reopened.clear().unwrap();
        assert_eq!(reopened.len(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "not json").unwrap();

        let cache = ResponseCache::open(&path, None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let dir = tempfile::tempdir().unwrap();
        for ttl_secs in [100_000_000_000_000_000, u64::MAX] {
            let settings = CacheSettings {
                path: dir.path().join("cache.json"),
                ttl_secs: Some(ttl_secs),
                ..Default::default()
            };
            let mut cache = ResponseCache::from_settings(&settings);
            cache.insert_page(
                "https://example.com/old",
                CachedPage {
                    body: "old".to_string(),
                    fetched_at: Utc::now() - Duration::days(3650),
                },
            );

            assert_eq!(cache.get("https://example.com/old"), Some("old"));
        }
    }

    #[test]
    fn test_disabled_cache_never_hits() {
        let settings = CacheSettings {
            enabled: false,
            ..Default::default()
        };
        let mut cache = ResponseCache::from_settings(&settings);
        cache.insert("https://example.com/", "body".to_string());

        assert_eq!(cache.get("https://example.com/"), None);
    }
}

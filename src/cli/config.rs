use anyhow::{Result, Context};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::fs;
use tracing::{debug, error};
use url::Url;

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ParserConfig {
    pub urls: UrlSettings,
    pub http: HttpSettings,
    pub cache: CacheSettings,
    pub paths: PathSettings,
    pub expected_status: ExpectedStatus,
}

/// Roots of the crawled sites
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UrlSettings {
    /// Root of the versioned documentation
    pub main_doc_url: Url,

    /// Root of the PEP index
    pub pep_url: Url,
}

/// HTTP client settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout_secs: u64,
}

/// Response cache settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub path: PathBuf,
    /// Seconds before a cached page is fetched again (None = never)
    pub ttl_secs: Option<u64>,
}

/// Where results, downloads and logs are written
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PathSettings {
    pub results_dir: PathBuf,
    pub downloads_dir: PathBuf,
    pub log_file: PathBuf,
}

/// Statuses a detail page may show for each index status code.
///
/// Keys are the one-letter codes of the PEP index (the empty code covers
/// entries whose cell carries no status letter).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct ExpectedStatus(BTreeMap<String, Vec<String>>);

impl ExpectedStatus {
    /// Acceptable detail statuses for an index code
    pub fn get(&self, code: &str) -> Option<&[String]> {
        self.0.get(code).map(Vec::as_slice)
    }
}

impl<K, V, S> FromIterator<(K, V)> for ExpectedStatus
where
    K: Into<String>,
    V: IntoIterator<Item = S>,
    S: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(code, statuses)| (code.into(), statuses.into_iter().map(Into::into).collect()))
                .collect(),
        )
    }
}

impl Default for UrlSettings {
    fn default() -> Self {
        Self {
            main_doc_url: Url::parse("https://docs.python.org/3/").expect("valid default URL"),
            pep_url: Url::parse("https://peps.python.org/").expect("valid default URL"),
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: format!("docs-parser/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from(".cache/http_cache.json"),
            ttl_secs: None,
        }
    }
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            downloads_dir: PathBuf::from("downloads"),
            log_file: PathBuf::from("logs/parser.log"),
        }
    }
}

impl Default for ExpectedStatus {
    fn default() -> Self {
        [
            ("A", vec!["Active", "Accepted"]),
            ("D", vec!["Deferred"]),
            ("F", vec!["Final"]),
            ("P", vec!["Provisional"]),
            ("R", vec!["Rejected"]),
            ("S", vec!["Superseded"]),
            ("W", vec!["Withdrawn"]),
            ("", vec!["Draft", "Active"]),
        ]
        .into_iter()
        .collect()
    }
}

impl ParserConfig {
    /// Get the path to the config directory
    fn config_dir() -> PathBuf {
        let path = if let Some(proj_dirs) = directories::ProjectDirs::from("org", "docs-parser", "docs-parser") {
            proj_dirs.config_dir().to_path_buf()
        } else {
            PathBuf::from("./config")
        };

        if !path.exists() {
            if let Err(e) = fs::create_dir_all(&path) {
                error!("Failed to create config directory: {}", e);
            }
        }

        path
    }

    /// Load the default configuration, creating it on first use.
    ///
    /// Also returns the path of the file when it was just created, so the
    /// caller can report it once logging is up.
    pub fn load_default() -> Result<(Self, Option<PathBuf>)> {
        let config_path = Self::config_dir().join("default.yaml");
        let (config, created) = Self::load_or_create(&config_path)?;
        Ok((config, created.then_some(config_path)))
    }

    /// Load the configuration at `path`, writing the defaults there first if
    /// the file does not exist. The flag tells whether it was created.
    pub fn load_or_create(path: &Path) -> Result<(Self, bool)> {
        if path.exists() {
            return Ok((Self::load_from_file(path)?, false));
        }

        let config = Self::default();
        config.save_to_file(path)?;
        Ok((config, true))
    }

    /// Load configuration from a file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from: {}", path.display());
        let contents = fs::read_to_string(path)
            .context(format!("Failed to read configuration file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .context(format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        debug!("Saving configuration to: {}", path.display());

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .context(format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let contents = serde_yaml::to_string(self)
            .context("Failed to serialize configuration")?;

        fs::write(path, contents)
            .context(format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub followgraph: FollowgraphConfig,
    #[serde(default)]
    pub crawl: CrawlSettings,
    #[serde(default)]
    pub platform: PlatformConfig,
}

/// Paths and logging
#[derive(Debug, Clone, Deserialize)]
pub struct FollowgraphConfig {
    /// Base directory for the tiered graph store (current/master/archive).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory receiving per-run manifests.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Crawl policy knobs
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlSettings {
    /// Maximum graph distance from the root that is still expanded.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Profiles with at least this many followers are excluded from the
    /// crawl output entirely (node and edges).
    #[serde(default = "default_follower_threshold")]
    pub follower_threshold: u64,
    /// Profiles with at least this many followers keep their record but
    /// skip the follower-list fetch. 0 disables the limit.
    #[serde(default = "default_followers_download_limit")]
    pub followers_download_limit: u64,
}

/// Platform endpoints consumed by fetch backends
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_depth() -> usize {
    1
}

fn default_follower_threshold() -> u64 {
    1000
}

fn default_followers_download_limit() -> u64 {
    250
}

fn default_base_url() -> String {
    "https://open.example.com".to_string()
}

impl Default for FollowgraphConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            results_dir: default_results_dir(),
            log_level: default_log_level(),
        }
    }
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            follower_threshold: default_follower_threshold(),
            followers_download_limit: default_followers_download_limit(),
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// Loads environment variables from .env file (if present) first.
    /// Looks for the config file in this order:
    /// 1. Path specified in FOLLOWGRAPH_CONFIG environment variable
    /// 2. ./config.toml in current directory
    ///
    /// A missing file is not an error (every setting has a default), but a
    /// file that exists and fails to parse is.
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let config_path = std::env::var("FOLLOWGRAPH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config: Config = if config_path.exists() {
            let config_str = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
            toml::from_str(&config_str)
                .with_context(|| format!("Failed to parse {}", config_path.display()))?
        } else {
            log::info!(
                "No config file at {}; using built-in defaults",
                config_path.display()
            );
            Config::default()
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.crawl.max_depth == 0 {
            anyhow::bail!("crawl.max_depth must be at least 1");
        }

        if self.platform.base_url.trim_end_matches('/').is_empty() {
            anyhow::bail!("platform.base_url must not be empty");
        }

        Ok(())
    }

    /// Base directory of the tiered store
    pub fn data_dir(&self) -> &Path {
        &self.followgraph.data_dir
    }

    /// Directory receiving per-run manifests
    pub fn results_dir(&self) -> &Path {
        &self.followgraph.results_dir
    }

    /// Platform base URL with any trailing slash removed
    pub fn base_url(&self) -> &str {
        self.platform.base_url.trim_end_matches('/')
    }
}

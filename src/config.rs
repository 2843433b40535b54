//! Run configuration
//!
//! A run is described by a JSON file deserialized into [`RunConfig`], then
//! adjusted by environment variables and CLI flags.
//!
//! # Environment Variables
//!
//! - `SITE_MERGER_NOTIFY_URL`: notification endpoint (keeps push tokens out of the config file)
//! - `SITE_MERGER_CONCURRENCY`: number of sources fetched at once
//! - `SITE_MERGER_TIMEOUT_SECS`: per-request timeout
//!
//! # Example
//!
//! ```json
//! {
//!   "base": "http://ok321.top/tv",
//!   "output": "merged.json",
//!   "sources": ["https://a.example/tv.json#jar:custom"],
//!   "targets": ["Emby", "Alist"],
//!   "spider_url": "https://b.example/tv.json",
//!   "replacements": {"old.host": "new.host"},
//!   "insert_index": 1
//! }
//! ```

use crate::aggregate::DEFAULT_CONCURRENCY;
use crate::error::ConfigError;
use crate::fetch::{validate_url, FetchOptions, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::merge::{ReplacementMap, DEFAULT_INSERT_INDEX};
use crate::resolve::DEFAULT_PLACEHOLDER;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Env var overriding the notification endpoint
pub const ENV_NOTIFY_URL: &str = "SITE_MERGER_NOTIFY_URL";
/// Env var overriding fetch concurrency
pub const ENV_CONCURRENCY: &str = "SITE_MERGER_CONCURRENCY";
/// Env var overriding the per-request timeout
pub const ENV_TIMEOUT_SECS: &str = "SITE_MERGER_TIMEOUT_SECS";

/// Upper bound accepted for `timeout_secs`
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Everything one run needs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Base document: an http(s) URL or a local path
    pub base: String,

    /// Where the merged document is written
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Copy of the base document as loaded, before any change
    #[serde(default)]
    pub snapshot_output: Option<PathBuf>,

    /// Where the aggregated entries are written, if anywhere
    #[serde(default)]
    pub aggregated_output: Option<PathBuf>,

    /// Source URLs, each optionally carrying `#key:value` fields
    #[serde(default)]
    pub sources: Vec<String>,

    /// Site names to collect
    #[serde(default)]
    pub targets: Vec<String>,

    /// Secondary document supplying the `spider` value for placeholders
    #[serde(default)]
    pub spider_url: Option<String>,

    /// Sentinel replaced by the resolved spider value
    #[serde(default = "default_placeholder")]
    pub placeholder: String,

    /// New value for the base document's top-level `spider`
    #[serde(default)]
    pub spider: Option<String>,

    /// Substring replacements applied across the base document
    #[serde(default)]
    pub replacements: ReplacementMap,

    /// Position in `sites` where new entries go
    #[serde(default = "default_insert_index")]
    pub insert_index: usize,

    /// Fixed entries inserted after the aggregated ones
    #[serde(default)]
    pub extra_sites: Vec<Value>,

    /// Sources fetched at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent for document fetches
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Notification endpoint
    #[serde(default)]
    pub notify_url: Option<String>,
}

fn default_output() -> PathBuf {
    PathBuf::from("merged.json")
}

fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

fn default_insert_index() -> usize {
    DEFAULT_INSERT_INDEX
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl RunConfig {
    /// Create a new config builder
    pub fn builder<S: Into<String>>(base: S) -> RunConfigBuilder {
        RunConfigBuilder::new(base)
    }

    /// Parse a config from JSON text
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a config file, apply environment overrides and validate
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json(&text)?;
        config.apply_env()?;
        config.validate()?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply `SITE_MERGER_*` environment overrides
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = env::var(ENV_NOTIFY_URL) {
            if !url.is_empty() {
                self.notify_url = Some(url);
            }
        }

        if let Ok(raw) = env::var(ENV_CONCURRENCY) {
            self.concurrency = raw
                .parse()
                .map_err(|e| ConfigError::invalid("concurrency", format!("{}: {}", raw, e)))?;
        }

        if let Ok(raw) = env::var(ENV_TIMEOUT_SECS) {
            self.timeout_secs = raw
                .parse()
                .map_err(|e| ConfigError::invalid("timeout_secs", format!("{}: {}", raw, e)))?;
        }

        Ok(())
    }

    /// Reject values no run can work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base.trim().is_empty() {
            return Err(ConfigError::invalid("base", "must not be empty"));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::invalid("concurrency", "must be at least 1"));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid("timeout_secs", "must be at least 1"));
        }
        if self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::invalid(
                "timeout_secs",
                format!("must be at most {}", MAX_TIMEOUT_SECS),
            ));
        }
        if let Some(url) = &self.spider_url {
            validate_url(url).map_err(|e| ConfigError::invalid("spider_url", e.to_string()))?;
        }
        if let Some(url) = &self.notify_url {
            validate_url(url).map_err(|e| ConfigError::invalid("notify_url", e.to_string()))?;
        }
        if self.sources.is_empty() {
            warn!("No sources configured, only extra sites will be inserted");
        }
        if !self.sources.is_empty() && self.targets.is_empty() {
            warn!("Sources configured but no target names, nothing will be aggregated");
        }
        Ok(())
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Deadline for one fetch+extract task: the request timeout plus slack for decoding
    pub fn task_timeout(&self) -> Duration {
        self.timeout().saturating_add(Duration::from_secs(5))
    }

    /// HTTP options derived from this config
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout_ms: self.timeout_secs.saturating_mul(1000),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Builder for [`RunConfig`]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    fn new<S: Into<String>>(base: S) -> Self {
        Self {
            config: RunConfig {
                base: base.into(),
                output: default_output(),
                snapshot_output: None,
                aggregated_output: None,
                sources: Vec::new(),
                targets: Vec::new(),
                spider_url: None,
                placeholder: default_placeholder(),
                spider: None,
                replacements: ReplacementMap::default(),
                insert_index: DEFAULT_INSERT_INDEX,
                extra_sites: Vec::new(),
                concurrency: DEFAULT_CONCURRENCY,
                timeout_secs: DEFAULT_TIMEOUT_SECS,
                user_agent: default_user_agent(),
                notify_url: None,
            },
        }
    }

    /// Set the merged output path
    pub fn output<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.output = path.into();
        self
    }

    /// Set the base snapshot path
    pub fn snapshot_output<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.snapshot_output = Some(path.into());
        self
    }

    /// Set the aggregated results path
    pub fn aggregated_output<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.aggregated_output = Some(path.into());
        self
    }

    /// Add a source URL
    pub fn source<S: Into<String>>(mut self, url: S) -> Self {
        self.config.sources.push(url.into());
        self
    }

    /// Add a target name
    pub fn target<S: Into<String>>(mut self, name: S) -> Self {
        self.config.targets.push(name.into());
        self
    }

    /// Set the secondary spider document URL
    pub fn spider_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.spider_url = Some(url.into());
        self
    }

    /// Set the placeholder sentinel
    pub fn placeholder<S: Into<String>>(mut self, placeholder: S) -> Self {
        self.config.placeholder = placeholder.into();
        self
    }

    /// Set the new top-level spider value
    pub fn spider<S: Into<String>>(mut self, spider: S) -> Self {
        self.config.spider = Some(spider.into());
        self
    }

    /// Add a substring replacement
    pub fn replace<O: Into<String>, N: Into<String>>(mut self, old: O, new: N) -> Self {
        self.config.replacements.insert(old, new);
        self
    }

    /// Set the insertion index
    pub fn insert_index(mut self, index: usize) -> Self {
        self.config.insert_index = index;
        self
    }

    /// Add a fixed entry
    pub fn extra_site(mut self, site: Value) -> Self {
        self.config.extra_sites.push(site);
        self
    }

    /// Set fetch concurrency
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Set the per-request timeout
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    /// Set the notification endpoint
    pub fn notify_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.notify_url = Some(url.into());
        self
    }

    /// Build the config
    pub fn build(self) -> RunConfig {
        self.config
    }
}

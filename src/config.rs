//! Sender configuration.
//!
//! A plain `serde`-deserializable struct loadable from TOML, plus a
//! programmatic builder for callers who construct configuration in code
//! rather than from a file on disk.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ShipperError;

pub const DEFAULT_URL: &str = "https://listener.logz.io:8071";
pub const DEFAULT_DRAIN_DURATION: Duration = Duration::from_secs(5);
pub const DEFAULT_DISK_THRESHOLD: f64 = 95.0;
pub const DEFAULT_IN_MEMORY_CAPACITY: u64 = 9 * 1024 * 1024;
pub const DEFAULT_LOG_COUNT_LIMIT: u64 = 500_000;
pub const MAX_BATCH_SIZE: usize = 3 * 1024 * 1024;

/// Configuration accepted at [`crate::Sender`] construction time.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    pub token: String,
    pub url: String,
    #[serde(with = "duration_millis")]
    pub drain_duration: Duration,
    pub compress: bool,
    pub in_memory_queue: bool,
    pub in_memory_capacity: u64,
    pub log_count_limit: u64,
    pub temp_directory: Option<PathBuf>,
    pub disk_threshold: f64,
    pub check_disk_space: bool,
    pub metrics_enabled: bool,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            url: DEFAULT_URL.to_string(),
            drain_duration: DEFAULT_DRAIN_DURATION,
            compress: true,
            in_memory_queue: false,
            in_memory_capacity: DEFAULT_IN_MEMORY_CAPACITY,
            log_count_limit: DEFAULT_LOG_COUNT_LIMIT,
            temp_directory: None,
            disk_threshold: DEFAULT_DISK_THRESHOLD,
            check_disk_space: true,
            metrics_enabled: true,
        }
    }
}

impl SenderConfig {
    pub fn builder(token: impl Into<String>) -> SenderConfigBuilder {
        SenderConfigBuilder {
            config: Self {
                token: token.into(),
                ..Self::default()
            },
        }
    }

    /// Load a configuration from a TOML file on disk.
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file at {:?}: {e}", path))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("failed to parse TOML config at {:?}: {e}", path))?;
        Ok(config)
    }

    /// The `"<baseUrl>/?token=<token>"` rewrite; empty token leaves `url`
    /// untouched, returned exactly as configured.
    ///
    /// Built as a plain string template rather than through `reqwest::Url`'s
    /// mutation API: the `url` crate normalizes a bare-authority URL like
    /// `"http://localhost:12345"` to `"http://localhost:12345/"` on
    /// serialization, which would make the empty-token case observably
    /// rewrite a URL it's supposed to leave alone.
    pub fn resolved_url_string(&self) -> String {
        if self.token.is_empty() {
            self.url.clone()
        } else {
            format!("{}/?token={}", self.url.trim_end_matches('/'), self.token)
        }
    }

    /// [`SenderConfig::resolved_url_string`], parsed into a `reqwest::Url`
    /// for the transport layer to post against.
    pub fn resolved_url(&self) -> Result<reqwest::Url, ShipperError> {
        reqwest::Url::parse(&self.resolved_url_string())
            .map_err(|e| ShipperError::InvalidConfig(format!("invalid url: {e}")))
    }

    /// Directory the durable queue persists into, falling back to a
    /// per-process temp directory when unset.
    pub fn resolved_temp_directory(&self) -> PathBuf {
        self.temp_directory.clone().unwrap_or_else(|| {
            std::env::temp_dir()
                .join("log-shipper-buffer")
                .join(format!("{}", std::process::id()))
        })
    }
}

#[derive(Debug)]
pub struct SenderConfigBuilder {
    config: SenderConfig,
}

impl SenderConfigBuilder {
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    pub fn drain_duration(mut self, duration: Duration) -> Self {
        self.config.drain_duration = duration;
        self
    }

    pub fn compress(mut self, compress: bool) -> Self {
        self.config.compress = compress;
        self
    }

    pub fn in_memory_queue(mut self, enabled: bool) -> Self {
        self.config.in_memory_queue = enabled;
        self
    }

    pub fn in_memory_capacity(mut self, capacity: u64) -> Self {
        self.config.in_memory_capacity = capacity;
        self
    }

    pub fn log_count_limit(mut self, limit: u64) -> Self {
        self.config.log_count_limit = limit;
        self
    }

    pub fn temp_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_directory = Some(dir.into());
        self
    }

    pub fn disk_threshold(mut self, threshold: f64) -> Self {
        self.config.disk_threshold = threshold;
        self
    }

    pub fn check_disk_space(mut self, enabled: bool) -> Self {
        self.config.check_disk_space = enabled;
        self
    }

    pub fn metrics_enabled(mut self, enabled: bool) -> Self {
        self.config.metrics_enabled = enabled;
        self
    }

    pub fn build(self) -> SenderConfig {
        self.config
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

//! Extractor configuration

use crate::utils::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_FALLBACK_ORDER: [&str; 4] = ["simple", "yt-dlp", "cobalt", "gallery-dl"];
pub const DEFAULT_COBALT_API_URL: &str = "https://co.wuk.sh/api/json";

/// Extractor settings, loaded from `settings.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorSettings {
    /// Attempts per extractor, including the first one
    pub max_retries: u32,

    /// Linear backoff unit between attempts (milliseconds)
    pub retry_base_delay_ms: u64,

    /// Upper bound on a single attempt; `0` disables it
    pub attempt_timeout_secs: u64,

    /// Extractor names in priority order; unnamed extractors go last
    pub fallback_order: Vec<String>,

    /// Cobalt JSON API endpoint
    pub cobalt_api_url: String,

    /// Explicit yt-dlp binary; discovered on PATH when unset
    pub ytdlp_path: Option<PathBuf>,

    /// Explicit gallery-dl binary; discovered on PATH when unset
    pub gallery_dl_path: Option<PathBuf>,

    /// Timeout for oEmbed / API requests (seconds)
    pub http_timeout_secs: u64,

    pub user_agent: String,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_base_delay_ms: 1000,
            attempt_timeout_secs: 120,
            fallback_order: DEFAULT_FALLBACK_ORDER.iter().map(|s| s.to_string()).collect(),
            cobalt_api_url: DEFAULT_COBALT_API_URL.to_string(),
            ytdlp_path: None,
            gallery_dl_path: None,
            http_timeout_secs: 30,
            user_agent: concat!("vidfetch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ExtractorSettings {
    /// `<config_dir>/vidfetch/settings.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vidfetch")
            .join("settings.json")
    }

    /// Load settings from `path`, or the default location when `None`.
    ///
    /// A missing file yields defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);

        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path).map_err(|source| SettingsError::Read {
            path: path.clone(),
            source,
        })?;
        let settings: ExtractorSettings =
            serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
                path: path.clone(),
                source,
            })?;

        info!("Loaded settings from {}", path.display());
        Ok(settings.normalized())
    }

    /// Enforce sane minimums
    pub fn normalized(mut self) -> Self {
        if self.max_retries == 0 {
            self.max_retries = 1;
        }
        if self.http_timeout_secs == 0 {
            self.http_timeout_secs = 1;
        }
        self
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        (self.attempt_timeout_secs > 0).then(|| Duration::from_secs(self.attempt_timeout_secs))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Shared HTTP client for the HTTP-backed extractors
    pub fn http_client(&self) -> Result<reqwest::Client, SettingsError> {
        Ok(reqwest::Client::builder()
            .timeout(self.http_timeout())
            .user_agent(self.user_agent.clone())
            .build()?)
    }
}

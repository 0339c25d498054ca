use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{ContentLength, ItemId, SearchResult};

/// Body of `POST /api/video-info`
#[derive(Debug, Clone, Serialize)]
pub struct VideoInfoRequest<'a> {
    pub url: &'a str,
}

/// Response from the /api/video-info endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct VideoInfoResponse {
    #[serde(default)]
    pub streams: Vec<StreamInfo>,
}

/// Error body the backend sends alongside non-2xx statuses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body of `POST /api/download`
#[derive(Debug, Clone, Serialize)]
pub struct DownloadRequest<'a> {
    pub url: &'a str,
    pub itag: Itag,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Itag {
    Number(u64),
    Text(String),
}

impl Itag {
    /// Numeric ids go back on the wire as numbers, which is what the backend looks up.
    pub fn from_item(id: &ItemId) -> Self {
        match id.as_str().parse::<u64>() {
            Ok(n) => Itag::Number(n),
            Err(_) => Itag::Text(id.as_str().to_string()),
        }
    }

    fn to_item(&self) -> ItemId {
        match self {
            Itag::Number(n) => ItemId::new(n.to_string()),
            Itag::Text(s) => ItemId::new(s.clone()),
        }
    }
}

/// File size as reported by the backend: a byte count or the "N/A" sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FileSize {
    Bytes(u64),
    Sentinel(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamInfo {
    pub itag: Itag,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub abr: Option<String>,
    #[serde(default)]
    pub fps: Option<u32>,
    pub mime_type: String,
    #[serde(default)]
    pub filesize: Option<FileSize>,
    #[serde(default = "default_progressive")]
    pub is_progressive: bool,
}

fn default_progressive() -> bool {
    true
}

impl From<StreamInfo> for SearchResult {
    fn from(info: StreamInfo) -> Self {
        let size = match info.filesize {
            Some(FileSize::Bytes(bytes)) => ContentLength::Known(bytes),
            Some(FileSize::Sentinel(_)) | None => ContentLength::Unknown,
        };
        let quality = info
            .resolution
            .or(info.abr)
            .unwrap_or_else(|| "unknown".to_string());

        SearchResult {
            id: info.itag.to_item(),
            quality,
            mime_type: info.mime_type,
            size,
            progressive: info.is_progressive,
            fps: info.fps,
        }
    }
}

const ENV_BASE_URL: &str = "VIDEO_DL_BASE_URL";
const ENV_RESULT_LINGER_MS: &str = "VIDEO_DL_RESULT_LINGER_MS";
const ENV_PROCESSING_TIMEOUT_SECS: &str = "VIDEO_DL_PROCESSING_TIMEOUT_SECS";

/// Configuration for the API client and download lifecycle
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// How long a finished or failed download stays on screen before it resets.
    pub result_linger: Duration,
    /// Upper bound on the server-side processing window. `None` waits forever.
    pub processing_timeout: Option<Duration>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            result_linger: Duration::from_secs(3),
            processing_timeout: None,
        }
    }
}

impl ApiConfig {
    /// Defaults overlaid with `VIDEO_DL_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(base_url) = lookup(ENV_BASE_URL) {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }

        if let Some(raw) = lookup(ENV_RESULT_LINGER_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.result_linger = Duration::from_millis(ms),
                Err(e) => tracing::warn!(value = %raw, error = %e, "ignoring {}", ENV_RESULT_LINGER_MS),
            }
        }

        if let Some(raw) = lookup(ENV_PROCESSING_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(0) => config.processing_timeout = None,
                Ok(secs) => config.processing_timeout = Some(Duration::from_secs(secs)),
                Err(e) => {
                    tracing::warn!(value = %raw, error = %e, "ignoring {}", ENV_PROCESSING_TIMEOUT_SECS)
                }
            }
        }

        config
    }
}

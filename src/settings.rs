//! Load user settings (endpoint, headers, fetch tuning) from config file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

use crate::constants::{CHUNK_SIZE, POLL_INTERVAL};
use crate::error::Error;

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5051/files/read";
pub const ENDPOINT_ENV: &str = "SANDTAIL_ENDPOINT";

fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sandtail").join("settings.json"))
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Read endpoint URL, without query string.
    pub endpoint: String,
    /// Sent with every read request.
    pub headers: BTreeMap<String, String>,
    pub chunk_size: usize,
    pub poll_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            headers: BTreeMap::new(),
            chunk_size: CHUNK_SIZE,
            poll_interval_ms: POLL_INTERVAL.as_millis() as u64,
        }
    }
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn header_map(&self) -> Result<HeaderMap, Error> {
        header_map(self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

/// Settings from the config file, with the endpoint overridable by
/// `SANDTAIL_ENDPOINT`. A missing or unreadable file yields defaults.
pub fn load_settings() -> Settings {
    let mut settings = match settings_path() {
        Some(path) if path.exists() => load_from(&path),
        _ => Settings::default(),
    };
    if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
        if !endpoint.is_empty() {
            settings.endpoint = endpoint;
        }
    }
    settings
}

pub fn load_from(path: &Path) -> Settings {
    let s = match fs::read_to_string(path) {
        Ok(x) => x,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read settings, using defaults");
            return Settings::default();
        }
    };
    match serde_json::from_str(&s) {
        Ok(x) => x,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "invalid settings, using defaults");
            Settings::default()
        }
    }
}

/// Builds request headers from name/value pairs; later pairs win.
pub fn header_map<'a>(
    pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|_| Error::InvalidHeader(name.to_string()))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|_| Error::InvalidHeader(name.as_str().to_string()))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Parses `Name: value` as given on the command line.
pub fn parse_header(raw: &str) -> Result<(String, String), String> {
    match raw.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected NAME: VALUE, got {:?}", raw)),
    }
}

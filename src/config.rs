//! Client configuration with build-time defaults and runtime overrides.
//!
//! Defaults come from `option_env!` values baked in at build time so packaged
//! builds point at the right API without flags. Environment variables read at
//! startup override them; empty values are ignored. Configuration values are
//! public; do not store secrets here.

use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::{env, path::PathBuf, time::Duration};
use url::Url;

/// Default request timeout applied to every remote call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default connect timeout applied to every remote call.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_base_url: Url,
    pub timeout: Duration,
    pub storage_dir: PathBuf,
}

impl ClientConfig {
    /// Builds a config for an explicit API base URL with default timeout and storage.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the URL is not an absolute http(s) URL.
    pub fn new(api_base_url: &str) -> Result<Self> {
        Ok(Self {
            api_base_url: parse_base_url(api_base_url)?,
            timeout: DEFAULT_TIMEOUT,
            storage_dir: default_storage_dir(),
        })
    }

    /// Loads the build-time defaults and applies environment overrides.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the resulting base URL or timeout is invalid.
    pub fn load() -> Result<Self> {
        let api_base_url = option_env!("AUTHFRONT_API_BASE_URL").unwrap_or(DEFAULT_API_BASE_URL);
        let mut config = Self::new(api_base_url)?;
        apply_runtime_overrides(&mut config, runtime_config())?;
        Ok(config)
    }

    /// # Errors
    /// Returns [`Error::Config`] if the URL is not an absolute http(s) URL.
    pub fn with_api_base_url(mut self, api_base_url: &str) -> Result<Self> {
        self.api_base_url = parse_base_url(api_base_url)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_storage_dir(mut self, storage_dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = storage_dir.into();
        self
    }

    /// Joins an endpoint path onto the base URL, keeping any base path prefix
    /// (e.g. a stage name such as `/Dev`).
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the joined URL does not parse.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let base = self.api_base_url.as_str().trim_end_matches('/');
        let path = path.trim().trim_start_matches('/');
        let joined = format!("{base}/{path}");
        Url::parse(&joined).map_err(|err| Error::Config(format!("Invalid endpoint {joined}: {err}")))
    }

    /// Storage partition key derived from the API origin (scheme, host, port).
    #[must_use]
    pub fn origin_key(&self) -> String {
        self.api_base_url
            .origin()
            .ascii_serialization()
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || ch == '.' || ch == '-' {
                    ch
                } else {
                    '_'
                }
            })
            .collect()
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|err| Error::Config(format!("Invalid API base URL {raw}: {err}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::Config(format!(
            "Invalid API base URL {raw}: unsupported scheme {scheme}"
        ))),
    }
}

fn default_storage_dir() -> PathBuf {
    ProjectDirs::from("dev", "authfront", "authfront")
        .map_or_else(|| PathBuf::from(".authfront"), |dirs| dirs.data_dir().to_path_buf())
}

#[derive(Default)]
struct RuntimeConfig {
    api_base_url: Option<String>,
    timeout_secs: Option<String>,
    storage_dir: Option<String>,
}

fn runtime_config() -> RuntimeConfig {
    RuntimeConfig {
        api_base_url: read_runtime_value("AUTHFRONT_API_URL"),
        timeout_secs: read_runtime_value("AUTHFRONT_TIMEOUT_SECS"),
        storage_dir: read_runtime_value("AUTHFRONT_STORAGE_DIR"),
    }
}

fn apply_runtime_overrides(config: &mut ClientConfig, runtime: RuntimeConfig) -> Result<()> {
    if let Some(value) = runtime.api_base_url {
        config.api_base_url = parse_base_url(&value)?;
    }
    if let Some(value) = runtime.timeout_secs {
        let secs = value
            .parse::<u64>()
            .map_err(|_| Error::Config(format!("Invalid timeout: {value}")))?;
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(value) = runtime.storage_dir {
        config.storage_dir = PathBuf::from(value);
    }
    Ok(())
}

fn read_runtime_value(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| normalize_runtime_value(&value))
}

fn normalize_runtime_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

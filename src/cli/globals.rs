use crate::{client::AuthClient, config::ClientConfig};
use anyhow::{Context, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub config: ClientConfig,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Starts from the environment-derived config and applies the flags.
    ///
    /// # Errors
    /// Returns an error if the base URL or an environment override is invalid.
    pub fn from_matches(matches: &clap::ArgMatches) -> Result<Self> {
        let mut config = ClientConfig::load().context("invalid client configuration")?;

        if let Some(url) = matches.get_one::<String>("api-url") {
            config = config
                .with_api_base_url(url)
                .context("invalid --api-url")?;
        }
        if let Some(dir) = matches.get_one::<String>("storage-dir") {
            config = config.with_storage_dir(dir);
        }
        if let Some(secs) = matches.get_one::<u64>("timeout") {
            config = config.with_timeout(Duration::from_secs(*secs));
        }

        Ok(Self::new(config))
    }

    /// Opens the persisted session for the configured origin.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn client(&self) -> Result<AuthClient> {
        Ok(AuthClient::open(self.config.clone())?)
    }
}

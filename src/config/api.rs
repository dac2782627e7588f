//! API Config

use clap::Args;

use crate::{config::ConfigError, http::ApiClient};

/// Storefront backend settings.
#[derive(Debug, Args)]
pub struct ApiConfig {
    /// Base URL of the storefront REST API
    #[arg(long, env = "STOREFRONT_API_URL")]
    pub api_url: Option<String>,

    /// Bearer token sent with every request
    #[arg(long, env = "STOREFRONT_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,
}

impl ApiConfig {
    /// Build an API client.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiUrl`] if no URL is configured, or
    /// [`ConfigError::Api`] if it is not a usable base URL.
    pub fn client(&self) -> Result<ApiClient, ConfigError> {
        let url = self.api_url.as_deref().ok_or(ConfigError::MissingApiUrl)?;

        Ok(ApiClient::new(url, self.api_token.clone())?)
    }
}

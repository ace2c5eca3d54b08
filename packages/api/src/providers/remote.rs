//! Client-side provider registry backed by `GET /api/auth/providers`.

use async_trait::async_trait;
use reqwest::{header, Client};
use thiserror::Error;
use tracing::{debug, error, instrument};

use super::{EnabledProviders, ProviderRegistry};
use crate::{APP_USER_AGENT, DEFAULT_BASE_PATH};

/// Where a client finds the gateway that serves the providers endpoint.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base URL of the gateway (default `http://localhost:3000`, its default `PORT`).
    /// The Session Issuer itself does not serve `/providers`.
    pub api_url: String,

    /// Path prefix of the auth routes (default: `/api/auth`).
    pub base_path: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000".to_string(),
            base_path: DEFAULT_BASE_PATH.to_string(),
        }
    }
}

impl ClientOptions {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Default::default()
        }
    }

    fn providers_endpoint(&self) -> String {
        format!(
            "{}{}/providers",
            self.api_url.trim_end_matches('/'),
            self.base_path
        )
    }
}

#[derive(Debug, Error)]
enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),
}

/// Fetches the enabled providers from the authentication service on every call.
///
/// Nothing is cached, so a change to the service's environment shows up on the
/// next call. Any failure degrades to [`EnabledProviders::fallback`].
#[derive(Debug, Clone)]
pub struct RemoteProviders {
    client: Client,
    endpoint: String,
}

impl RemoteProviders {
    pub fn new(options: &ClientOptions) -> Self {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: options.providers_endpoint(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch(&self) -> Result<EnabledProviders, FetchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header(header::CACHE_CONTROL, "no-store")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ProviderRegistry for RemoteProviders {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn enabled_providers(&self) -> EnabledProviders {
        match self.fetch().await {
            Ok(providers) => {
                debug!(?providers, "fetched enabled providers");
                providers
            }
            Err(e) => {
                error!("Failed to fetch providers: {}", e);
                EnabledProviders::fallback()
            }
        }
    }
}

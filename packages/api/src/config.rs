//! # Settings
//!
//! [`Settings`] is built once at startup and passed by reference to everything that
//! needs it. Values come from, in increasing priority:
//!
//! 1. built-in defaults,
//! 2. an optional `auth.toml` in the working directory,
//! 3. the process environment (`GITHUB_CLIENT_ID`, `AUTH_BASE_URL`, ...).
//!
//! OAuth providers are switched on purely by the presence of their credentials: a
//! provider with a missing or blank client id or secret is disabled as a whole.

use std::time::Duration;

use async_trait::async_trait;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::providers::{
    EnabledProviders, OAuthProvider, ProviderConfig, ProviderKind, ProviderRegistry,
};
use crate::DEFAULT_BASE_PATH;

/// Default session lifetime: 30 days.
pub const DEFAULT_SESSION_LIFETIME: Duration = Duration::from_secs(60 * 60 * 24 * 30);

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("invalid URL in {name}: {source}")]
    InvalidUrl {
        name: &'static str,
        source: url::ParseError,
    },
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Flat view of the configuration sources, one field per variable.
#[derive(Debug, Deserialize)]
struct RawSettings {
    #[serde(default)]
    github_client_id: Option<String>,
    #[serde(default)]
    github_client_secret: Option<String>,
    #[serde(default)]
    google_client_id: Option<String>,
    #[serde(default)]
    google_client_secret: Option<String>,
    auth_base_url: String,
    #[serde(default)]
    auth_issuer_url: Option<String>,
    app_url: String,
    #[serde(default)]
    trusted_origins: Option<String>,
    session_expires_in: u64,
    port: u16,
}

/// Process-wide authentication configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Public base URL of the authentication service; OAuth callbacks hang off it.
    pub base_url: Url,
    /// Where the gateway reaches the Session Issuer. Defaults to `base_url`.
    pub issuer_url: Url,
    /// Route prefix of the Session Issuer.
    pub base_path: String,
    /// Origins allowed as OAuth callback targets, serialized as `scheme://host[:port]`.
    /// The first entry is the front-end's own origin.
    pub trusted_origins: Vec<String>,
    pub session_lifetime: Duration,
    pub port: u16,
    pub email_password: ProviderConfig,
    pub github: ProviderConfig,
    pub google: ProviderConfig,
}

impl Settings {
    /// Load settings from defaults, `auth.toml` and the environment.
    pub fn load() -> Result<Self, SettingsError> {
        let config = Config::builder()
            .set_default("auth_base_url", "http://localhost:3001")?
            .set_default("app_url", "http://localhost:3000")?
            .set_default("session_expires_in", DEFAULT_SESSION_LIFETIME.as_secs())?
            .set_default("port", 3000)?
            .add_source(
                File::with_name("auth.toml")
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(Environment::default())
            .build()?;

        Self::from_raw(config.try_deserialize()?)
    }

    fn from_raw(raw: RawSettings) -> Result<Self, SettingsError> {
        let base_url = parse_url("AUTH_BASE_URL", &raw.auth_base_url)?;
        let issuer_url = match raw.auth_issuer_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => parse_url("AUTH_ISSUER_URL", url)?,
            _ => base_url.clone(),
        };

        let mut trusted_origins = vec![origin_of("APP_URL", &raw.app_url)?];
        for origin in raw
            .trusted_origins
            .iter()
            .flat_map(|list| list.split(','))
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
        {
            let origin = origin_of("TRUSTED_ORIGINS", origin)?;
            if !trusted_origins.contains(&origin) {
                trusted_origins.push(origin);
            }
        }

        Ok(Self {
            github: ProviderConfig::oauth(
                OAuthProvider::Github,
                raw.github_client_id.as_deref(),
                raw.github_client_secret.as_deref(),
                &base_url,
            )?,
            google: ProviderConfig::oauth(
                OAuthProvider::Google,
                raw.google_client_id.as_deref(),
                raw.google_client_secret.as_deref(),
                &base_url,
            )?,
            email_password: ProviderConfig::email_password(),
            base_url,
            issuer_url,
            base_path: DEFAULT_BASE_PATH.to_string(),
            trusted_origins,
            session_lifetime: Duration::from_secs(raw.session_expires_in),
            port: raw.port,
        })
    }

    pub fn provider(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::EmailPassword => &self.email_password,
            ProviderKind::Github => &self.github,
            ProviderKind::Google => &self.google,
        }
    }

    pub fn providers(&self) -> [&ProviderConfig; 3] {
        [&self.email_password, &self.github, &self.google]
    }

    /// Snapshot of the enabled providers.
    pub fn enabled(&self) -> EnabledProviders {
        EnabledProviders::from_configs(self.providers())
    }
}

#[async_trait]
impl ProviderRegistry for Settings {
    async fn enabled_providers(&self) -> EnabledProviders {
        self.enabled()
    }
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, SettingsError> {
    Url::parse(value.trim()).map_err(|source| SettingsError::InvalidUrl { name, source })
}

fn origin_of(name: &'static str, value: &str) -> Result<String, SettingsError> {
    Ok(parse_url(name, value)?.origin().ascii_serialization())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 10] = [
        "GITHUB_CLIENT_ID",
        "GITHUB_CLIENT_SECRET",
        "GOOGLE_CLIENT_ID",
        "GOOGLE_CLIENT_SECRET",
        "AUTH_BASE_URL",
        "AUTH_ISSUER_URL",
        "APP_URL",
        "TRUSTED_ORIGINS",
        "SESSION_EXPIRES_IN",
        "PORT",
    ];

    /// Run `f` with every settings variable unset except `vars`.
    fn with_env<R>(vars: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
        let mut kvs: Vec<(&str, Option<&str>)> = VARS.iter().map(|k| (*k, None)).collect();
        for &(key, value) in vars {
            if let Some(slot) = kvs.iter_mut().find(|(k, _)| *k == key) {
                slot.1 = Some(value);
            }
        }
        temp_env::with_vars(kvs, f)
    }

    #[test]
    fn defaults() {
        let settings = with_env(&[], Settings::load).unwrap();

        assert_eq!(settings.base_url.as_str(), "http://localhost:3001/");
        assert_eq!(settings.issuer_url, settings.base_url);
        assert_eq!(settings.base_path, "/api/auth");
        assert_eq!(settings.trusted_origins, ["http://localhost:3000"]);
        assert_eq!(settings.session_lifetime, Duration::from_secs(2_592_000));
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.enabled(), EnabledProviders::fallback());
    }

    #[test]
    fn github_enabled_from_env() {
        let settings = with_env(
            &[
                ("GITHUB_CLIENT_ID", "gh-id"),
                ("GITHUB_CLIENT_SECRET", "gh-secret"),
                ("GOOGLE_CLIENT_ID", "only-the-id"),
                ("AUTH_BASE_URL", "https://auth.example.com"),
            ],
            Settings::load,
        )
        .unwrap();

        assert_eq!(
            settings.enabled(),
            EnabledProviders {
                email_password: true,
                github: true,
                google: false
            }
        );
        assert_eq!(
            settings.github.redirect_uri.as_ref().unwrap().as_str(),
            "https://auth.example.com/api/auth/callback/github"
        );
        assert!(settings.google.client_id.is_none());
    }

    #[test]
    fn empty_secret_disables_provider() {
        let settings = with_env(
            &[("GOOGLE_CLIENT_ID", "id"), ("GOOGLE_CLIENT_SECRET", "")],
            Settings::load,
        )
        .unwrap();
        assert!(!settings.provider(ProviderKind::Google).enabled);
    }

    #[test]
    fn trusted_origins_are_normalized_and_deduplicated() {
        let settings = with_env(
            &[
                ("APP_URL", "https://app.example.com/dashboard"),
                (
                    "TRUSTED_ORIGINS",
                    "https://admin.example.com/, https://app.example.com ,",
                ),
            ],
            Settings::load,
        )
        .unwrap();
        assert_eq!(
            settings.trusted_origins,
            ["https://app.example.com", "https://admin.example.com"]
        );
    }

    #[test]
    fn issuer_url_and_lifetime_overrides() {
        let settings = with_env(
            &[
                ("AUTH_ISSUER_URL", "http://issuer.internal:3001"),
                ("SESSION_EXPIRES_IN", "3600"),
                ("PORT", "8080"),
            ],
            Settings::load,
        )
        .unwrap();
        assert_eq!(settings.issuer_url.as_str(), "http://issuer.internal:3001/");
        assert_eq!(settings.session_lifetime, Duration::from_secs(3600));
        assert_eq!(settings.port, 8080);
    }

    #[test]
    fn invalid_base_url_is_an_error() {
        let err = with_env(&[("AUTH_BASE_URL", "not a url")], Settings::load).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::InvalidUrl {
                name: "AUTH_BASE_URL",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn settings_answer_as_registry() {
        let settings = with_env(
            &[("GOOGLE_CLIENT_ID", "id"), ("GOOGLE_CLIENT_SECRET", "secret")],
            Settings::load,
        )
        .unwrap();
        let providers = settings.enabled_providers().await;
        assert!(providers.google);
        assert!(!providers.github);
    }
}

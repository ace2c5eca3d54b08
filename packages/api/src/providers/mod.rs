//! # Authentication providers
//!
//! A *provider* is one way of signing in: email + password, or an OAuth identity
//! provider (GitHub, Google). This module owns:
//!
//! - [`ProviderKind`] / [`OAuthProvider`]: the closed set of methods and their wire names.
//! - [`ProviderConfig`]: the per-provider OAuth credentials, callback URL and endpoints
//!   derived from [`Settings`](crate::Settings). An OAuth provider is enabled only when
//!   both its client id and client secret are present; otherwise neither is kept.
//! - [`EnabledProviders`]: the read-only snapshot exposed to clients as
//!   `GET /api/auth/providers`.
//! - [`ProviderRegistry`]: the read side both the gateway and the form controller
//!   depend on. [`Settings`](crate::Settings) implements it on the server; [`RemoteProviders`]
//!   implements it for clients by calling the providers endpoint.

mod remote;

pub use remote::{ClientOptions, RemoteProviders};

use std::fmt;

use async_trait::async_trait;
use oauth2::{AuthUrl, ClientId, ClientSecret, RedirectUrl, Scope, TokenUrl};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::SettingsError;
use crate::DEFAULT_BASE_PATH;

/// Every sign-in method the gateway knows about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    EmailPassword,
    Github,
    Google,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [Self::EmailPassword, Self::Github, Self::Google];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmailPassword => "email_password",
            Self::Github => "github",
            Self::Google => "google",
        }
    }

    /// The OAuth provider behind this kind, if any.
    pub fn oauth(self) -> Option<OAuthProvider> {
        match self {
            Self::EmailPassword => None,
            Self::Github => Some(OAuthProvider::Github),
            Self::Google => Some(OAuthProvider::Google),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OAuth identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Github,
    Google,
}

impl OAuthProvider {
    /// Display order for sign-in buttons.
    pub const ALL: [OAuthProvider; 2] = [Self::Github, Self::Google];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Google => "google",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Github => "GitHub",
            Self::Google => "Google",
        }
    }

    pub fn kind(self) -> ProviderKind {
        match self {
            Self::Github => ProviderKind::Github,
            Self::Google => ProviderKind::Google,
        }
    }

    fn auth_url(self) -> &'static str {
        match self {
            Self::Github => "https://github.com/login/oauth/authorize",
            Self::Google => "https://accounts.google.com/o/oauth2/v2/auth",
        }
    }

    fn token_url(self) -> &'static str {
        match self {
            Self::Github => "https://github.com/login/oauth/access_token",
            Self::Google => "https://oauth2.googleapis.com/token",
        }
    }

    fn scopes(self) -> &'static [&'static str] {
        match self {
            Self::Github => &["read:user", "user:email"],
            Self::Google => &["openid", "email", "profile"],
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the callback URL the Session Issuer serves for `provider`:
/// `{base_url}/api/auth/callback/{provider}`.
pub fn callback_url(base_url: &Url, provider: OAuthProvider) -> Result<RedirectUrl, SettingsError> {
    let base = base_url.as_str().trim_end_matches('/');
    Ok(RedirectUrl::new(format!(
        "{base}{DEFAULT_BASE_PATH}/callback/{provider}"
    ))?)
}

/// Configuration of a single provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub name: ProviderKind,
    pub enabled: bool,
    pub client_id: Option<ClientId>,
    pub client_secret: Option<ClientSecret>,
    pub redirect_uri: Option<RedirectUrl>,
    pub auth_url: Option<AuthUrl>,
    pub token_url: Option<TokenUrl>,
    pub scopes: Vec<Scope>,
}

impl ProviderConfig {
    /// Email + password sign-in, which is always available.
    pub fn email_password() -> Self {
        Self {
            name: ProviderKind::EmailPassword,
            enabled: true,
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            auth_url: None,
            token_url: None,
            scopes: Vec::new(),
        }
    }

    /// OAuth provider configuration from optional raw credentials.
    ///
    /// Blank values count as missing. Unless both halves are present the provider is
    /// disabled and neither credential is retained.
    pub fn oauth(
        provider: OAuthProvider,
        client_id: Option<&str>,
        client_secret: Option<&str>,
        base_url: &Url,
    ) -> Result<Self, SettingsError> {
        let credentials = match (non_blank(client_id), non_blank(client_secret)) {
            (Some(id), Some(secret)) => Some((
                ClientId::new(id.to_string()),
                ClientSecret::new(secret.to_string()),
            )),
            _ => None,
        };
        let (client_id, client_secret) = credentials.unzip();

        Ok(Self {
            name: provider.kind(),
            enabled: client_id.is_some(),
            client_id,
            client_secret,
            redirect_uri: Some(callback_url(base_url, provider)?),
            auth_url: Some(AuthUrl::new(provider.auth_url().to_string())?),
            token_url: Some(TokenUrl::new(provider.token_url().to_string())?),
            scopes: provider
                .scopes()
                .iter()
                .map(|scope| Scope::new((*scope).to_string()))
                .collect(),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Which sign-in methods are currently enabled, as exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnabledProviders {
    pub email_password: bool,
    pub github: bool,
    pub google: bool,
}

impl EnabledProviders {
    /// Answer used whenever the real configuration cannot be read:
    /// email + password only, every OAuth provider off.
    pub const fn fallback() -> Self {
        Self {
            email_password: true,
            github: false,
            google: false,
        }
    }

    pub fn from_configs<'a>(configs: impl IntoIterator<Item = &'a ProviderConfig>) -> Self {
        let mut enabled = Self {
            email_password: false,
            github: false,
            google: false,
        };
        for config in configs {
            match config.name {
                ProviderKind::EmailPassword => enabled.email_password = config.enabled,
                ProviderKind::Github => enabled.github = config.enabled,
                ProviderKind::Google => enabled.google = config.enabled,
            }
        }
        enabled
    }

    pub fn is_enabled(&self, kind: ProviderKind) -> bool {
        match kind {
            ProviderKind::EmailPassword => self.email_password,
            ProviderKind::Github => self.github,
            ProviderKind::Google => self.google,
        }
    }

    /// Enabled OAuth providers, in display order.
    pub fn oauth(&self) -> impl Iterator<Item = OAuthProvider> + '_ {
        OAuthProvider::ALL
            .into_iter()
            .filter(|provider| self.is_enabled(provider.kind()))
    }

    pub fn has_oauth(&self) -> bool {
        self.github || self.google
    }
}

impl Default for EnabledProviders {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Read access to the set of enabled providers.
///
/// Implementations never fail: an unreachable configuration source degrades to
/// [`EnabledProviders::fallback`].
#[async_trait]
pub trait ProviderRegistry: Send + Sync {
    async fn enabled_providers(&self) -> EnabledProviders;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://localhost:3001").unwrap()
    }

    #[test]
    fn oauth_enabled_iff_both_credentials_present() {
        let cases = [
            (None, None, false),
            (Some("id"), None, false),
            (None, Some("secret"), false),
            (Some("id"), Some("secret"), true),
        ];

        for provider in OAuthProvider::ALL {
            for (id, secret, expected) in cases {
                let config = ProviderConfig::oauth(provider, id, secret, &base()).unwrap();
                assert_eq!(config.enabled, expected, "{provider}: id={id:?} secret={secret:?}");
                assert_eq!(config.client_id.is_some(), expected);
                assert_eq!(config.client_secret.is_some(), expected);
            }
        }
    }

    #[test]
    fn blank_credentials_count_as_missing() {
        let config =
            ProviderConfig::oauth(OAuthProvider::Github, Some("  "), Some("secret"), &base())
                .unwrap();
        assert!(!config.enabled);
        assert!(config.client_id.is_none());
        assert!(config.client_secret.is_none());
    }

    #[test]
    fn credentials_are_trimmed() {
        let config =
            ProviderConfig::oauth(OAuthProvider::Google, Some(" id "), Some(" s "), &base())
                .unwrap();
        assert_eq!(config.client_id.unwrap().as_str(), "id");
        assert_eq!(config.client_secret.unwrap().secret(), "s");
    }

    #[test]
    fn callback_url_template() {
        let url = callback_url(&base(), OAuthProvider::Github).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3001/api/auth/callback/github");

        let with_slash = Url::parse("https://auth.example.com/").unwrap();
        let url = callback_url(&with_slash, OAuthProvider::Google).unwrap();
        assert_eq!(url.as_str(), "https://auth.example.com/api/auth/callback/google");
    }

    #[test]
    fn oauth_config_carries_endpoints_and_scopes() {
        let config =
            ProviderConfig::oauth(OAuthProvider::Github, Some("id"), Some("s"), &base()).unwrap();
        assert_eq!(config.name, ProviderKind::Github);
        assert_eq!(
            config.auth_url.unwrap().as_str(),
            "https://github.com/login/oauth/authorize"
        );
        let scopes: Vec<&str> = config.scopes.iter().map(|s| s.as_str()).collect();
        assert_eq!(scopes, ["read:user", "user:email"]);
    }

    #[test]
    fn email_password_is_always_enabled() {
        let config = ProviderConfig::email_password();
        assert!(config.enabled);
        assert!(config.redirect_uri.is_none());
    }

    #[test]
    fn enabled_providers_from_configs() {
        let configs = [
            ProviderConfig::email_password(),
            ProviderConfig::oauth(OAuthProvider::Github, Some("id"), Some("s"), &base()).unwrap(),
            ProviderConfig::oauth(OAuthProvider::Google, None, None, &base()).unwrap(),
        ];
        let enabled = EnabledProviders::from_configs(&configs);
        assert_eq!(
            enabled,
            EnabledProviders {
                email_password: true,
                github: true,
                google: false
            }
        );
        assert!(enabled.has_oauth());
        assert_eq!(enabled.oauth().collect::<Vec<_>>(), [OAuthProvider::Github]);
    }

    #[test]
    fn enabled_providers_wire_format() {
        let json = serde_json::to_value(EnabledProviders::fallback()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"emailPassword": true, "github": false, "google": false})
        );
    }

    #[test]
    fn provider_kind_wire_names() {
        let kind: ProviderKind = serde_json::from_str("\"email_password\"").unwrap();
        assert_eq!(kind, ProviderKind::EmailPassword);
        assert_eq!(ProviderKind::Google.oauth(), Some(OAuthProvider::Google));
        assert_eq!(ProviderKind::EmailPassword.oauth(), None);
        assert_eq!(OAuthProvider::Github.to_string(), "github");
    }
}

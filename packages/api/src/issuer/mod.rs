//! # Session Issuer seam
//!
//! The Session Issuer is the external service that checks credentials, runs the
//! OAuth dance and mints session tokens. Nothing here knows how it stores users or
//! sessions: the dispatcher talks to it only through [`SessionIssuer`], so any
//! session-store implementation can be plugged in. [`HttpSessionIssuer`] is the
//! binding for a better-auth compatible service reachable over HTTP.

mod http;

pub use http::HttpSessionIssuer;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::UserInfo;
use crate::providers::OAuthProvider;
use crate::session::SessionToken;

/// Validated email + password sign-up.
#[derive(Clone, Serialize)]
pub struct SignUpCredentials {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Validated email + password sign-in.
#[derive(Clone, Serialize)]
pub struct SignInCredentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for SignUpCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignUpCredentials")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for SignInCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignInCredentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// What the issuer hands back after a successful email sign-up or sign-in.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IssuedSession {
    /// `None` when the issuer defers the session (e.g. pending email verification).
    #[serde(default)]
    pub token: Option<SessionToken>,
    #[serde(default)]
    pub user: Option<UserInfo>,
}

/// Where to send the browser to start an OAuth flow.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SocialRedirect {
    pub url: String,
    #[serde(default = "default_redirect")]
    pub redirect: bool,
}

fn default_redirect() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IssuerError {
    #[error("Unable to reach the authentication service")]
    Transport(String),
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("No active session")]
    NoActiveSession,
    #[error("Unexpected response from the authentication service")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for IssuerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// The external component that authenticates and mints sessions.
#[async_trait]
pub trait SessionIssuer: Send + Sync {
    async fn sign_up_email(
        &self,
        credentials: &SignUpCredentials,
    ) -> Result<IssuedSession, IssuerError>;

    async fn sign_in_email(
        &self,
        credentials: &SignInCredentials,
    ) -> Result<IssuedSession, IssuerError>;

    /// Start an OAuth flow; the issuer answers with the provider's authorization URL.
    async fn sign_in_social(
        &self,
        provider: OAuthProvider,
        callback_url: &str,
    ) -> Result<SocialRedirect, IssuerError>;

    /// End the session identified by `session`, if any.
    ///
    /// Returns [`IssuerError::NoActiveSession`] when there is nothing to end.
    async fn sign_out(&self, session: Option<&SessionToken>) -> Result<(), IssuerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_hides_password() {
        let credentials = SignUpCredentials {
            name: "Ann".to_string(),
            email: "a@example.com".to_string(),
            password: "secret123".to_string(),
        };
        let debug = format!("{credentials:?}");
        assert!(debug.contains("a@example.com"));
        assert!(!debug.contains("secret123"));
    }

    #[test]
    fn issued_session_tolerates_null_token() {
        let session: IssuedSession = serde_json::from_value(serde_json::json!({
            "token": null,
            "user": {"id": "u1", "email": "a@example.com", "name": "Ann"}
        }))
        .unwrap();
        assert!(session.token.is_none());
        assert_eq!(session.user.unwrap().display_name(), "Ann");
    }

    #[test]
    fn rejected_error_displays_issuer_message() {
        let err = IssuerError::Rejected {
            status: 422,
            message: "User already exists".to_string(),
        };
        assert_eq!(err.to_string(), "User already exists");
    }
}

//! HTTP binding for a better-auth compatible Session Issuer.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, instrument};

use super::{
    IssuedSession, IssuerError, SessionIssuer, SignInCredentials, SignUpCredentials,
    SocialRedirect,
};
use crate::config::Settings;
use crate::providers::OAuthProvider;
use crate::session::SessionToken;
use crate::{APP_USER_AGENT, DEFAULT_BASE_PATH};

/// Error body returned by the issuer on 4xx/5xx.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Serialize)]
struct SocialSignIn<'a> {
    provider: OAuthProvider,
    #[serde(rename = "callbackURL")]
    callback_url: &'a str,
}

/// Talks to the issuer's `/api/auth/*` routes.
#[derive(Debug, Clone)]
pub struct HttpSessionIssuer {
    client: Client,
    base: String,
}

impl HttpSessionIssuer {
    /// `issuer_url` is the service root; routes live under `base_path`.
    pub fn new(issuer_url: &str, base_path: &str) -> Self {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base: format!("{}{}", issuer_url.trim_end_matches('/'), base_path),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.issuer_url.as_str(), &settings.base_path)
    }

    fn post(&self, route: &str) -> RequestBuilder {
        self.client.post(format!("{}{}", self.base, route))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, IssuerError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body: ErrorBody = response.json().await.unwrap_or_default();
        let message = body
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });

        error!(status = status.as_u16(), code = ?body.code, "issuer rejected request: {}", message);

        Err(IssuerError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

impl Default for HttpSessionIssuer {
    fn default() -> Self {
        Self::new("http://localhost:3001", DEFAULT_BASE_PATH)
    }
}

#[async_trait]
impl SessionIssuer for HttpSessionIssuer {
    #[instrument(skip(self))]
    async fn sign_up_email(
        &self,
        credentials: &SignUpCredentials,
    ) -> Result<IssuedSession, IssuerError> {
        self.send(self.post("/sign-up/email").json(credentials)).await
    }

    #[instrument(skip(self))]
    async fn sign_in_email(
        &self,
        credentials: &SignInCredentials,
    ) -> Result<IssuedSession, IssuerError> {
        self.send(self.post("/sign-in/email").json(credentials)).await
    }

    #[instrument(skip(self))]
    async fn sign_in_social(
        &self,
        provider: OAuthProvider,
        callback_url: &str,
    ) -> Result<SocialRedirect, IssuerError> {
        let body = SocialSignIn {
            provider,
            callback_url,
        };
        self.send(self.post("/sign-in/social").json(&body)).await
    }

    #[instrument(skip(self, session))]
    async fn sign_out(&self, session: Option<&SessionToken>) -> Result<(), IssuerError> {
        let Some(session) = session else {
            debug!("no session token to sign out");
            return Err(IssuerError::NoActiveSession);
        };

        let request = self
            .post("/sign-out")
            .bearer_auth(session.as_str())
            .json(&json!({}));

        match self.send::<serde_json::Value>(request).await {
            Ok(_) => Ok(()),
            Err(IssuerError::Rejected { status, .. })
                if status == StatusCode::UNAUTHORIZED.as_u16() =>
            {
                Err(IssuerError::NoActiveSession)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn issuer(server: &MockServer) -> HttpSessionIssuer {
        HttpSessionIssuer::new(&server.uri(), DEFAULT_BASE_PATH)
    }

    fn sign_up() -> SignUpCredentials {
        SignUpCredentials {
            name: "Ann".to_string(),
            email: "a@example.com".to_string(),
            password: "secret123".to_string(),
        }
    }

    #[tokio::test]
    async fn sign_up_returns_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/sign-up/email"))
            .and(body_json(json!({
                "name": "Ann",
                "email": "a@example.com",
                "password": "secret123"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "tok-1",
                "user": {"id": "u1", "email": "a@example.com", "name": "Ann"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = issuer(&server).sign_up_email(&sign_up()).await.unwrap();
        assert_eq!(session.token, Some(SessionToken::new("tok-1")));
        assert_eq!(session.user.unwrap().id, "u1");
    }

    #[tokio::test]
    async fn rejection_carries_issuer_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/sign-in/email"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "code": "INVALID_EMAIL_OR_PASSWORD",
                "message": "Invalid email or password"
            })))
            .mount(&server)
            .await;

        let credentials = SignInCredentials {
            email: "a@example.com".to_string(),
            password: "wrong".to_string(),
        };
        let err = issuer(&server).sign_in_email(&credentials).await.unwrap_err();
        assert_eq!(
            err,
            IssuerError::Rejected {
                status: 401,
                message: "Invalid email or password".to_string()
            }
        );
    }

    #[tokio::test]
    async fn rejection_without_body_uses_status_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/sign-up/email"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = issuer(&server).sign_up_email(&sign_up()).await.unwrap_err();
        assert_eq!(err.to_string(), "Service Unavailable");
    }

    #[tokio::test]
    async fn social_sign_in_returns_provider_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/sign-in/social"))
            .and(body_json(json!({
                "provider": "github",
                "callbackURL": "http://localhost:3000/"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "url": "https://github.com/login/oauth/authorize?client_id=id",
                "redirect": true
            })))
            .mount(&server)
            .await;

        let redirect = issuer(&server)
            .sign_in_social(OAuthProvider::Github, "http://localhost:3000/")
            .await
            .unwrap();
        assert!(redirect.redirect);
        assert!(redirect.url.starts_with("https://github.com/login/oauth/authorize"));
    }

    #[tokio::test]
    async fn sign_out_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/sign-out"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let token = SessionToken::new("tok-1");
        issuer(&server).sign_out(Some(&token)).await.unwrap();
    }

    #[tokio::test]
    async fn sign_out_unauthorized_means_no_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/sign-out"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let token = SessionToken::new("stale");
        let err = issuer(&server).sign_out(Some(&token)).await.unwrap_err();
        assert_eq!(err, IssuerError::NoActiveSession);

        let err = issuer(&server).sign_out(None).await.unwrap_err();
        assert_eq!(err, IssuerError::NoActiveSession);
    }

    #[tokio::test]
    async fn unreachable_issuer_is_a_transport_error() {
        let issuer = HttpSessionIssuer::new("http://127.0.0.1:9", DEFAULT_BASE_PATH);
        let err = issuer.sign_up_email(&sign_up()).await.unwrap_err();
        assert!(matches!(err, IssuerError::Transport(_)));
    }
}

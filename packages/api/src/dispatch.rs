//! # Credential dispatch
//!
//! [`CredentialDispatcher::submit`] is the single entry point for sign-up, sign-in and
//! sign-out. It validates an [`AuthRequest`] locally, checks OAuth providers against
//! the [`ProviderRegistry`], then hands the request to the [`SessionIssuer`]. Every
//! outcome comes back as an [`AuthResult`]; nothing here returns an error to the caller.
//!
//! Errors fall into three groups:
//!
//! - **validation**: missing or malformed fields, reported per field in
//!   [`AuthResult::field_errors`] without contacting anything remote;
//! - **configuration**: an OAuth provider that is not enabled, reported as a
//!   top-level [`AuthResult::error`];
//! - **remote**: issuer failures, reported as a top-level error message.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};
use url::Url;

use crate::config::Settings;
use crate::issuer::{IssuerError, SessionIssuer, SignInCredentials, SignUpCredentials};
use crate::models::UserInfo;
use crate::providers::{OAuthProvider, ProviderKind, ProviderRegistry};
use crate::session::SessionToken;

/// Form field names understood by the dispatcher.
pub mod fields {
    pub const NAME: &str = "name";
    pub const EMAIL: &str = "email";
    pub const PASSWORD: &str = "password";
    pub const CALLBACK_URL: &str = "callbackURL";
}

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthKind {
    Signup,
    Signin,
    Signout,
}

/// One user submission. Consumed by [`CredentialDispatcher::submit`].
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    pub kind: AuthKind,
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    /// Current session, used by sign-out. Never read from or written to the wire.
    #[serde(skip)]
    pub session: Option<SessionToken>,
}

impl AuthRequest {
    pub fn new(kind: AuthKind) -> Self {
        Self {
            kind,
            provider: ProviderKind::EmailPassword,
            fields: BTreeMap::new(),
            session: None,
        }
    }

    pub fn sign_up(name: &str, email: &str, password: &str) -> Self {
        Self::new(AuthKind::Signup)
            .field(fields::NAME, name)
            .field(fields::EMAIL, email)
            .field(fields::PASSWORD, password)
    }

    pub fn sign_in(email: &str, password: &str) -> Self {
        Self::new(AuthKind::Signin)
            .field(fields::EMAIL, email)
            .field(fields::PASSWORD, password)
    }

    pub fn social(provider: OAuthProvider) -> Self {
        Self::new(AuthKind::Signin).provider(provider.kind())
    }

    pub fn sign_out(session: Option<SessionToken>) -> Self {
        Self {
            session,
            ..Self::new(AuthKind::Signout)
        }
    }

    pub fn provider(mut self, provider: ProviderKind) -> Self {
        self.provider = provider;
        self
    }

    pub fn field(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }

    fn value(&self, name: &str) -> &str {
        self.fields.get(name).map(|v| v.trim()).unwrap_or_default()
    }
}

impl fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthRequest")
            .field("kind", &self.kind)
            .field("provider", &self.provider)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("session", &self.session.is_some())
            .finish()
    }
}

/// Outcome of a submission, ready to render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<BTreeMap<String, String>>,
    /// Provider authorization URL the browser should be sent to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    /// The signed-in user, when the issuer returned one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
    /// Session minted by the issuer; kept server-side only.
    #[serde(skip)]
    pub session: Option<SessionToken>,
}

impl AuthResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn invalid(field_errors: BTreeMap<String, String>) -> Self {
        Self {
            success: false,
            field_errors: Some(field_errors),
            ..Default::default()
        }
    }

    pub fn redirect_to(url: impl Into<String>) -> Self {
        Self {
            redirect: Some(url.into()),
            ..Self::ok()
        }
    }

    pub fn with_user(mut self, user: Option<UserInfo>) -> Self {
        self.user = user;
        self
    }

    pub fn with_session(mut self, session: Option<SessionToken>) -> Self {
        self.session = session;
        self
    }

    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.field_errors
            .as_ref()
            .and_then(|errors| errors.get(field))
            .map(String::as_str)
    }
}

impl From<IssuerError> for AuthResult {
    fn from(e: IssuerError) -> Self {
        Self::failure(e.to_string())
    }
}

enum EmailCredentials {
    SignUp(SignUpCredentials),
    SignIn(SignInCredentials),
}

/// Routes validated requests to the Session Issuer.
#[derive(Clone)]
pub struct CredentialDispatcher {
    registry: Arc<dyn ProviderRegistry>,
    issuer: Arc<dyn SessionIssuer>,
    trusted_origins: Vec<String>,
}

impl CredentialDispatcher {
    /// `trusted_origins` are `scheme://host[:port]` strings; the first one is the
    /// default landing origin after an OAuth flow.
    pub fn new(
        registry: Arc<dyn ProviderRegistry>,
        issuer: Arc<dyn SessionIssuer>,
        trusted_origins: Vec<String>,
    ) -> Self {
        Self {
            registry,
            issuer,
            trusted_origins,
        }
    }

    pub fn from_settings(settings: Arc<Settings>, issuer: Arc<dyn SessionIssuer>) -> Self {
        let trusted_origins = settings.trusted_origins.clone();
        Self::new(settings, issuer, trusted_origins)
    }

    #[instrument(skip(self), fields(kind = ?request.kind, provider = %request.provider))]
    pub async fn submit(&self, request: AuthRequest) -> AuthResult {
        match (request.kind, request.provider.oauth()) {
            (AuthKind::Signout, _) => self.sign_out(request.session.as_ref()).await,
            (_, Some(provider)) => self.social(provider, &request).await,
            (_, None) => self.email_password(&request).await,
        }
    }

    async fn email_password(&self, request: &AuthRequest) -> AuthResult {
        let credentials = match validate_email_password(request) {
            Ok(credentials) => credentials,
            Err(field_errors) => {
                debug!(fields = ?field_errors.keys().collect::<Vec<_>>(), "validation failed");
                return AuthResult::invalid(field_errors);
            }
        };

        let issued = match &credentials {
            EmailCredentials::SignUp(credentials) => self.issuer.sign_up_email(credentials).await,
            EmailCredentials::SignIn(credentials) => self.issuer.sign_in_email(credentials).await,
        };

        match issued {
            Ok(session) => AuthResult::ok()
                .with_user(session.user)
                .with_session(session.token),
            Err(e) => {
                error!("Session issuer failed: {}", e);
                e.into()
            }
        }
    }

    async fn social(&self, provider: OAuthProvider, request: &AuthRequest) -> AuthResult {
        let enabled = self.registry.enabled_providers().await;
        if !enabled.is_enabled(provider.kind()) {
            warn!(%provider, "sign-in requested for a disabled provider");
            return AuthResult::failure(format!(
                "{} sign-in is not enabled",
                provider.display_name()
            ));
        }

        let callback_url = match request.value(fields::CALLBACK_URL) {
            "" => self.default_callback_url(),
            url if self.is_trusted(url) => url.to_string(),
            _ => {
                let mut errors = BTreeMap::new();
                errors.insert(
                    fields::CALLBACK_URL.to_string(),
                    "Callback URL must belong to a trusted origin".to_string(),
                );
                return AuthResult::invalid(errors);
            }
        };

        match self.issuer.sign_in_social(provider, &callback_url).await {
            Ok(redirect) if redirect.redirect => AuthResult::redirect_to(redirect.url),
            Ok(_) => {
                debug!(%provider, "issuer completed sign-in without a redirect");
                AuthResult::ok()
            }
            Err(e) => {
                error!(%provider, "Error signing in: {}", e);
                e.into()
            }
        }
    }

    async fn sign_out(&self, session: Option<&SessionToken>) -> AuthResult {
        match self.issuer.sign_out(session).await {
            Ok(()) | Err(IssuerError::NoActiveSession) => AuthResult::ok(),
            Err(e) => {
                error!("Sign-out failed: {}", e);
                e.into()
            }
        }
    }

    fn default_callback_url(&self) -> String {
        match self.trusted_origins.first() {
            Some(origin) => format!("{origin}/"),
            None => "/".to_string(),
        }
    }

    /// Relative paths stay on the front-end's origin; absolute URLs must match a
    /// trusted origin exactly.
    fn is_trusted(&self, url: &str) -> bool {
        if url.starts_with('/') {
            return !url.starts_with("//") && !url.starts_with("/\\");
        }
        match Url::parse(url) {
            Ok(url) => {
                let origin = url.origin().ascii_serialization();
                self.trusted_origins.iter().any(|trusted| *trusted == origin)
            }
            Err(_) => false,
        }
    }
}

fn validate_email_password(
    request: &AuthRequest,
) -> Result<EmailCredentials, BTreeMap<String, String>> {
    let mut errors = BTreeMap::new();
    let signing_up = request.kind == AuthKind::Signup;

    let name = request.value(fields::NAME);
    if signing_up && name.is_empty() {
        errors.insert(fields::NAME.to_string(), "Name is required".to_string());
    }

    let email = request.value(fields::EMAIL).to_lowercase();
    if email.is_empty() {
        errors.insert(fields::EMAIL.to_string(), "Email is required".to_string());
    } else if !valid_email(&email) {
        errors.insert(fields::EMAIL.to_string(), "Invalid email address".to_string());
    }

    // Passwords are taken verbatim; only the emptiness check ignores whitespace.
    let password = request
        .fields
        .get(fields::PASSWORD)
        .cloned()
        .unwrap_or_default();
    if password.trim().is_empty() {
        errors.insert(fields::PASSWORD.to_string(), "Password is required".to_string());
    } else if signing_up && password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.insert(
            fields::PASSWORD.to_string(),
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
        );
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(if signing_up {
        EmailCredentials::SignUp(SignUpCredentials {
            name: name.to_string(),
            email,
            password,
        })
    } else {
        EmailCredentials::SignIn(SignInCredentials { email, password })
    })
}

fn valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

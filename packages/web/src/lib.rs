//! HTTP gateway: the providers endpoint and the sign-up / sign-in / sign-out form actions.

mod handlers;

use std::sync::Arc;
use std::time::Duration;

use auth_api::{CredentialDispatcher, ProviderRegistry, SessionIssuer, Settings};
use axum::routing::{get, post};
use axum::Router;
use tower_sessions::cookie::time;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<dyn ProviderRegistry>,
    pub dispatcher: Arc<CredentialDispatcher>,
}

impl AppState {
    pub fn new(registry: Arc<dyn ProviderRegistry>, dispatcher: Arc<CredentialDispatcher>) -> Self {
        Self {
            registry,
            dispatcher,
        }
    }

    pub fn from_settings(settings: Arc<Settings>, issuer: Arc<dyn SessionIssuer>) -> Self {
        let dispatcher = CredentialDispatcher::from_settings(settings.clone(), issuer);
        Self::new(settings, Arc::new(dispatcher))
    }
}

/// Routes without the session layer.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/providers", get(handlers::providers))
        .route("/actions/sign-up", post(handlers::sign_up))
        .route("/actions/sign-in", post(handlers::sign_in))
        .route("/actions/sign-out", post(handlers::sign_out))
        .route("/health", get(handlers::health))
        .with_state(state)
}

pub fn session_layer(lifetime: Duration, secure: bool) -> SessionManagerLayer<MemoryStore> {
    let seconds = i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX);
    SessionManagerLayer::new(MemoryStore::default())
        .with_secure(secure)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::seconds(seconds)))
}

/// The full application: routes plus a cookie session living as long as the issuer's sessions.
pub fn app(settings: Arc<Settings>, issuer: Arc<dyn SessionIssuer>) -> Router {
    let secure = settings
        .trusted_origins
        .first()
        .is_some_and(|origin| origin.starts_with("https://"));
    let layer = session_layer(settings.session_lifetime, secure);
    router(AppState::from_settings(settings, issuer)).layer(layer)
}

use std::collections::BTreeMap;

use auth_api::{
    AuthKind, AuthRequest, AuthResult, EnabledProviders, ProviderKind, SessionToken,
    SESSION_TOKEN_KEY,
};
use axum::extract::State;
use axum::{Form, Json};
use serde_json::{json, Value};
use tower_sessions::Session;
use tracing::{debug, error, warn};

use crate::AppState;

pub async fn providers(State(state): State<AppState>) -> Json<EnabledProviders> {
    Json(state.registry.enabled_providers().await)
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn sign_up(
    State(state): State<AppState>,
    session: Session,
    Form(fields): Form<BTreeMap<String, String>>,
) -> Json<AuthResult> {
    Json(submit(&state, &session, AuthKind::Signup, fields).await)
}

pub async fn sign_in(
    State(state): State<AppState>,
    session: Session,
    Form(fields): Form<BTreeMap<String, String>>,
) -> Json<AuthResult> {
    Json(submit(&state, &session, AuthKind::Signin, fields).await)
}

pub async fn sign_out(State(state): State<AppState>, session: Session) -> Json<AuthResult> {
    let token = match session.get::<SessionToken>(SESSION_TOKEN_KEY).await {
        Ok(token) => token,
        Err(e) => {
            warn!("Failed to read session: {}", e);
            None
        }
    };

    let result = state.dispatcher.submit(AuthRequest::sign_out(token)).await;
    if result.success {
        if let Err(e) = session.flush().await {
            error!("Failed to clear session: {}", e);
            return Json(AuthResult::failure("Failed to clear session"));
        }
    }
    Json(result)
}

/// Run one form action. A `provider` field selects the OAuth path.
async fn submit(
    state: &AppState,
    session: &Session,
    kind: AuthKind,
    mut fields: BTreeMap<String, String>,
) -> AuthResult {
    let provider = match fields.remove("provider") {
        None => ProviderKind::EmailPassword,
        Some(name) => match ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name.trim())
        {
            Some(provider) => provider,
            None => {
                debug!(provider = %name, "unknown provider in form action");
                return AuthResult::failure(format!("Unknown provider: {name}"));
            }
        },
    };

    let mut request = AuthRequest::new(kind).provider(provider);
    request.fields = fields;

    let result = state.dispatcher.submit(request).await;
    if let Some(token) = &result.session {
        // New credentials get a new session id.
        if let Err(e) = session.cycle_id().await {
            error!("Failed to rotate session id: {}", e);
            return AuthResult::failure("Failed to store session");
        }
        if let Err(e) = session.insert(SESSION_TOKEN_KEY, token).await {
            error!("Failed to set session: {}", e);
            return AuthResult::failure("Failed to store session");
        }
    }
    result
}

//! # API crate: provider negotiation and credential dispatch
//!
//! This crate sits between a front-end's sign-up / sign-in forms and an external
//! Session Issuer (a better-auth compatible service mounted under `/api/auth`).
//! It never hashes passwords or exchanges OAuth codes itself; it decides *which*
//! methods are available and *where* each request goes.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | [`Settings`] built once at startup from defaults, `auth.toml` and the environment |
//! | [`providers`] | Provider kinds, per-provider OAuth configuration, the [`ProviderRegistry`] trait and its remote (HTTP) implementation |
//! | [`issuer`] | The [`SessionIssuer`] seam and its HTTP binding against the external service |
//! | [`dispatch`] | [`CredentialDispatcher`]: validates [`AuthRequest`]s and turns every outcome into an [`AuthResult`] |
//! | [`session`] | The opaque [`SessionToken`] and the cookie-session key it is stored under |
//! | [`models`] | Client-safe user projection returned by the issuer |

pub mod config;
pub mod dispatch;
pub mod issuer;
pub mod models;
pub mod providers;
pub mod session;

pub use config::{Settings, SettingsError};
pub use dispatch::{AuthKind, AuthRequest, AuthResult, CredentialDispatcher};
pub use issuer::{HttpSessionIssuer, IssuedSession, IssuerError, SessionIssuer, SocialRedirect};
pub use models::UserInfo;
pub use providers::{
    ClientOptions, EnabledProviders, OAuthProvider, ProviderConfig, ProviderKind,
    ProviderRegistry, RemoteProviders,
};
pub use session::{SessionToken, SESSION_TOKEN_KEY};

/// User agent sent on every outgoing request.
pub(crate) static APP_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Path prefix the Session Issuer mounts its routes under.
pub const DEFAULT_BASE_PATH: &str = "/api/auth";

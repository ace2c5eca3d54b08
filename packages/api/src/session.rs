//! Session token handling.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Key for storing the issuer's session token in the cookie session.
pub const SESSION_TOKEN_KEY: &str = "session_token";

/// Opaque session token minted by the Session Issuer.
///
/// The gateway only stores and forwards it; `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([redacted])")
    }
}

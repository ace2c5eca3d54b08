//! # User projection returned by the Session Issuer
//!
//! The issuer answers sign-up and sign-in calls with the user record it created or
//! found. Only the client-safe subset is decoded here: [`UserInfo`] never carries a
//! password hash or timestamps, so it can be handed straight to a front-end.

use serde::{Deserialize, Serialize};

/// User information safe to send to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl UserInfo {
    /// Get display name, falling back to email if name is not set.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

//! Claims carried by a portal session token.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

/// Claims encoded into a session token.
///
/// Identity fields are optional at this layer on purpose: the signing layer does not
/// mandate them, so their presence is checked once by the `Authenticator` when it
/// builds a `Principal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    /// Seconds since the Unix epoch.
    #[serde(rename = "iat", default)]
    pub issued_at: i64,
    /// Seconds since the Unix epoch.
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

impl SessionClaims {
    /// Claims for a tenant user, valid from now for `ttl`.
    pub fn new(tenant_id: impl Into<String>, user_id: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            tenant_id: Some(tenant_id.into()),
            user_id: Some(user_id.into()),
            role: None,
            permissions: None,
            issued_at: now.timestamp(),
            expires_at: (now + ttl).timestamp(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = Some(permissions.into_iter().map(Into::into).collect());
        self
    }
}

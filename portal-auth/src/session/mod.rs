//! Stateless session authentication for portal users.

mod authenticator;
mod claims;
mod codec;

pub use authenticator::{Authenticator, DEFAULT_SESSION_COOKIE};
pub use claims::SessionClaims;
pub use codec::TokenCodec;

use std::collections::BTreeSet;

use serde::Serialize;

/// Role assigned when a token does not name one.
pub const DEFAULT_ROLE: &str = "client";

/// The authenticated identity behind a request.
///
/// Only the `Authenticator` constructs a `Principal`, and only from a token that passed
/// signature and expiry checks. It cannot be modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    tenant_id: String,
    user_id: String,
    role: String,
    permissions: BTreeSet<String>,
}

impl Principal {
    pub(crate) fn new(
        tenant_id: String,
        user_id: String,
        role: Option<String>,
        permissions: Vec<String>,
    ) -> Self {
        Self {
            tenant_id,
            user_id,
            role: role
                .filter(|role| !role.is_empty())
                .unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            permissions: permissions.into_iter().collect(),
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.permissions
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

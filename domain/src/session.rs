//! Session authentication and issuance built from the process configuration.

use chrono::Duration;
use http::HeaderMap;
use log::*;
use portal_auth::session::{Authenticator, SessionClaims, TokenCodec};
use service::config::Config;

use crate::error::{DomainErrorKind, Error};
use crate::Principal;

/// Verifies inbound credentials and signs new session tokens with the configured secret.
#[derive(Debug, Clone)]
pub struct Sessions {
    authenticator: Authenticator,
    ttl: Duration,
    secure_cookie: bool,
}

impl Sessions {
    /// Requires a signing secret; `Config::validated` guarantees one.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let secret = config.session_signing_secret().ok_or_else(|| {
            error!("Session signing secret is missing; cannot authenticate requests");
            Error::config("session signing secret is not configured")
        })?;

        Ok(Self {
            authenticator: Authenticator::new(
                TokenCodec::new(secret),
                config.session_cookie_name(),
            ),
            ttl: Duration::seconds(i64::try_from(config.session_ttl_seconds).unwrap_or(i64::MAX)),
            secure_cookie: config.is_production(),
        })
    }

    /// Resolve the request's `Principal`. The failure reason is logged here and
    /// carried in the error kind, but callers must not echo it to the client.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, Error> {
        self.authenticator.authenticate(headers).map_err(|e| {
            let err = Error::from(e);
            if let DomainErrorKind::Credential(kind) = &err.error_kind {
                warn!("Rejected request credentials: {kind:?}");
            }
            err
        })
    }

    /// Sign a session token for the login collaborator.
    pub fn issue(
        &self,
        tenant_id: &str,
        user_id: &str,
        role: Option<&str>,
        permissions: &[String],
    ) -> Result<String, Error> {
        let mut claims = SessionClaims::new(tenant_id, user_id, self.ttl)
            .with_permissions(permissions.iter().cloned());
        if let Some(role) = role {
            claims = claims.with_role(role);
        }

        Ok(self.authenticator.codec().sign(&claims)?)
    }

    pub fn cookie_name(&self) -> &str {
        self.authenticator.cookie_name()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether the session cookie carries the `Secure` attribute.
    pub fn secure_cookie(&self) -> bool {
        self.secure_cookie
    }
}

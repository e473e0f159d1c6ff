//! Linked third-party accounts and the storage contract behind them.

mod encryption;
mod memory;

pub use encryption::TokenCipher;
pub use memory::InMemoryStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;

use crate::error::Error;

/// A tenant user's connection to an external provider account.
///
/// At most one row exists per `(tenant_id, user_id)`. Disconnecting only flips
/// `is_active`; rows are never removed.
#[derive(Debug, Clone)]
pub struct LinkedAccount {
    pub tenant_id: String,
    pub user_id: String,
    pub external_email: String,
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub expires_at: DateTime<Utc>,
    pub connected_at: DateTime<Utc>,
    pub disconnected_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl LinkedAccount {
    /// Whether the stored access token has expired as of `now`.
    ///
    /// Nothing in this crate refreshes tokens; consumers use this to decide when to.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Fields written by a successful OAuth callback.
#[derive(Debug, Clone)]
pub struct LinkedAccountUpsert {
    pub external_email: String,
    pub access_token: SecretString,
    /// `None` keeps whatever refresh token is already stored.
    pub refresh_token: Option<SecretString>,
    pub expires_at: DateTime<Utc>,
    pub connected_at: DateTime<Utc>,
}

/// Persistence contract for linked accounts.
///
/// Implementations must make `upsert` atomic per `(tenant_id, user_id)`: concurrent
/// callbacks for the same user resolve as last writer wins, and the refresh token is
/// coalesced rather than overwritten with nothing.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Insert or reactivate the account for a tenant user.
    ///
    /// Sets the access token, email and expiry, keeps the previous refresh token when
    /// `update.refresh_token` is `None`, clears `disconnected_at` and forces
    /// `is_active = true`.
    async fn upsert(
        &self,
        tenant_id: &str,
        user_id: &str,
        update: LinkedAccountUpsert,
    ) -> Result<LinkedAccount, Error>;

    /// The active account for a tenant user, if any.
    async fn fetch_active(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<Option<LinkedAccount>, Error>;

    /// Mark the active account inactive. Succeeds without change when there is none.
    async fn deactivate(
        &self,
        tenant_id: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), Error>;
}

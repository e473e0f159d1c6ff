//! In-process `Storage` used by tests and local tooling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{LinkedAccount, LinkedAccountUpsert, Storage};
use crate::error::Error;

type Key = (String, String);

/// Map-backed storage. The mutex makes each operation atomic per key, matching the
/// database store's `ON CONFLICT` semantics.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    accounts: Mutex<HashMap<Key, LinkedAccount>>,
    writes: AtomicUsize,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mutating calls that changed a row.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// The stored row regardless of its active flag.
    pub async fn get(&self, tenant_id: &str, user_id: &str) -> Option<LinkedAccount> {
        self.accounts
            .lock()
            .await
            .get(&key(tenant_id, user_id))
            .cloned()
    }

    /// Number of rows marked active across all tenants.
    pub async fn active_count(&self) -> usize {
        self.accounts
            .lock()
            .await
            .values()
            .filter(|account| account.is_active)
            .count()
    }
}

fn key(tenant_id: &str, user_id: &str) -> Key {
    (tenant_id.to_string(), user_id.to_string())
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn upsert(
        &self,
        tenant_id: &str,
        user_id: &str,
        update: LinkedAccountUpsert,
    ) -> Result<LinkedAccount, Error> {
        let mut accounts = self.accounts.lock().await;
        let previous_refresh = accounts
            .get(&key(tenant_id, user_id))
            .and_then(|account| account.refresh_token.clone());

        let account = LinkedAccount {
            tenant_id: tenant_id.to_string(),
            user_id: user_id.to_string(),
            external_email: update.external_email,
            access_token: update.access_token,
            refresh_token: update.refresh_token.or(previous_refresh),
            expires_at: update.expires_at,
            connected_at: update.connected_at,
            disconnected_at: None,
            is_active: true,
        };

        accounts.insert(key(tenant_id, user_id), account.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(account)
    }

    async fn fetch_active(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<Option<LinkedAccount>, Error> {
        Ok(self
            .accounts
            .lock()
            .await
            .get(&key(tenant_id, user_id))
            .filter(|account| account.is_active)
            .cloned())
    }

    async fn deactivate(
        &self,
        tenant_id: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), Error> {
        let mut accounts = self.accounts.lock().await;
        if let Some(account) = accounts
            .get_mut(&key(tenant_id, user_id))
            .filter(|account| account.is_active)
        {
            account.is_active = false;
            account.disconnected_at = Some(at);
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

//! Database-backed linked account storage with encryption at rest.
//!
//! Implements `portal_auth::linked_account::Storage` on the `linked_accounts` table.
//! Tokens are encrypted with AES-256-GCM before writing and decrypted on read.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::*;
use sea_orm::DatabaseConnection;

use entity_api::linked_account::{self, LinkedAccountFields};
use portal_auth::error::{Error, ErrorKind, StorageErrorKind};
use portal_auth::linked_account::{LinkedAccount, LinkedAccountUpsert, Storage, TokenCipher};

use crate::linked_accounts::Model;

/// Database-backed storage that encrypts tokens at rest.
#[derive(Clone, Debug)]
pub struct DbLinkedAccountStorage {
    db: Arc<DatabaseConnection>,
    cipher: TokenCipher,
}

impl DbLinkedAccountStorage {
    pub fn new(db: Arc<DatabaseConnection>, cipher: TokenCipher) -> Self {
        Self { db, cipher }
    }

    fn into_linked_account(&self, model: Model) -> Result<LinkedAccount, Error> {
        Ok(LinkedAccount {
            access_token: self.cipher.decrypt(&model.access_token)?,
            refresh_token: self.cipher.decrypt_optional(model.refresh_token.as_deref())?,
            tenant_id: model.tenant_id,
            user_id: model.user_id,
            external_email: model.external_email,
            expires_at: model.expires_at.with_timezone(&Utc),
            connected_at: model.connected_at.with_timezone(&Utc),
            disconnected_at: model.disconnected_at.map(|at| at.with_timezone(&Utc)),
            is_active: model.is_active,
        })
    }
}

fn storage_db_err(err: entity_api::error::Error) -> Error {
    warn!("Linked account query failed: {err}");
    Error {
        source: Some(Box::new(err)),
        error_kind: ErrorKind::Storage(StorageErrorKind::Database),
    }
}

#[async_trait]
impl Storage for DbLinkedAccountStorage {
    async fn upsert(
        &self,
        tenant_id: &str,
        user_id: &str,
        update: LinkedAccountUpsert,
    ) -> Result<LinkedAccount, Error> {
        let fields = LinkedAccountFields {
            access_token: self.cipher.encrypt(&update.access_token)?,
            refresh_token: self.cipher.encrypt_optional(update.refresh_token.as_ref())?,
            external_email: update.external_email,
            expires_at: update.expires_at,
            connected_at: update.connected_at,
        };

        let model = linked_account::upsert(self.db.as_ref(), tenant_id, user_id, fields)
            .await
            .map_err(storage_db_err)?;

        self.into_linked_account(model)
    }

    async fn fetch_active(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<Option<LinkedAccount>, Error> {
        linked_account::find_active(self.db.as_ref(), tenant_id, user_id)
            .await
            .map_err(storage_db_err)?
            .map(|model| self.into_linked_account(model))
            .transpose()
    }

    async fn deactivate(
        &self,
        tenant_id: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), Error> {
        linked_account::deactivate(self.db.as_ref(), tenant_id, user_id, at)
            .await
            .map_err(storage_db_err)?;
        Ok(())
    }
}

//! Google Business Profile account linking for a tenant user.
//!
//! `AccountLinking` is assembled once from `Config` at startup and shared by the
//! request handlers.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use log::*;
use sea_orm::DatabaseConnection;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sha2::{Digest, Sha256};

use portal_auth::http::HttpClientConfig;
use portal_auth::linked_account::{Storage, TokenCipher};
use portal_auth::oauth::providers::GoogleProvider;
use portal_auth::oauth::{
    AuthorizationRequestBuilder, CallbackError, CallbackErrorKind, CallbackOutcome,
    CallbackParams, CallbackProcessor, CallbackStage, OAuthConfig, Provider, StateCodec,
};
use service::config::Config;
use url::Url;

use crate::error::Error;
use crate::linked_account_store::DbLinkedAccountStorage;
use crate::Principal;

/// Domain separation for the state key derived from the session signing secret.
const STATE_KEY_CONTEXT: &[u8] = b"clinic-portal/oauth-state-key";

/// Connection summary returned to the settings page. Never carries tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<DateTime<Utc>>,
}

impl LinkStatus {
    fn disconnected() -> Self {
        Self {
            connected: false,
            external_email: None,
            expires_at: None,
            connected_at: None,
        }
    }
}

#[derive(Clone)]
pub struct AccountLinking {
    authorization: AuthorizationRequestBuilder,
    // None when the Google client is not configured; callbacks then fail closed.
    callbacks: Option<CallbackProcessor>,
    store: Arc<dyn Storage>,
    frontend_url: Url,
}

impl AccountLinking {
    /// Wire the linking flow against the database.
    pub fn from_config(config: &Config, db: Arc<DatabaseConnection>) -> Result<Self, Error> {
        let key = config.token_encryption_key().ok_or_else(|| {
            error!("Token encryption key is missing; cannot store provider tokens");
            Error::config("token encryption key is not configured")
        })?;
        let store = DbLinkedAccountStorage::new(db, TokenCipher::from_hex(key)?);

        Self::with_store(config, Arc::new(store))
    }

    /// Wire the linking flow against any `Storage` using the Google provider.
    pub fn with_store(config: &Config, store: Arc<dyn Storage>) -> Result<Self, Error> {
        let oauth_config = oauth_config(config);
        let http = HttpClientConfig {
            timeout: StdDuration::from_secs(config.oauth_http_timeout_secs),
            max_retries: config.oauth_http_max_retries,
            ..HttpClientConfig::default()
        };

        let provider: Option<Arc<dyn Provider>> = match GoogleProvider::new(&oauth_config, http) {
            Ok(provider) => Some(Arc::new(provider)),
            Err(e) => {
                warn!("Google provider unavailable: {e}");
                None
            }
        };

        Self::with_provider(config, oauth_config, provider, store)
    }

    fn with_provider(
        config: &Config,
        oauth_config: OAuthConfig,
        provider: Option<Arc<dyn Provider>>,
        store: Arc<dyn Storage>,
    ) -> Result<Self, Error> {
        let secret = config.session_signing_secret().ok_or_else(|| {
            error!("Session signing secret is missing; cannot sign OAuth state");
            Error::config("session signing secret is not configured")
        })?;
        let states = StateCodec::with_ttl(
            &state_key(secret),
            Duration::seconds(config.oauth_state_ttl_seconds),
        )?;
        let frontend = config.frontend_integrations_url();
        let frontend_url = Url::parse(&frontend).map_err(|e| {
            error!("Invalid front-end integrations URL {frontend}: {e:?}");
            Error::config("front-end integrations URL is invalid")
        })?;

        let callbacks = provider
            .map(|provider| {
                CallbackProcessor::new(provider, store.clone(), states.clone(), &frontend)
            })
            .transpose()?;

        Ok(Self {
            authorization: AuthorizationRequestBuilder::new(oauth_config, states),
            callbacks,
            store,
            frontend_url,
        })
    }

    /// URL that starts the consent flow for the signed-in user.
    pub fn authorization_url(&self, principal: &Principal) -> Result<String, Error> {
        Ok(self.authorization.build(principal)?)
    }

    /// Complete the provider redirect. Always yields the front-end URL to redirect to.
    pub async fn process_callback(&self, params: CallbackParams) -> String {
        match &self.callbacks {
            Some(processor) => processor.process_to_redirect(params).await.into(),
            None => {
                error!("OAuth callback received but the Google client is not configured");
                CallbackOutcome::Failed(CallbackError::new(
                    CallbackStage::Start,
                    CallbackErrorKind::Internal,
                ))
                .redirect_url(&self.frontend_url)
                .into()
            }
        }
    }

    /// Soft-disconnect the user's linked account. Repeated calls succeed.
    pub async fn disconnect(&self, principal: &Principal) -> Result<(), Error> {
        self.store
            .deactivate(principal.tenant_id(), principal.user_id(), Utc::now())
            .await?;
        info!(
            "Disconnected Google account for tenant {} user {}",
            principal.tenant_id(),
            principal.user_id()
        );
        Ok(())
    }

    pub async fn status(&self, principal: &Principal) -> Result<LinkStatus, Error> {
        let account = self
            .store
            .fetch_active(principal.tenant_id(), principal.user_id())
            .await?;

        Ok(account.map_or_else(LinkStatus::disconnected, |account| LinkStatus {
            connected: true,
            external_email: Some(account.external_email),
            expires_at: Some(account.expires_at),
            connected_at: Some(account.connected_at),
        }))
    }
}

fn oauth_config(config: &Config) -> OAuthConfig {
    let mut oauth = OAuthConfig::google(config.public_base_url());
    oauth.client_id = config.google_client_id();
    oauth.client_secret = config.google_client_secret();
    oauth.redirect_uri = config.google_redirect_uri();
    oauth.authorization_endpoint = config.google_auth_url().to_string();
    oauth.token_endpoint = config.google_token_url().to_string();
    oauth.userinfo_endpoint = config.google_userinfo_url().to_string();
    oauth
}

/// Key for OAuth state MACs, derived so it never equals the session signing key.
fn state_key(secret: &SecretString) -> SecretString {
    let mut hasher = Sha256::new();
    hasher.update(STATE_KEY_CONTEXT);
    hasher.update(secret.expose_secret().as_bytes());
    SecretString::new(hex::encode(hasher.finalize()))
}

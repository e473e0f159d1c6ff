//! The OAuth redirect handler.
//!
//! A callback walks `Start -> StateValidated -> CodeExchanged -> IdentityFetched ->
//! Persisted -> Done`. Each stage is a function returning `Result`, so the first
//! failure names the stage it happened in and ends the pipeline. The linked account
//! upsert is the only write and runs after every earlier stage has succeeded.

use std::fmt;
use std::sync::Arc;

use chrono::{Duration, Utc};
use log::*;
use serde::Deserialize;
use url::Url;

use super::state::OAuthState;
use super::{Provider, StateCodec, TokenGrant, UserInfo};
use crate::error::{config_error, ConfigErrorKind, Error};
use crate::linked_account::{LinkedAccount, LinkedAccountUpsert, Storage};

/// Upper bound applied to a provider supplied `expires_in`.
const MAX_EXPIRES_IN_SECS: i64 = 365 * 24 * 60 * 60;

/// Query parameters of a provider redirect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Pipeline stages. A failure records the last stage that was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackStage {
    Start,
    StateValidated,
    CodeExchanged,
    IdentityFetched,
    Persisted,
    Done,
}

/// Why a callback failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackErrorKind {
    /// The user declined consent at the provider.
    AccessDenied,
    /// `code` or `state` was missing.
    InvalidRequest,
    /// `state` did not decode, verify or was stale.
    InvalidState,
    /// The code exchange or the identity lookup failed.
    TokenExchangeFailed,
    /// Storage or another unexpected failure.
    Internal,
}

impl CallbackErrorKind {
    /// Value of the `error` query parameter sent back to the front end.
    ///
    /// A bad state is reported as `invalid_request`: the browser-facing markers are a
    /// fixed set and the distinction is not actionable by the user.
    pub fn marker(&self) -> &'static str {
        match self {
            CallbackErrorKind::AccessDenied => "access_denied",
            CallbackErrorKind::InvalidRequest | CallbackErrorKind::InvalidState => {
                "invalid_request"
            }
            CallbackErrorKind::TokenExchangeFailed => "token_exchange_failed",
            CallbackErrorKind::Internal => "internal_error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackError {
    pub stage: CallbackStage,
    pub kind: CallbackErrorKind,
}

impl CallbackError {
    pub fn new(stage: CallbackStage, kind: CallbackErrorKind) -> Self {
        Self { stage, kind }
    }
}

impl fmt::Display for CallbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} at stage {:?}", self.kind, self.stage)
    }
}

/// Terminal result of a callback.
#[derive(Debug, Clone)]
pub enum CallbackOutcome {
    Connected(LinkedAccount),
    Failed(CallbackError),
}

impl CallbackOutcome {
    pub fn is_connected(&self) -> bool {
        matches!(self, CallbackOutcome::Connected(_))
    }

    pub fn error_kind(&self) -> Option<CallbackErrorKind> {
        match self {
            CallbackOutcome::Connected(_) => None,
            CallbackOutcome::Failed(error) => Some(error.kind),
        }
    }

    /// The front-end URL with `success=connected` or `error=<marker>` appended.
    pub fn redirect_url(&self, frontend: &Url) -> Url {
        let mut url = frontend.clone();
        match self {
            CallbackOutcome::Connected(_) => {
                url.query_pairs_mut().append_pair("success", "connected");
            }
            CallbackOutcome::Failed(error) => {
                url.query_pairs_mut().append_pair("error", error.kind.marker());
            }
        }
        url
    }
}

/// Runs provider callbacks against a provider and a linked account store.
#[derive(Clone)]
pub struct CallbackProcessor {
    provider: Arc<dyn Provider>,
    store: Arc<dyn Storage>,
    states: StateCodec,
    frontend_url: Url,
}

impl CallbackProcessor {
    /// `frontend_url` is the page the browser lands on after the callback, whatever
    /// the outcome.
    pub fn new(
        provider: Arc<dyn Provider>,
        store: Arc<dyn Storage>,
        states: StateCodec,
        frontend_url: &str,
    ) -> Result<Self, Error> {
        let frontend_url = Url::parse(frontend_url).map_err(|e| {
            error!("Invalid front-end redirect URL {}: {:?}", frontend_url, e);
            config_error(ConfigErrorKind::InvalidUrl, "invalid front-end redirect URL")
        })?;

        Ok(Self {
            provider,
            store,
            states,
            frontend_url,
        })
    }

    pub fn frontend_url(&self) -> &Url {
        &self.frontend_url
    }

    /// Process a redirect and return the outcome. Never fails: every error becomes a
    /// `CallbackOutcome::Failed`.
    pub async fn process(&self, params: CallbackParams) -> CallbackOutcome {
        match self.run(params).await {
            Ok(account) => {
                info!(
                    "Linked Google account for tenant {} user {}",
                    account.tenant_id, account.user_id
                );
                CallbackOutcome::Connected(account)
            }
            Err(error) => {
                warn!("OAuth callback failed: {}", error);
                CallbackOutcome::Failed(error)
            }
        }
    }

    /// Process a redirect and return where to send the browser.
    pub async fn process_to_redirect(&self, params: CallbackParams) -> Url {
        self.process(params).await.redirect_url(&self.frontend_url)
    }

    async fn run(&self, params: CallbackParams) -> Result<LinkedAccount, CallbackError> {
        let (code, state) = start(params)?;
        let identity = self.validate_state(&state)?;
        let grant = self.exchange(&code).await?;
        let user = self.fetch_identity(&grant).await?;
        self.persist(&identity, grant, user).await
    }

    fn validate_state(&self, state: &str) -> Result<OAuthState, CallbackError> {
        self.states
            .decode(state)
            .map_err(|_| CallbackError::new(CallbackStage::Start, CallbackErrorKind::InvalidState))
    }

    async fn exchange(&self, code: &str) -> Result<TokenGrant, CallbackError> {
        self.provider.exchange_code(code).await.map_err(|e| {
            debug!("Code exchange failed: {}", e);
            CallbackError::new(
                CallbackStage::StateValidated,
                CallbackErrorKind::TokenExchangeFailed,
            )
        })
    }

    async fn fetch_identity(&self, grant: &TokenGrant) -> Result<UserInfo, CallbackError> {
        self.provider
            .get_user_info(&grant.access_token)
            .await
            .map_err(|e| {
                debug!("Identity lookup failed: {}", e);
                CallbackError::new(
                    CallbackStage::CodeExchanged,
                    CallbackErrorKind::TokenExchangeFailed,
                )
            })
    }

    async fn persist(
        &self,
        identity: &OAuthState,
        grant: TokenGrant,
        user: UserInfo,
    ) -> Result<LinkedAccount, CallbackError> {
        let now = Utc::now();
        let update = LinkedAccountUpsert {
            external_email: user.email,
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expires_at: now + Duration::seconds(grant.expires_in.clamp(0, MAX_EXPIRES_IN_SECS)),
            connected_at: now,
        };

        self.store
            .upsert(&identity.tenant_id, &identity.user_id, update)
            .await
            .map_err(|e| {
                error!("Failed to store linked account: {}", e);
                CallbackError::new(CallbackStage::IdentityFetched, CallbackErrorKind::Internal)
            })
    }
}

impl fmt::Debug for CallbackProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackProcessor")
            .field("frontend_url", &self.frontend_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Reject denied consent and incomplete redirects before anything else runs.
fn start(params: CallbackParams) -> Result<(String, String), CallbackError> {
    if let Some(error) = params.error {
        info!("Provider reported callback error: {}", error);
        return Err(CallbackError::new(
            CallbackStage::Start,
            CallbackErrorKind::AccessDenied,
        ));
    }

    let code = params.code.filter(|code| !code.is_empty());
    let state = params.state.filter(|state| !state.is_empty());

    code.zip(state).ok_or_else(|| {
        CallbackError::new(CallbackStage::Start, CallbackErrorKind::InvalidRequest)
    })
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use secrecy::{ExposeSecret, SecretString};

    use super::*;
    use crate::error::{oauth_error, OAuthErrorKind};
    use crate::linked_account::InMemoryStorage;
    use crate::oauth::{AuthorizationRequestBuilder, OAuthConfig};
    use crate::session::Principal;

    const FRONTEND: &str = "https://app.example.com/settings/integrations";

    /// Test double that replays queued token responses and counts calls.
    #[derive(Default)]
    struct StubProvider {
        grants: Mutex<VecDeque<Result<TokenGrant, Error>>>,
        email: Option<String>,
        exchange_calls: AtomicUsize,
        user_info_calls: AtomicUsize,
    }

    impl StubProvider {
        fn with_grants(grants: Vec<Result<TokenGrant, Error>>) -> Self {
            Self {
                grants: Mutex::new(grants.into()),
                email: Some("owner@clinic.test".to_string()),
                ..Self::default()
            }
        }

        fn exchange_calls(&self) -> usize {
            self.exchange_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Provider for StubProvider {
        async fn exchange_code(&self, _code: &str) -> Result<TokenGrant, Error> {
            self.exchange_calls.fetch_add(1, Ordering::SeqCst);
            self.grants
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(oauth_error(OAuthErrorKind::TokenExchangeFailed, "empty")))
        }

        async fn get_user_info(&self, _access_token: &SecretString) -> Result<UserInfo, Error> {
            self.user_info_calls.fetch_add(1, Ordering::SeqCst);
            self.email
                .clone()
                .map(|email| UserInfo { email })
                .ok_or_else(|| oauth_error(OAuthErrorKind::InvalidResponse, "no email"))
        }
    }

    fn grant(access: &str, refresh: Option<&str>) -> Result<TokenGrant, Error> {
        Ok(TokenGrant {
            access_token: SecretString::new(access.to_string()),
            refresh_token: refresh.map(|r| SecretString::new(r.to_string())),
            expires_in: 3600,
        })
    }

    fn states() -> StateCodec {
        StateCodec::new(&SecretString::new("callback-test-secret".to_string())).unwrap()
    }

    fn processor(
        provider: Arc<StubProvider>,
        store: Arc<InMemoryStorage>,
    ) -> CallbackProcessor {
        CallbackProcessor::new(provider, store, states(), FRONTEND).unwrap()
    }

    fn params(code: Option<&str>, state: Option<String>, error: Option<&str>) -> CallbackParams {
        CallbackParams {
            code: code.map(str::to_string),
            state,
            error: error.map(str::to_string),
        }
    }

    fn valid_state() -> Option<String> {
        Some(states().encode("t1", "u1"))
    }

    fn redirect_query(url: &Url) -> HashMap<String, String> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[tokio::test]
    async fn test_provider_error_never_calls_token_exchange() {
        let provider = Arc::new(StubProvider::with_grants(vec![grant("tok", None)]));
        let store = Arc::new(InMemoryStorage::new());

        let outcome = processor(provider.clone(), store.clone())
            .process(params(Some("abc"), valid_state(), Some("access_denied")))
            .await;

        assert_eq!(outcome.error_kind(), Some(CallbackErrorKind::AccessDenied));
        assert_eq!(provider.exchange_calls(), 0);
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_missing_code_or_state_is_invalid_request() {
        let provider = Arc::new(StubProvider::with_grants(vec![]));
        let store = Arc::new(InMemoryStorage::new());
        let processor = processor(provider.clone(), store.clone());

        for params in [
            params(None, valid_state(), None),
            params(Some("abc"), None, None),
            params(Some(""), valid_state(), None),
            CallbackParams::default(),
        ] {
            let outcome = processor.process(params).await;
            assert_eq!(outcome.error_kind(), Some(CallbackErrorKind::InvalidRequest));
        }
        assert_eq!(provider.exchange_calls(), 0);
    }

    #[tokio::test]
    async fn test_forged_state_is_invalid_state() {
        let provider = Arc::new(StubProvider::with_grants(vec![grant("tok", None)]));
        let store = Arc::new(InMemoryStorage::new());
        let forged = StateCodec::new(&SecretString::new("attacker".to_string()))
            .unwrap()
            .encode("t1", "u1");

        let outcome = processor(provider.clone(), store.clone())
            .process(params(Some("abc"), Some(forged), None))
            .await;

        assert_eq!(outcome.error_kind(), Some(CallbackErrorKind::InvalidState));
        assert_eq!(provider.exchange_calls(), 0);
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_missing_access_token_performs_no_write() {
        let provider = Arc::new(StubProvider::with_grants(vec![Err(oauth_error(
            OAuthErrorKind::TokenExchangeFailed,
            "token response did not include an access_token",
        ))]));
        let store = Arc::new(InMemoryStorage::new());

        let outcome = processor(provider.clone(), store.clone())
            .process(params(Some("abc"), valid_state(), None))
            .await;

        assert_eq!(outcome.error_kind(), Some(CallbackErrorKind::TokenExchangeFailed));
        assert_eq!(provider.exchange_calls(), 1);
        assert_eq!(provider.user_info_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_identity_failure_is_token_exchange_failed() {
        let provider = Arc::new(StubProvider {
            email: None,
            ..StubProvider::with_grants(vec![grant("tok", Some("ref"))])
        });
        let store = Arc::new(InMemoryStorage::new());

        let outcome = processor(provider, store.clone())
            .process(params(Some("abc"), valid_state(), None))
            .await;

        match outcome {
            CallbackOutcome::Failed(error) => {
                assert_eq!(error.kind, CallbackErrorKind::TokenExchangeFailed);
                assert_eq!(error.stage, CallbackStage::CodeExchanged);
            }
            CallbackOutcome::Connected(_) => panic!("expected failure"),
        }
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_success_persists_account() {
        let provider = Arc::new(StubProvider::with_grants(vec![grant("tok", Some("ref"))]));
        let store = Arc::new(InMemoryStorage::new());
        let before = Utc::now();

        let outcome = processor(provider, store.clone())
            .process(params(Some("abc"), valid_state(), None))
            .await;

        assert!(outcome.is_connected());
        let account = store.fetch_active("t1", "u1").await.unwrap().unwrap();
        assert_eq!(account.external_email, "owner@clinic.test");
        assert_eq!(account.access_token.expose_secret(), "tok");
        assert_eq!(account.refresh_token.unwrap().expose_secret(), "ref");
        assert!(account.expires_at >= before + Duration::seconds(3600));
        assert!(account.connected_at >= before);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_second_callback_keeps_refresh_token_unless_reissued() {
        let provider = Arc::new(StubProvider::with_grants(vec![
            grant("a1", Some("r1")),
            grant("a2", None),
            grant("a3", Some("r3")),
        ]));
        let store = Arc::new(InMemoryStorage::new());
        let processor = processor(provider, store.clone());

        processor.process(params(Some("c1"), valid_state(), None)).await;
        processor.process(params(Some("c2"), valid_state(), None)).await;

        let account = store.fetch_active("t1", "u1").await.unwrap().unwrap();
        assert_eq!(store.active_count().await, 1);
        assert_eq!(account.access_token.expose_secret(), "a2");
        assert_eq!(account.refresh_token.unwrap().expose_secret(), "r1");

        processor.process(params(Some("c3"), valid_state(), None)).await;

        let account = store.fetch_active("t1", "u1").await.unwrap().unwrap();
        assert_eq!(store.active_count().await, 1);
        assert_eq!(account.refresh_token.unwrap().expose_secret(), "r3");
    }

    #[tokio::test]
    async fn test_callback_retains_existing_refresh_token() {
        let store = Arc::new(InMemoryStorage::new());
        let now = Utc::now();
        store
            .upsert(
                "t1",
                "u1",
                LinkedAccountUpsert {
                    external_email: "owner@clinic.test".to_string(),
                    access_token: SecretString::new("stale".to_string()),
                    refresh_token: Some(SecretString::new("old".to_string())),
                    expires_at: now,
                    connected_at: now,
                },
            )
            .await
            .unwrap();
        store.deactivate("t1", "u1", now).await.unwrap();
        let provider = Arc::new(StubProvider::with_grants(vec![grant("tok", None)]));

        let outcome = processor(provider, store.clone())
            .process(params(Some("abc"), valid_state(), None))
            .await;

        assert!(outcome.is_connected());
        let account = store.fetch_active("t1", "u1").await.unwrap().unwrap();
        assert_eq!(account.access_token.expose_secret(), "tok");
        assert_eq!(account.refresh_token.unwrap().expose_secret(), "old");
        assert!(account.is_active);
    }

    #[tokio::test]
    async fn test_authorization_state_round_trips_through_callback() {
        let config = OAuthConfig::google("https://portal.example.com")
            .with_client("client-123", SecretString::new("shh".to_string()));
        let principal = Principal::new("t7".to_string(), "u9".to_string(), None, vec![]);
        let url = AuthorizationRequestBuilder::new(config, states())
            .build(&principal)
            .unwrap();
        let state = redirect_query(&Url::parse(&url).unwrap())
            .remove("state")
            .unwrap();
        let provider = Arc::new(StubProvider::with_grants(vec![grant("tok", None)]));
        let store = Arc::new(InMemoryStorage::new());

        processor(provider, store.clone())
            .process(params(Some("abc"), Some(state), None))
            .await;

        assert!(store.fetch_active("t7", "u9").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_redirect_markers() {
        let provider = Arc::new(StubProvider::with_grants(vec![grant("tok", None)]));
        let store = Arc::new(InMemoryStorage::new());
        let processor = processor(provider, store);

        let success = processor
            .process_to_redirect(params(Some("abc"), valid_state(), None))
            .await;
        assert!(success.as_str().starts_with(FRONTEND));
        assert_eq!(redirect_query(&success)["success"], "connected");

        let denied = processor
            .process_to_redirect(params(None, None, Some("access_denied")))
            .await;
        assert_eq!(redirect_query(&denied)["error"], "access_denied");

        let bad_state = processor
            .process_to_redirect(params(Some("abc"), Some("junk".to_string()), None))
            .await;
        assert_eq!(redirect_query(&bad_state)["error"], "invalid_request");

        let exhausted = processor
            .process_to_redirect(params(Some("abc"), valid_state(), None))
            .await;
        assert_eq!(redirect_query(&exhausted)["error"], "token_exchange_failed");
    }

    #[test]
    fn test_internal_marker() {
        assert_eq!(CallbackErrorKind::Internal.marker(), "internal_error");
    }

    #[test]
    fn test_invalid_frontend_url_is_config_error() {
        let result = CallbackProcessor::new(
            Arc::new(StubProvider::default()),
            Arc::new(InMemoryStorage::new()),
            states(),
            "not a url",
        );
        assert!(result.is_err());
    }
}

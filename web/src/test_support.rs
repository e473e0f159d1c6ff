use std::sync::Arc;

use domain::linked_account::AccountLinking;
use domain::session::Sessions;
use portal_auth::linked_account::InMemoryStorage;
use secrecy::SecretString;
use service::config::Config;

use crate::AppState;

pub(crate) fn config() -> Config {
    Config::try_from_args([
        "clinic_portal_rs",
        "--frontend-base-url",
        "https://app.clinic.test",
    ])
    .unwrap()
    .set_session_signing_secret(SecretString::new("web-test-secret".to_string()))
    .set_google_client(
        "client-123".to_string(),
        SecretString::new("secret-456".to_string()),
    )
}

pub(crate) fn app_state_with_store(store: Arc<InMemoryStorage>) -> AppState {
    let config = config();
    let sessions = Sessions::from_config(&config).unwrap();
    let linking = AccountLinking::with_store(&config, store).unwrap();
    AppState::with_components(config, sessions, linking)
}

pub(crate) fn app_state() -> AppState {
    app_state_with_store(Arc::new(InMemoryStorage::new()))
}

pub(crate) fn bearer_token(tenant_id: &str, user_id: &str) -> String {
    Sessions::from_config(&config())
        .unwrap()
        .issue(tenant_id, user_id, None, &[])
        .unwrap()
}

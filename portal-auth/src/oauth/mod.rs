//! OAuth 2.0 client flow for linking a clinic's Google Business Profile account.
//!
//! `AuthorizationRequestBuilder` sends the user to the provider with a signed state,
//! and `CallbackProcessor` turns the provider's redirect into a stored
//! `LinkedAccount`.

mod authorize;
mod callback;
mod config;
mod provider;
mod state;

pub mod providers;

pub use authorize::AuthorizationRequestBuilder;
pub use callback::{
    CallbackError, CallbackErrorKind, CallbackOutcome, CallbackParams, CallbackProcessor,
    CallbackStage,
};
pub use config::{
    OAuthConfig, GOOGLE_AUTH_URL, GOOGLE_BUSINESS_SCOPES, GOOGLE_CALLBACK_PATH, GOOGLE_TOKEN_URL,
    GOOGLE_USERINFO_URL,
};
pub use provider::{Provider, TokenGrant, UserInfo, DEFAULT_EXPIRES_IN_SECS};
pub use state::{OAuthState, StateCodec};

//! OAuth provider trait and types.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::Error;

/// Lifetime assumed when a token response omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Tokens returned by a successful authorization code exchange.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: SecretString,
    /// Providers do not always reissue a refresh token on re-consent.
    pub refresh_token: Option<SecretString>,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
}

/// Identity of the external account that granted consent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub email: String,
}

/// The network half of an OAuth 2.0 authorization code flow.
///
/// URL construction lives in `AuthorizationRequestBuilder` and needs no provider
/// round trip.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Exchange an authorization code for tokens with a single token endpoint POST.
    ///
    /// A response without an `access_token` is an error whatever its HTTP status.
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, Error>;

    /// Look up the account identity for a freshly issued access token.
    async fn get_user_info(&self, access_token: &SecretString) -> Result<UserInfo, Error>;
}

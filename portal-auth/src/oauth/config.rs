//! Provider configuration shared by the authorization builder and the callback.

use secrecy::SecretString;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Path of the callback route, appended to the public base URL when no explicit
/// redirect URI is configured.
pub const GOOGLE_CALLBACK_PATH: &str = "/oauth/google/callback";

/// Scopes needed to manage a Google Business Profile and identify the account.
pub const GOOGLE_BUSINESS_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/business.manage",
    "openid",
    "email",
];

/// Immutable OAuth client configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    /// Explicit redirect URI. Falls back to `public_base_url` + `GOOGLE_CALLBACK_PATH`.
    pub redirect_uri: Option<String>,
    pub public_base_url: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Google endpoints and business-profile scopes with no client credentials set.
    pub fn google(public_base_url: impl Into<String>) -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            public_base_url: public_base_url.into(),
            authorization_endpoint: GOOGLE_AUTH_URL.to_string(),
            token_endpoint: GOOGLE_TOKEN_URL.to_string(),
            userinfo_endpoint: GOOGLE_USERINFO_URL.to_string(),
            scopes: GOOGLE_BUSINESS_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_client(mut self, client_id: impl Into<String>, client_secret: SecretString) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret);
        self
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Non-blank client id, if configured.
    pub fn client_id(&self) -> Option<&str> {
        self.client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// The redirect URI sent both in the authorization request and the code exchange.
    pub fn effective_redirect_uri(&self) -> String {
        match self.redirect_uri.as_deref().map(str::trim) {
            Some(uri) if !uri.is_empty() => uri.to_string(),
            _ => format!(
                "{}{}",
                self.public_base_url.trim_end_matches('/'),
                GOOGLE_CALLBACK_PATH
            ),
        }
    }
}

//! Google OAuth provider implementation.

use async_trait::async_trait;
use log::*;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::{config_error, oauth_error, ConfigErrorKind, Error, OAuthErrorKind};
use crate::http::{HttpClientBuilder, HttpClientConfig, RetryingClient};
use crate::oauth::provider::DEFAULT_EXPIRES_IN_SECS;
use crate::oauth::{OAuthConfig, Provider, TokenGrant, UserInfo};

/// Token endpoint response. Every field is optional because Google may answer with
/// an error object, sometimes even under a 200 status.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    #[serde(default)]
    email: Option<String>,
}

/// Google OAuth provider.
pub struct GoogleProvider {
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    token_url: String,
    userinfo_url: String,
    token_client: reqwest::Client,
    identity_client: RetryingClient,
}

impl GoogleProvider {
    /// Create a provider from the OAuth configuration.
    ///
    /// Both client credentials are required; the same redirect URI used in the
    /// authorization request is sent with the code exchange.
    pub fn new(config: &OAuthConfig, http: HttpClientConfig) -> Result<Self, Error> {
        let client_id = config.client_id().ok_or_else(|| {
            config_error(
                ConfigErrorKind::MissingProviderConfig,
                "OAuth client_id is not configured",
            )
        })?;
        let client_secret = config
            .client_secret
            .clone()
            .filter(|secret| !secret.expose_secret().trim().is_empty())
            .ok_or_else(|| {
                config_error(
                    ConfigErrorKind::MissingProviderConfig,
                    "OAuth client_secret is not configured",
                )
            })?;

        let builder = HttpClientBuilder::from_config(http);

        Ok(Self {
            client_id: client_id.to_string(),
            client_secret,
            redirect_uri: config.effective_redirect_uri(),
            token_url: config.token_endpoint.clone(),
            userinfo_url: config.userinfo_endpoint.clone(),
            token_client: builder.build_plain()?,
            identity_client: builder.build_retrying()?,
        })
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, Error> {
        debug!("Exchanging Google OAuth code for tokens");

        let response = self
            .token_client
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret().as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to reach Google token endpoint: {:?}", e);
                Error::from(e)
            })?;

        let status = response.status();
        let body = response.text().await?;

        let tokens: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            warn!("Unparseable Google token response (status {}): {:?}", status, e);
            oauth_error(
                OAuthErrorKind::TokenExchangeFailed,
                "invalid token endpoint response",
            )
        })?;

        let access_token = tokens
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                warn!(
                    "Google token response without access_token (status {}): {} {}",
                    status,
                    tokens.error.as_deref().unwrap_or("no error code"),
                    tokens.error_description.as_deref().unwrap_or_default()
                );
                oauth_error(
                    OAuthErrorKind::TokenExchangeFailed,
                    "token response did not include an access_token",
                )
            })?;

        info!("Successfully exchanged Google OAuth code for tokens");

        Ok(TokenGrant {
            access_token: SecretString::new(access_token),
            refresh_token: tokens
                .refresh_token
                .filter(|token| !token.is_empty())
                .map(SecretString::new),
            expires_in: tokens.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS).max(0),
        })
    }

    async fn get_user_info(&self, access_token: &SecretString) -> Result<UserInfo, Error> {
        let response = self
            .identity_client
            .get(&self.userinfo_url)
            .bearer_auth(access_token.expose_secret())
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to reach Google userinfo endpoint: {:?}", e);
                Error::from(e)
            })?;

        if !response.status().is_success() {
            warn!("Google userinfo request failed: {}", response.status());
            return Err(oauth_error(
                OAuthErrorKind::InvalidResponse,
                "userinfo request was not successful",
            ));
        }

        let user: UserInfoResponse = response.json().await?;

        user.email
            .filter(|email| !email.is_empty())
            .map(|email| UserInfo { email })
            .ok_or_else(|| {
                warn!("Google userinfo response did not include an email");
                oauth_error(OAuthErrorKind::InvalidResponse, "userinfo lacks email")
            })
    }
}

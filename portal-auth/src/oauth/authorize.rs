//! Building the provider consent URL.

use log::*;
use url::Url;

use super::{OAuthConfig, StateCodec};
use crate::error::{config_error, ConfigErrorKind, Error};
use crate::session::Principal;

/// Builds authorization URLs that send a portal user to the provider's consent page.
#[derive(Debug, Clone)]
pub struct AuthorizationRequestBuilder {
    config: OAuthConfig,
    states: StateCodec,
}

impl AuthorizationRequestBuilder {
    pub fn new(config: OAuthConfig, states: StateCodec) -> Self {
        Self { config, states }
    }

    /// Authorization URL carrying a signed state bound to the principal's tenant and user.
    ///
    /// Makes no network calls. Fails with `MissingProviderConfig` rather than producing
    /// a URL without a client id.
    pub fn build(&self, principal: &Principal) -> Result<String, Error> {
        let client_id = self.config.client_id().ok_or_else(|| {
            error!("OAuth client id is not configured; cannot build authorization URL");
            config_error(
                ConfigErrorKind::MissingProviderConfig,
                "OAuth client_id is not configured",
            )
        })?;

        let mut url = Url::parse(&self.config.authorization_endpoint).map_err(|e| {
            error!(
                "Invalid authorization endpoint {}: {:?}",
                self.config.authorization_endpoint, e
            );
            config_error(ConfigErrorKind::InvalidUrl, "invalid authorization endpoint")
        })?;

        let state = self.states.encode(principal.tenant_id(), principal.user_id());

        url.query_pairs_mut()
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", &self.config.effective_redirect_uri())
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", &state);

        debug!(
            "Built authorization URL for tenant {} user {}",
            principal.tenant_id(),
            principal.user_id()
        );

        Ok(url.into())
    }
}

//! Response bodies for the Google account linking endpoints.

use chrono::{DateTime, Utc};
use domain::linked_account::LinkStatus;
use serde::Serialize;
use utoipa::ToSchema;

/// Where to send the browser to grant consent.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthorizationUrl {
    pub authorization_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Success {
    pub success: bool,
}

impl Success {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Current connection of the signed-in user. Tokens are never included.
#[derive(Debug, Serialize, ToSchema)]
pub struct LinkStatusResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<DateTime<Utc>>,
}

impl From<LinkStatus> for LinkStatusResponse {
    fn from(status: LinkStatus) -> Self {
        Self {
            connected: status.connected,
            external_email: status.external_email,
            expires_at: status.expires_at,
            connected_at: status.connected_at,
        }
    }
}

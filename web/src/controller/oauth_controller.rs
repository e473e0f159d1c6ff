//! Controller for linking a clinic's Google Business Profile account.
//!
//! The callback is reached by a browser redirect from Google, so it is not
//! session-authenticated: the signed `state` carries the tenant user instead.

use crate::extractors::authenticated_principal::AuthenticatedPrincipal;
use crate::response::oauth::{AuthorizationUrl, LinkStatusResponse, Success};
use crate::{AppState, Error};

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect};
use axum::Json;
use domain::CallbackParams;
use log::*;

/// GET /oauth/google/authorize
///
/// Returns the Google consent URL for the signed-in user.
#[utoipa::path(
    get,
    path = "/oauth/google/authorize",
    responses(
        (status = 200, description = "Google consent URL", body = AuthorizationUrl),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Server error (OAuth not configured)"),
    ),
    security(
        ("bearer_auth" = []),
        ("cookie_auth" = [])
    )
)]
pub async fn authorize(
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    debug!(
        "GET Google authorization URL for tenant {} user {}",
        principal.tenant_id(),
        principal.user_id()
    );

    let authorization_url = app_state.linking.authorization_url(&principal)?;

    Ok(Json(AuthorizationUrl { authorization_url }))
}

/// GET /oauth/google/callback
///
/// Always redirects to the front-end integrations page with either
/// `success=connected` or `error=<kind>`.
#[utoipa::path(
    get,
    path = "/oauth/google/callback",
    params(
        ("code" = Option<String>, Query, description = "Authorization code from Google"),
        ("state" = Option<String>, Query, description = "Signed state issued by /oauth/google/authorize"),
        ("error" = Option<String>, Query, description = "Error reported by Google, e.g. access_denied"),
    ),
    responses(
        (status = 307, description = "Redirect to the front-end integrations page"),
    )
)]
pub async fn callback(
    State(app_state): State<AppState>,
    params: Result<Query<CallbackParams>, QueryRejection>,
) -> impl IntoResponse {
    // An unparseable query is handled like an empty one: it ends as invalid_request.
    let params = params.map(|Query(params)| params).unwrap_or_else(|rejection| {
        warn!("Malformed OAuth callback query: {rejection}");
        CallbackParams::default()
    });

    let redirect_url = app_state.linking.process_callback(params).await;

    Redirect::temporary(&redirect_url)
}

/// POST /oauth/google/disconnect
///
/// Marks the signed-in user's linked account inactive. Succeeds when nothing is linked.
#[utoipa::path(
    post,
    path = "/oauth/google/disconnect",
    responses(
        (status = 200, description = "Account disconnected", body = Success),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal Server Error"),
    ),
    security(
        ("bearer_auth" = []),
        ("cookie_auth" = [])
    )
)]
pub async fn disconnect(
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    app_state.linking.disconnect(&principal).await?;

    Ok(Json(Success::ok()))
}

/// GET /oauth/google/status
#[utoipa::path(
    get,
    path = "/oauth/google/status",
    responses(
        (status = 200, description = "Current Google account connection", body = LinkStatusResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal Server Error"),
    ),
    security(
        ("bearer_auth" = []),
        ("cookie_auth" = [])
    )
)]
pub async fn status(
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    let status = app_state.linking.status(&principal).await?;

    Ok(Json(LinkStatusResponse::from(status)))
}

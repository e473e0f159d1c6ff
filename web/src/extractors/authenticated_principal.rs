use crate::{AppState, Error};
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use domain::Principal;

/// The `Principal` behind the request.
///
/// Reuses the one `require_auth` stored in the request extensions, otherwise
/// authenticates the request headers itself.
pub(crate) struct AuthenticatedPrincipal(pub Principal);

impl<S> FromRequestParts<S> for AuthenticatedPrincipal
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<Principal>() {
            return Ok(AuthenticatedPrincipal(principal.clone()));
        }

        let app_state = AppState::from_ref(state);
        let principal = app_state.sessions.authenticate(&parts.headers)?;
        Ok(AuthenticatedPrincipal(principal))
    }
}

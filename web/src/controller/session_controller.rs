use crate::cookies::removal_cookie;
use crate::response::oauth::Success;
use crate::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use axum_extra::extract::CookieJar;
use log::*;

/// Session tokens are stateless; logging out only clears the cookie on this client.
#[utoipa::path(
    post,
    path = "/session/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = Success),
    )
)]
pub async fn logout(State(app_state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    trace!("SessionController::logout()");
    (
        jar.add(removal_cookie(&app_state.sessions)),
        Json(Success::ok()),
    )
}

//! The session cookie carrying the signed session token.

use axum_extra::extract::cookie::{Cookie, SameSite};
use domain::session::Sessions;
use time::Duration as TimeDuration;

/// Cookie for a freshly issued session token. Used by the login collaborator.
pub fn session_cookie(sessions: &Sessions, token: String) -> Cookie<'static> {
    Cookie::build((sessions.cookie_name().to_string(), token))
        .path("/")
        .http_only(true)
        .secure(sessions.secure_cookie())
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::seconds(sessions.ttl().num_seconds()))
        .build()
}

/// Expired, empty session cookie. Sessions are stateless, so this is all logout does.
pub fn removal_cookie(sessions: &Sessions) -> Cookie<'static> {
    Cookie::build((sessions.cookie_name().to_string(), ""))
        .path("/")
        .http_only(true)
        .secure(sessions.secure_cookie())
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::ZERO)
        .build()
}

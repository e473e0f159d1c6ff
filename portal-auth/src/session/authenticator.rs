//! Turns inbound request credentials into a `Principal`.

use cookie::Cookie;
use http::header::{AUTHORIZATION, COOKIE};
use http::HeaderMap;
use log::*;

use super::{Principal, SessionClaims, TokenCodec};
use crate::error::{session_error, Error, SessionErrorKind};

/// Name of the cookie that carries the session token when no bearer header is sent.
pub const DEFAULT_SESSION_COOKIE: &str = "cp.token";

/// Authenticates requests against stateless session tokens.
///
/// Pure and side-effect free: calling `authenticate` several times for the same
/// request yields the same result.
#[derive(Debug, Clone)]
pub struct Authenticator {
    codec: TokenCodec,
    cookie_name: String,
}

impl Authenticator {
    pub fn new(codec: TokenCodec, cookie_name: impl Into<String>) -> Self {
        Self {
            codec,
            cookie_name: cookie_name.into(),
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Authenticate a request from its headers.
    ///
    /// The `Authorization: Bearer` header takes precedence over the session cookie when
    /// both are present.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, Error> {
        let token = bearer_token(headers)
            .or_else(|| self.cookie_token(headers))
            .ok_or_else(|| {
                session_error(SessionErrorKind::MissingToken, "no session credential")
            })?;

        let claims = self.codec.verify(&token)?;

        principal_from_claims(claims)
    }

    fn cookie_token(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|header| Cookie::split_parse(header.to_string()))
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == self.cookie_name && !cookie.value().is_empty())
            .map(|cookie| cookie.value().to_string())
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header, if any.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();

    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token.to_string())
    } else {
        None
    }
}

/// Require identity claims and apply defaults. This is the only place a `Principal`
/// is built, so a verified token without `tenant_id` or `user_id` can never pass.
fn principal_from_claims(claims: SessionClaims) -> Result<Principal, Error> {
    let tenant_id = claims.tenant_id.filter(|id| !id.trim().is_empty());
    let user_id = claims.user_id.filter(|id| !id.trim().is_empty());

    match (tenant_id, user_id) {
        (Some(tenant_id), Some(user_id)) => Ok(Principal::new(
            tenant_id,
            user_id,
            claims.role,
            claims.permissions.unwrap_or_default(),
        )),
        _ => {
            warn!("Verified session token is missing tenant or user identity");
            Err(session_error(
                SessionErrorKind::MalformedClaims,
                "session token lacks tenant_id or user_id",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::DEFAULT_ROLE;
    use chrono::Duration;
    use http::HeaderValue;
    use secrecy::SecretString;

    fn authenticator() -> Authenticator {
        let codec = TokenCodec::new(&SecretString::new("authenticator-test-secret".to_string()));
        Authenticator::new(codec, DEFAULT_SESSION_COOKIE)
    }

    fn token_for(tenant_id: &str, user_id: &str) -> String {
        authenticator()
            .codec()
            .sign(&SessionClaims::new(tenant_id, user_id, Duration::hours(1)))
            .unwrap()
    }

    fn headers(pairs: &[(http::HeaderName, String)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    fn failure(result: Result<Principal, Error>) -> Option<SessionErrorKind> {
        result.err().and_then(|e| e.session_kind())
    }

    #[test]
    fn test_no_credentials_is_missing_token() {
        let result = authenticator().authenticate(&HeaderMap::new());
        assert_eq!(failure(result), Some(SessionErrorKind::MissingToken));
    }

    #[test]
    fn test_unrelated_cookie_is_missing_token() {
        let headers = headers(&[(COOKIE, "theme=dark; other=1".to_string())]);
        let result = authenticator().authenticate(&headers);
        assert_eq!(failure(result), Some(SessionErrorKind::MissingToken));
    }

    #[test]
    fn test_bearer_header_authenticates() {
        let headers = headers(&[(AUTHORIZATION, format!("Bearer {}", token_for("t1", "u1")))]);

        let principal = authenticator().authenticate(&headers).unwrap();

        assert_eq!(principal.tenant_id(), "t1");
        assert_eq!(principal.user_id(), "u1");
    }

    #[test]
    fn test_cookie_authenticates() {
        let cookie = format!("theme=dark; cp.token={}", token_for("t2", "u2"));
        let headers = headers(&[(COOKIE, cookie)]);

        let principal = authenticator().authenticate(&headers).unwrap();

        assert_eq!(principal.tenant_id(), "t2");
    }

    #[test]
    fn test_header_takes_precedence_over_cookie() {
        let headers = headers(&[
            (AUTHORIZATION, format!("Bearer {}", token_for("header-tenant", "u1"))),
            (COOKIE, format!("cp.token={}", token_for("cookie-tenant", "u2"))),
        ]);

        let principal = authenticator().authenticate(&headers).unwrap();

        assert_eq!(principal.tenant_id(), "header-tenant");
        assert_eq!(principal.user_id(), "u1");
    }

    #[test]
    fn test_invalid_header_is_not_rescued_by_valid_cookie() {
        let headers = headers(&[
            (AUTHORIZATION, "Bearer garbage".to_string()),
            (COOKIE, format!("cp.token={}", token_for("t1", "u1"))),
        ]);

        let result = authenticator().authenticate(&headers);
        assert_eq!(failure(result), Some(SessionErrorKind::InvalidOrExpired));
    }

    #[test]
    fn test_non_bearer_authorization_falls_back_to_cookie() {
        let headers = headers(&[
            (AUTHORIZATION, "Basic dXNlcjpwYXNz".to_string()),
            (COOKIE, format!("cp.token={}", token_for("t1", "u1"))),
        ]);

        let principal = authenticator().authenticate(&headers).unwrap();
        assert_eq!(principal.tenant_id(), "t1");
    }

    #[test]
    fn test_missing_identity_is_malformed_claims() {
        let mut claims = SessionClaims::new("t1", "u1", Duration::hours(1));
        claims.tenant_id = None;
        let token = authenticator().codec().sign(&claims).unwrap();
        let headers = headers(&[(AUTHORIZATION, format!("Bearer {token}"))]);

        let result = authenticator().authenticate(&headers);
        assert_eq!(failure(result), Some(SessionErrorKind::MalformedClaims));
    }

    #[test]
    fn test_blank_user_id_is_malformed_claims() {
        let token = token_for("t1", "  ");
        let headers = headers(&[(AUTHORIZATION, format!("Bearer {token}"))]);

        let result = authenticator().authenticate(&headers);
        assert_eq!(failure(result), Some(SessionErrorKind::MalformedClaims));
    }

    #[test]
    fn test_role_and_permissions_default_when_absent() {
        let headers = headers(&[(AUTHORIZATION, format!("Bearer {}", token_for("t1", "u1")))]);

        let principal = authenticator().authenticate(&headers).unwrap();

        assert_eq!(principal.role(), DEFAULT_ROLE);
        assert!(principal.permissions().is_empty());
    }

    #[test]
    fn test_role_and_permissions_are_carried() {
        let claims = SessionClaims::new("t1", "u1", Duration::hours(1))
            .with_role("owner")
            .with_permissions(["billing", "billing", "reports"]);
        let token = authenticator().codec().sign(&claims).unwrap();
        let headers = headers(&[(AUTHORIZATION, format!("Bearer {token}"))]);

        let principal = authenticator().authenticate(&headers).unwrap();

        assert_eq!(principal.role(), "owner");
        assert_eq!(principal.permissions().len(), 2);
        assert!(principal.has_permission("reports"));
    }

    #[test]
    fn test_authenticate_is_idempotent() {
        let headers = headers(&[(AUTHORIZATION, format!("Bearer {}", token_for("t1", "u1")))]);
        let authenticator = authenticator();

        let first = authenticator.authenticate(&headers).unwrap();
        let second = authenticator.authenticate(&headers).unwrap();

        assert_eq!(first, second);
    }
}

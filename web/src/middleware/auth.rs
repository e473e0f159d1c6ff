use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{AppState, Error};

/// Authentication middleware that returns 401 Unauthorized for unauthenticated requests.
///
/// On success the `Principal` is stored in the request extensions for handlers.
pub async fn require_auth(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match app_state.sessions.authenticate(request.headers()) {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(e) => Error::from(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{app_state, bearer_token};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Extension, Router,
    };
    use domain::Principal;
    use tower::ServiceExt;

    async fn test_handler(Extension(principal): Extension<Principal>) -> String {
        principal.user_id().to_string()
    }

    fn app() -> Router {
        let app_state = app_state();
        Router::new()
            .route("/test", get(test_handler))
            .route_layer(from_fn_with_state(app_state.clone(), require_auth))
            .with_state(app_state)
    }

    #[tokio::test]
    async fn test_require_auth_returns_401_without_credentials() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response: Response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_require_auth_returns_401_with_invalid_cookie() {
        let request = Request::builder()
            .uri("/test")
            .header("cookie", "cp.token=not-a-token")
            .body(Body::empty())
            .unwrap();
        let response: Response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_require_auth_allows_authenticated_request_to_proceed() {
        let request = Request::builder()
            .uri("/test")
            .header("authorization", format!("Bearer {}", bearer_token("t1", "u1")))
            .body(Body::empty())
            .unwrap();
        let response: Response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"u1");
    }
}

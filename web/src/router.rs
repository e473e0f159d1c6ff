use crate::{
    controller::{health_check_controller, oauth_controller, session_controller},
    middleware::auth::require_auth,
    response, AppState,
};
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Clinic Portal API"
        ),
        paths(
            health_check_controller::health_check,
            oauth_controller::authorize,
            oauth_controller::callback,
            oauth_controller::disconnect,
            oauth_controller::status,
            session_controller::logout,
        ),
        components(
            schemas(
                response::oauth::AuthorizationUrl,
                response::oauth::LinkStatusResponse,
                response::oauth::Success,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "clinic_portal", description = "Clinic Portal account linking API")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Session tokens are accepted either as a bearer header or in the session cookie.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "cp.token",
                    "Signed session token issued at login",
                ))),
            )
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(oauth_routes(app_state.clone()))
        .merge(session_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

/// Routes for the Google OAuth flow
fn oauth_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/oauth/google/authorize", get(oauth_controller::authorize))
        .route("/oauth/google/disconnect", post(oauth_controller::disconnect))
        .route("/oauth/google/status", get(oauth_controller::status))
        .route_layer(from_fn_with_state(app_state.clone(), require_auth))
        .merge(
            // Callback doesn't require auth (user is redirected back from Google)
            Router::new().route("/oauth/google/callback", get(oauth_controller::callback)),
        )
        .with_state(app_state)
}

fn session_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/session/logout", post(session_controller::logout))
        .with_state(app_state)
}

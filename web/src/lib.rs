use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use domain::linked_account::AccountLinking;
use domain::session::Sessions;
use log::*;
use service::config::Config;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

mod controller;
pub mod cookies;
mod error;
pub(crate) mod extractors;
pub(crate) mod middleware;
mod response;
mod router;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
pub use router::define_routes;

/// Request-facing state: the immutable configuration plus the components assembled
/// from it at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: Sessions,
    pub linking: AccountLinking,
}

impl AppState {
    /// Assemble session and linking components against the service's database.
    pub fn new(app_state: service::AppState) -> Result<Self> {
        let sessions = Sessions::from_config(&app_state.config)?;
        let linking =
            AccountLinking::from_config(&app_state.config, app_state.database_connection)?;

        Ok(Self::with_components(app_state.config, sessions, linking))
    }

    pub fn with_components(config: Config, sessions: Sessions, linking: AccountLinking) -> Self {
        Self {
            config,
            sessions,
            linking,
        }
    }
}

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let host = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let server_url = format!("{host}:{}", app_state.config.port);

    let allowed_origins: Vec<HeaderValue> = app_state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();

    info!("Server starting... listening for connections on http://{server_url}");

    let listener = TcpListener::bind(server_url).await?;

    let cors_layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_credentials(true)
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_origin(allowed_origins);

    axum::serve(listener, define_routes(app_state).layer(cors_layer)).await
}

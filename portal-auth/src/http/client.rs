//! HTTP client construction for provider calls.
//!
//! Two flavours are built from the same settings. The plain client is used for the
//! authorization code exchange, which must reach the provider at most once because a
//! code is single-use. The retrying client wraps idempotent reads such as the identity
//! lookup in transport-level retry middleware.

use std::time::Duration;

use reqwest_middleware::ClientBuilder;
use reqwest_retry::RetryTransientMiddleware;

use super::BackoffPolicy;
use crate::error::Error;

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum number of transport retries for idempotent requests.
    pub max_retries: u32,
    /// Base delay of the retry backoff.
    pub retry_base_delay: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(250),
            user_agent: format!("clinic-portal/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP client with retry middleware.
pub type RetryingClient = reqwest_middleware::ClientWithMiddleware;

/// Builder for provider HTTP clients.
#[derive(Debug, Clone, Default)]
pub struct HttpClientBuilder {
    config: HttpClientConfig,
}

impl HttpClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: HttpClientConfig) -> Self {
        Self { config }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.config.user_agent = user_agent;
        self
    }

    /// A client with a timeout and no retries.
    pub fn build_plain(&self) -> Result<reqwest::Client, Error> {
        let client = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .user_agent(self.config.user_agent.clone())
            .build()?;
        Ok(client)
    }

    /// A client that retries transient failures with exponential backoff.
    pub fn build_retrying(&self) -> Result<RetryingClient, Error> {
        let retry_policy = BackoffPolicy::new(self.config.max_retries)
            .with_base_delay(self.config.retry_base_delay);

        Ok(ClientBuilder::new(self.build_plain()?)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build())
    }
}

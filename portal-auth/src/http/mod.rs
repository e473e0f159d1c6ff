//! Outbound HTTP clients for provider calls.

mod client;
mod retry;

pub use client::{HttpClientBuilder, HttpClientConfig, RetryingClient};
pub use retry::BackoffPolicy;

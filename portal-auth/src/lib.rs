//! # portal-auth
//!
//! Authentication and account-linking core for the clinic portal:
//! - Stateless session tokens (signing, verification, request authentication)
//! - OAuth 2.0 client flow for linking a clinic's Google Business Profile
//!   (signed state, authorization URL, callback state machine)
//! - The linked account persistence contract and token encryption at rest
//! - HTTP client building with timeout and retry middleware
//!
//! ## Architecture
//!
//! This crate has no knowledge of the web framework or the database:
//! - `domain` supplies a database backed `linked_account::Storage` and wires
//!   components together from process configuration
//! - `web` turns inbound requests into `HeaderMap`s and callback query parameters
//!
//! ## Usage
//!
//! ```rust,ignore
//! use portal_auth::{
//!     session::{Authenticator, TokenCodec},
//!     oauth::{AuthorizationRequestBuilder, CallbackProcessor, StateCodec},
//!     linked_account::Storage,
//! };
//! ```

pub mod error;
pub mod http;
pub mod linked_account;
pub mod oauth;
pub mod session;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
pub use session::Principal;

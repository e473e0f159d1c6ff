//! Business operations for the clinic portal.
//!
//! `web` depends on this crate only; the `entity_api` and `portal-auth` layers are
//! reached through the re-exports below so their error types never leak upward.
pub use entity_api::{linked_accounts, Id};
pub use portal_auth::oauth::CallbackParams;
pub use portal_auth::Principal;

pub mod error;
pub mod linked_account;
pub mod linked_account_store;
pub mod session;

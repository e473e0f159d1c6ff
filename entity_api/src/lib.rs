pub use entity::{linked_accounts, Id};

pub mod error;
pub mod linked_account;

//! Concrete OAuth providers.

pub mod google;

pub use google::GoogleProvider;

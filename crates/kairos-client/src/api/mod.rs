// Kairos/crates/kairos-client/src/api/mod.rs
//! Remote entity client - typed wrappers over the Kairos REST API
//!
//! Each resource lives in its own file as an `impl ApiClient` block. None of
//! them hold state beyond the bearer credential.

pub mod account_api;
pub mod catalog_api;
pub mod client;
pub mod coaching_api;
pub mod daily_api;
pub mod goals_api;
pub mod habits_api;
pub mod trackers_api;

pub use client::ApiClient;

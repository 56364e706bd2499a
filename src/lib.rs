// ABOUTME: Library root for stratus - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod deploy;
pub mod error;
pub mod output;
pub mod package;
pub mod params;
pub mod provider;
pub mod stream;
pub mod types;
pub mod upload;

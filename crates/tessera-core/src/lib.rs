//! Tessera Core - Configuration shared by the Tessera crates
//!
//! This crate provides:
//! - Registry configuration (sparse capacity limits) loaded from TOML
//! - Configuration error types

pub mod config;
pub mod error;

pub use config::RegistryConfig;
pub use error::ConfigError;

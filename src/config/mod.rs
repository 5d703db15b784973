//! Configuration module for nestile
//!
//! Provides types and parsing for `nestile.toml` conversion settings.

pub mod loader;
pub mod schema;

pub use loader::{load_config, merge_cli_overrides, CliOverrides, ConfigError, LoadedConfig};
pub use schema::*;

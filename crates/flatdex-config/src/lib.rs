//! Configuration loading and validation for flatdex.

pub mod config;
pub mod error;

pub use config::{Config, DaemonConfig, IndexConfig, RegistryConfig};
pub use error::{ConfigError, Result};

//! Layered configuration
//!
//! Settings are merged from four layers, later layers winning:
//! 1. Built-in defaults
//! 2. Config file (`--config`, else ~/.config/distkit/config.toml)
//! 3. Process environment (DISTURL, S3DISTURL, BUILDNAME, ...)
//! 4. CLI flags
//!
//! The merged document is validated into a [`DistConfig`] once at startup
//! and passed by reference to every pipeline component.

mod defaults;
mod effective;
mod env;
mod merge;
mod settings;

pub use defaults::BuiltinDefaults;
pub use effective::{ConfigOrigin, ConfigSource, EffectiveConfig};
pub use env::{env_layer, overrides_layer, ENV_VARS};
pub use merge::{deep_merge, merge_layers};
pub use settings::DistConfig;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {message}")]
    Io { path: String, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing required setting '{key}' (set {hint})")]
    MissingField { key: &'static str, hint: &'static str },

    #[error("Validation error: {0}")]
    Validation(String),
}

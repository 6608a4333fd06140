//! Error types for Twitter Extras
//!
//! Subsystems keep their own error enums (`BridgeError`, `FeatureError`);
//! this one covers setup: configuration, registries and files.

use thiserror::Error;

/// Errors that can occur while setting up or administering the extension
#[derive(Debug, Error)]
pub enum ExtrasError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Two features claimed the same preference key
    #[error("Duplicate feature identifier '{0}'")]
    DuplicateFeature(String),

    /// A preference key no registered feature owns
    #[error("Unknown feature '{0}'")]
    UnknownFeature(String),

    /// Invalid extension manifest
    #[error("Invalid manifest: {0}")]
    Manifest(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("Config serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Twitter Extras operations
pub type ExtrasResult<T> = Result<T, ExtrasError>;

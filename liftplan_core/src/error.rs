//! Error types for the liftplan_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for liftplan_core operations
///
/// The public generation entry point never returns these; they flow
/// between pipeline stages and out of the file/config helpers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// No credential or service configured for the generation oracle
    #[error("Generation oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// Network or service failure while calling the oracle
    #[error("Generation oracle call failed: {0}")]
    OracleCallFailed(String),

    /// Oracle returned text that is not a plan
    #[error("Malformed oracle response: {0}")]
    MalformedResponse(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

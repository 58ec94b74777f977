// src/error.rs

//! Unified error handling for the catalog cache.

use std::fmt;
use std::path::Path;

use thiserror::Error;

/// Result type alias for catalog cache operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Upstream catalog fetch failed for a brand
    #[error("Fetch error for {brand}: {message}")]
    Fetch { brand: String, message: String },

    /// Fetch succeeded but nothing was left after brand filtering
    #[error("Fetch for {brand} produced no usable products")]
    EmptyFetch { brand: String },

    /// Brand is not part of the configured brand list
    #[error("Unknown brand: {0}")]
    UnknownBrand(String),

    /// Snapshot could not be written
    #[error("Persistence error at {path}: {message}")]
    Persistence { path: String, message: String },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a fetch error for a brand.
    pub fn fetch(brand: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            brand: brand.into(),
            message: message.to_string(),
        }
    }

    /// Create a persistence error for a path.
    pub fn persistence(path: &Path, message: impl fmt::Display) -> Self {
        Self::Persistence {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    /// Whether the failure came from the upstream catalog rather than local state.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Fetch { .. } | Self::EmptyFetch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_message() {
        let err = AppError::fetch("zara", "timed out");
        assert_eq!(err.to_string(), "Fetch error for zara: timed out");
        assert!(err.is_upstream());
    }

    #[test]
    fn test_persistence_is_not_upstream() {
        let err = AppError::persistence(Path::new("/tmp/products.json"), "disk full");
        assert!(!err.is_upstream());
        assert!(err.to_string().contains("products.json"));
    }
}

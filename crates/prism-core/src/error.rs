//! Error types for the Prism analysis pipeline.
//!
//! Errors are split by boundary: configuration, pipeline input handling,
//! per-module faults and registry population. Module faults never leave the
//! engine; they are folded into the report as `ERROR` items.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised while reading or decoding the pipeline input.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image decoding failed
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// Image dimensions exceed limit
    #[error("Image too large: {width}x{height} > {max_dim}")]
    ImageTooLarge { width: u32, height: u32, max_dim: u32 },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Operation timed out
    #[error("Timeout in {stage} after {timeout_ms}ms")]
    Timeout { stage: String, timeout_ms: u64 },
}

/// A fault raised by an analysis module.
///
/// The engine records the `Display` form as the item's error message.
#[derive(Error, Debug)]
pub enum ModuleError {
    /// Generic processing failure
    #[error("{0}")]
    Failed(String),

    /// The module could not obtain pixel data
    #[error("{0}")]
    Decode(#[from] PipelineError),

    /// The module could not be constructed
    #[error("construction failed: {0}")]
    Construction(String),
}

impl ModuleError {
    /// Shorthand for [`ModuleError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Registry population errors.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A module with the same name is already registered
    #[error("duplicate module name: {0}")]
    DuplicateName(String),

    /// A module factory failed
    #[error("module construction failed: {0}")]
    Construction(#[from] ModuleError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_error_message_is_bare() {
        let err = ModuleError::failed("x");
        assert_eq!(err.to_string(), "x");
    }

    #[test]
    fn test_decode_error_wraps_into_module_error() {
        let err: ModuleError = PipelineError::Decode {
            message: "bad header".into(),
        }
        .into();
        assert_eq!(err.to_string(), "Decode error: bad header");
    }

    #[test]
    fn test_validation_error_names_the_field() {
        let err = ConfigError::ValidationError("glcm.levels".into());
        assert_eq!(err.to_string(), "Invalid configuration: glcm.levels");
    }
}

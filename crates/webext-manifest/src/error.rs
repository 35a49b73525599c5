//! Error types for manifest processing and validation.

use std::path::PathBuf;

use thiserror::Error;

/// Error codes for manifest validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// V001: A required field is absent
    MissingField,
    /// V002: A field has the wrong JSON type
    WrongType,
    /// V003: A numeric field is outside its allowed values
    OutOfRange,
    /// V004: A schema-level structural rule was violated
    SchemaViolation,
}

impl ErrorCode {
    /// Returns the error code string (e.g., "V001").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::MissingField => "V001",
            ErrorCode::WrongType => "V002",
            ErrorCode::OutOfRange => "V003",
            ErrorCode::SchemaViolation => "V004",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A validation error with code, message, and JSON path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The error code.
    pub code: ErrorCode,
    /// Human-readable error message.
    pub message: String,
    /// JSON path to the problematic field (e.g., "content_scripts\[0\].matches").
    pub path: String,
}

impl ValidationError {
    /// Creates a new validation error at `path`.
    pub fn new(code: ErrorCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: path.into(),
        }
    }

    /// Shorthand for a [`ErrorCode::SchemaViolation`] error.
    pub fn schema(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SchemaViolation, message, path)
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} (at {})", self.code, self.message, self.path)
    }
}

impl std::error::Error for ValidationError {}

/// Fatal errors from the manifest pipeline.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest bytes are not a JSON object.
    #[error("could not parse manifest.json: {0}")]
    Parse(String),

    /// Serialization of the transformed document failed.
    #[error("could not serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),

    /// I/O error while reading the manifest.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from injecting the reload bootstrap into the background entry point.
#[derive(Debug, Error)]
pub enum InjectError {
    /// A background page or service worker declared by the manifest is missing.
    #[error("background file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The manifest declares both `background.page` and `background.scripts`.
    #[error("found background page as well as scripts in manifest, only 1 may be present")]
    ConflictingBackground,

    /// A background entry has the wrong JSON type.
    #[error("invalid background entry: {0}")]
    InvalidBackground(String),

    /// The background source is not valid UTF-8.
    #[error("background file is not valid UTF-8: {}", .0.display())]
    NotUtf8(PathBuf),

    /// Any other I/O failure from the host.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

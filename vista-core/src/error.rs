//! Error types for vista operations

use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Validation errors raised while constructing core values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Value for {field} is {length} characters long, limit is {limit}")]
    TooLong {
        field: String,
        length: usize,
        limit: usize,
    },
}

/// Configuration and host-wiring errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("No schema collaborator registered for factory {factory_id}")]
    NotRegistered { factory_id: Uuid },

    #[error("View cache not set for factory {factory_id}")]
    NotConfigured { factory_id: Uuid },
}

/// Errors produced while reading or decoding a persisted document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Malformed views document: {reason}")]
    Malformed { reason: String },

    #[error("Element <{element}> is missing attribute '{attribute}'")]
    MissingAttribute { element: String, attribute: String },

    #[error("The hash of the mapping cannot be null or empty string")]
    MissingFingerprint,

    #[error("Duplicate view for extent '{extent}'")]
    DuplicateExtent { extent: String },

    #[error("Duplicate mapping views for ({primary}, {secondary})")]
    DuplicateEntry { primary: String, secondary: String },
}

/// Backing store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("I/O error at {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Database error: {reason}")]
    Database { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Severity of a generation diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// One structured diagnostic reported by a generation collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: i32,
    pub message: String,
}

impl Diagnostic {
    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: i32, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.message)
    }
}

/// Generation failure, carried to the caller verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("View generation failed with {} diagnostic(s)", .diagnostics.len())]
pub struct GenerationError {
    pub diagnostics: Vec<Diagnostic>,
}

impl GenerationError {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }
}

/// Master error type for all vista errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VistaError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),
}

/// Result type alias for vista operations.
pub type VistaResult<T> = Result<T, VistaError>;

// =============================================================================
// TESTS
// =============================================================================

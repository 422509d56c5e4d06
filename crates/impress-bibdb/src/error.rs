//! Error types for impress-bibdb
//!
//! Parse errors are values attached to the entry they occurred in, so the
//! parser never aborts a whole stream. Collection-level and validation-time
//! failures have their own enums.

use thiserror::Error;

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, DatabaseError>;

/// A failure while reading one `@` block
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Unbalanced brace or unterminated quote inside a value
    #[error("line {line}: {message}")]
    Lexical { line: usize, message: String },

    /// Missing key, `=`, value, or closing delimiter
    #[error("line {line}: {message}")]
    Structural { line: usize, message: String },
}

impl ParseError {
    pub(crate) fn lexical(line: usize, message: impl Into<String>) -> Self {
        Self::Lexical {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn structural(line: usize, message: impl Into<String>) -> Self {
        Self::Structural {
            line,
            message: message.into(),
        }
    }

    /// 1-based source line the failure was detected on
    pub fn line(&self) -> usize {
        match self {
            Self::Lexical { line, .. } | Self::Structural { line, .. } => *line,
        }
    }

    /// Human-readable message without the line prefix
    pub fn message(&self) -> &str {
        match self {
            Self::Lexical { message, .. } | Self::Structural { message, .. } => message,
        }
    }
}

/// Brace-aware splitting failed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitError {
    #[error("unbalanced braces at byte {offset}")]
    Unbalanced { offset: usize },
}

/// Rejected field mutation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("value for field `{field}` has unbalanced braces")]
    UnbalancedBraces { field: String },

    #[error("invalid field name `{0}`")]
    InvalidName(String),

    #[error("pseudo-entries have no fields")]
    NoFields,
}

/// A mandatory-field check that did not pass
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown entry type `{0}`")]
    UnknownType(String),

    #[error("{entry_type} entry is missing mandatory field {fields}")]
    MissingMandatoryField { entry_type: String, fields: String },
}

/// Collection-level failures
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("duplicate key `{key}` at line {line}")]
    DuplicateKey { key: String, line: usize },

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration loading failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value: {0}")]
    Invalid(String),
}

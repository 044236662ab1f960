//! Error taxonomy for temporal operations
//!
//! Every failure is detected before the enclosing transaction commits, so an
//! error always leaves the previously committed timeline untouched.

use chrono::NaiveDate;
use thiserror::Error;

use crate::core::entity::EntityFamily;
use crate::core::identity::IdParseError;

pub type Result<T> = std::result::Result<T, TemporalError>;

/// Stable, machine-readable error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    TemporalPointConflict,
    ParentNotFound,
    RecordNotFound,
    DepthExceeded,
    ValidationError,
    TransactionFailed,
    TransactionCancelled,
    ConfigError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::TemporalPointConflict => "TEMPORAL_POINT_CONFLICT",
            ErrorCode::ParentNotFound => "PARENT_NOT_FOUND",
            ErrorCode::RecordNotFound => "RECORD_NOT_FOUND",
            ErrorCode::DepthExceeded => "DEPTH_EXCEEDED",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::TransactionFailed => "TRANSACTION_FAILED",
            ErrorCode::TransactionCancelled => "TRANSACTION_CANCELLED",
            ErrorCode::ConfigError => "CONFIG_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum TemporalError {
    #[error("{family} {code} already has a version effective {date}")]
    TemporalPointConflict {
        family: EntityFamily,
        code: String,
        date: NaiveDate,
    },

    #[error("parent {family} {code} has no current version")]
    ParentNotFound { family: EntityFamily, code: String },

    #[error("{0}")]
    RecordNotFound(String),

    #[error("parent {parent} is at level {level}; maximum depth is {max}")]
    DepthExceeded { parent: String, level: u32, max: u32 },

    #[error("{0}")]
    Validation(String),

    #[error("{code} cannot be placed under {parent}: it would create a cycle")]
    HierarchyCycle { code: String, parent: String },

    #[error("operation cancelled before commit: {0}")]
    Cancelled(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("stored payload could not be decoded: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TemporalError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TemporalError::TemporalPointConflict { .. } => ErrorCode::TemporalPointConflict,
            TemporalError::ParentNotFound { .. } => ErrorCode::ParentNotFound,
            TemporalError::RecordNotFound(_) => ErrorCode::RecordNotFound,
            TemporalError::DepthExceeded { .. } => ErrorCode::DepthExceeded,
            TemporalError::Validation(_) | TemporalError::HierarchyCycle { .. } => {
                ErrorCode::ValidationError
            }
            TemporalError::Cancelled(_) => ErrorCode::TransactionCancelled,
            TemporalError::Storage(_) | TemporalError::Payload(_) | TemporalError::Io(_) => {
                ErrorCode::TransactionFailed
            }
            TemporalError::Config(_) => ErrorCode::ConfigError,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        TemporalError::Validation(message.into())
    }
}

impl From<IdParseError> for TemporalError {
    fn from(err: IdParseError) -> Self {
        TemporalError::Validation(err.to_string())
    }
}

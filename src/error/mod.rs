//! Error handling for attic.
//!
//! This module provides:
//! - [`AtticError`]: The main error enum for all store operations
//! - [`ErrorCode`]: Standardized error codes for machine parsing
//! - [`StructuredError`]: Rich error type with suggestions and context

mod codes;

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use codes::ErrorCode;

use crate::adapter::Facet;
use crate::tx::ResourceKind;

/// Main error type for attic operations.
#[derive(Error, Debug)]
pub enum AtticError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Invalid deleted key: {0}")]
    InvalidDeletedKey(String),

    #[error("Unit '{unit}' requires a {required} context but its parent provides {provided}")]
    IncompatibleResourceType {
        unit: String,
        required: ResourceKind,
        provided: ResourceKind,
    },

    #[error("Unit of work '{0}' has already started")]
    AlreadyRunning(String),

    #[error("Invalid unit state: {0}")]
    InvalidState(String),

    #[error("Transaction '{label}' failed: {source}")]
    TransactionFailed {
        label: String,
        #[source]
        source: Box<AtticError>,
        rollback_failures: usize,
    },

    #[error("Rollback of '{unit}' failed: {reason}")]
    RollbackFailed { unit: String, reason: String },

    #[error(
        "Partial composite failure: committed [{}], failed [{}], pending [{}]: {source}",
        facet_list(.committed),
        facet_list(.failed),
        facet_list(.pending)
    )]
    PartialCompositeFailure {
        committed: Vec<Facet>,
        failed: Vec<Facet>,
        pending: Vec<Facet>,
        #[source]
        source: Box<AtticError>,
    },

    #[error("No transaction provider registered for {0}")]
    ProviderMissing(ResourceKind),

    #[error("Stored data is inconsistent: {0}")]
    StorageCorrupted(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing required config: {0}")]
    MissingConfig(String),

    #[error("Lock acquisition timed out: {0}")]
    LockTimeout(String),

    #[error("Lock failed: {0}")]
    LockFailed(String),
}

fn facet_list(facets: &[Facet]) -> String {
    facets
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl AtticError {
    /// Get the error code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Io(_) => ErrorCode::StorageIo,
            Self::Json(_) | Self::Serialization(_) => ErrorCode::SerializationError,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::InvalidReference(_) => ErrorCode::InvalidReference,
            Self::InvalidDeletedKey(_) => ErrorCode::InvalidDeletedKey,
            Self::IncompatibleResourceType { .. } => ErrorCode::IncompatibleResourceType,
            Self::AlreadyRunning(_) => ErrorCode::AlreadyRunning,
            Self::InvalidState(_) => ErrorCode::InvalidState,
            Self::TransactionFailed { .. } => ErrorCode::TransactionFailed,
            Self::RollbackFailed { .. } => ErrorCode::RollbackFailed,
            Self::PartialCompositeFailure { .. } => ErrorCode::PartialCompositeFailure,
            Self::ProviderMissing(_) => ErrorCode::ProviderMissing,
            Self::StorageCorrupted(_) => ErrorCode::StorageCorrupted,
            Self::Config(_) => ErrorCode::ConfigInvalid,
            Self::MissingConfig(_) => ErrorCode::ConfigMissingRequired,
            Self::LockTimeout(_) => ErrorCode::LockTimeout,
            Self::LockFailed(_) => ErrorCode::LockFailed,
        }
    }

    /// Get context information for this error as JSON.
    #[must_use]
    pub fn context(&self) -> Option<Value> {
        match self {
            Self::IncompatibleResourceType {
                unit,
                required,
                provided,
            } => Some(serde_json::json!({
                "unit": unit,
                "required": required,
                "provided": provided,
            })),
            Self::TransactionFailed {
                label,
                source,
                rollback_failures,
            } => Some(serde_json::json!({
                "label": label,
                "cause_code": source.root_cause().code(),
                "rollback_failures": rollback_failures,
            })),
            Self::PartialCompositeFailure {
                committed,
                failed,
                pending,
                source,
            } => Some(serde_json::json!({
                "committed": committed,
                "failed": failed,
                "pending": pending,
                "cause_code": source.root_cause().code(),
            })),
            Self::MissingConfig(key) => Some(serde_json::json!({ "config_key": key })),
            _ => None,
        }
    }

    /// Follow transaction wrappers down to the error that started the failure.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::TransactionFailed { source, .. } | Self::PartialCompositeFailure { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }

    /// True when the underlying failure was a missing object.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self.root_cause(), Self::NotFound(_))
    }

    /// Convert this error to a structured error.
    #[must_use]
    pub fn to_structured(&self) -> StructuredError {
        StructuredError::from_attic_error(self)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AtticError>;

/// A structured error with machine-readable code, suggestion, and context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// The error code (e.g., "NOT_FOUND")
    pub code: ErrorCode,

    /// The numeric error code (e.g., 101)
    pub numeric_code: u16,

    /// Human-readable error message
    pub message: String,

    /// Actionable suggestion for recovery
    pub suggestion: String,

    /// Additional context for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// Whether this error is potentially recoverable by the user
    pub recoverable: bool,

    /// Error category (e.g., "attachment", "config", "storage")
    pub category: String,
}

impl StructuredError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            numeric_code: code.numeric(),
            suggestion: code.suggestion().to_string(),
            context: None,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn from_attic_error(err: &AtticError) -> Self {
        Self {
            context: err.context(),
            ..Self::new(err.code(), err.to_string())
        }
    }

    /// Set a custom suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = suggestion.into();
        self
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<AtticError> for StructuredError {
    fn from(err: AtticError) -> Self {
        Self::from_attic_error(&err)
    }
}

impl From<&AtticError> for StructuredError {
    fn from(err: &AtticError) -> Self {
        Self::from_attic_error(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_error_from_not_found() {
        let err = AtticError::NotFound("docA/file.txt".to_string());
        let structured = err.to_structured();

        assert_eq!(structured.code, ErrorCode::NotFound);
        assert_eq!(structured.numeric_code, 101);
        assert!(structured.recoverable);
        assert_eq!(structured.category, "attachment");
        assert!(structured.message.contains("docA/file.txt"));
    }

    #[test]
    fn test_root_cause_unwraps_transaction_layers() {
        let err = AtticError::PartialCompositeFailure {
            committed: vec![Facet::Metadata],
            failed: vec![Facet::Content],
            pending: vec![],
            source: Box::new(AtticError::TransactionFailed {
                label: "save".to_string(),
                source: Box::new(AtticError::NotFound("x".to_string())),
                rollback_failures: 0,
            }),
        };

        assert!(err.is_not_found());
        assert_eq!(err.code(), ErrorCode::PartialCompositeFailure);

        let context = err.context().unwrap();
        assert_eq!(context["committed"][0], "metadata");
        assert_eq!(context["cause_code"], "NOT_FOUND");
    }

    #[test]
    fn test_partial_failure_message_lists_facets() {
        let err = AtticError::PartialCompositeFailure {
            committed: vec![Facet::Metadata, Facet::Content],
            failed: vec![Facet::Archive],
            pending: vec![Facet::Container],
            source: Box::new(AtticError::LockTimeout("held".to_string())),
        };
        let message = err.to_string();

        assert!(message.contains("committed [metadata, content]"));
        assert!(message.contains("failed [archive]"));
        assert!(message.contains("pending [container]"));
    }

    #[test]
    fn test_incompatible_context() {
        let err = AtticError::IncompatibleResourceType {
            unit: "save meta".to_string(),
            required: ResourceKind::Sqlite,
            provided: ResourceKind::Filesystem,
        };
        let context = err.context().unwrap();

        assert_eq!(context["required"], "sqlite");
        assert_eq!(context["provided"], "filesystem");
    }
}

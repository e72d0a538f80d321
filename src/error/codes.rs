//! Standardized error codes for machine-parseable output.
//!
//! Error codes follow a numeric taxonomy:
//! - 1xx: Attachment and reference errors
//! - 2xx: Unit-of-work errors
//! - 3xx: Config errors
//! - 4xx: Composition errors
//! - 6xx: Storage errors
//! - 8xx: Lock errors
//! - 9xx: Internal errors

use serde::{Deserialize, Serialize};

/// Standardized error codes for `--json` output.
///
/// Each variant maps to a numeric code (e.g., `NotFound` -> E101).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================
    // Attachment errors (1xx)
    // ========================================
    /// E101: Referenced attachment or deleted record does not exist
    NotFound,
    /// E102: Document or file name cannot be used as a reference
    InvalidReference,
    /// E103: A deleted-record key could not be parsed
    InvalidDeletedKey,

    // ========================================
    // Unit-of-work errors (2xx)
    // ========================================
    /// E201: Work requires a resource the parent does not provide
    IncompatibleResourceType,
    /// E202: Tree mutated or restarted after it began running
    AlreadyRunning,
    /// E203: Unit used in a state that does not allow it
    InvalidState,
    /// E204: A transaction failed and was rolled back
    TransactionFailed,
    /// E205: A compensation failed during rollback
    RollbackFailed,

    // ========================================
    // Config errors (3xx)
    // ========================================
    /// E301: Config file does not exist
    ConfigNotFound,
    /// E302: Config file or value is malformed
    ConfigInvalid,
    /// E303: A required setting or collaborator is missing
    ConfigMissingRequired,

    // ========================================
    // Composition errors (4xx)
    // ========================================
    /// E401: Degraded composition committed some groups before one failed
    PartialCompositeFailure,
    /// E402: No provider registered for a resource kind
    ProviderMissing,

    // ========================================
    // Storage errors (6xx)
    // ========================================
    /// E601: Filesystem operation failed
    StorageIo,
    /// E602: Database operation failed
    DatabaseError,
    /// E603: Serialized data could not be encoded or decoded
    SerializationError,
    /// E604: Stored data does not match what the store expects
    StorageCorrupted,

    // ========================================
    // Lock errors (8xx)
    // ========================================
    /// E851: Timed out waiting for the store lock
    LockTimeout,
    /// E852: Store lock could not be taken
    LockFailed,

    // ========================================
    // Internal errors (9xx)
    // ========================================
    /// E901: Unexpected internal error
    InternalError,
}

impl ErrorCode {
    /// Get the numeric error code (e.g., `NotFound` -> 101).
    #[must_use]
    pub const fn numeric(&self) -> u16 {
        match self {
            Self::NotFound => 101,
            Self::InvalidReference => 102,
            Self::InvalidDeletedKey => 103,

            Self::IncompatibleResourceType => 201,
            Self::AlreadyRunning => 202,
            Self::InvalidState => 203,
            Self::TransactionFailed => 204,
            Self::RollbackFailed => 205,

            Self::ConfigNotFound => 301,
            Self::ConfigInvalid => 302,
            Self::ConfigMissingRequired => 303,

            Self::PartialCompositeFailure => 401,
            Self::ProviderMissing => 402,

            Self::StorageIo => 601,
            Self::DatabaseError => 602,
            Self::SerializationError => 603,
            Self::StorageCorrupted => 604,

            Self::LockTimeout => 851,
            Self::LockFailed => 852,

            Self::InternalError => 901,
        }
    }

    /// Get the error code as a formatted string (e.g., "E101").
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("E{}", self.numeric())
    }

    /// Get the default suggestion for this error code.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::NotFound => "Check the document and file name. Run `attic trash <ref>` to look for deleted records",
            Self::InvalidReference => "References look like <document>/<file>; names may not be empty, `.` or `..`",
            Self::InvalidDeletedKey => "Deleted keys look like <document>/<file>@<millis>, as printed by `attic trash`",

            Self::IncompatibleResourceType => "Work was attached under a transaction of a different resource kind",
            Self::AlreadyRunning => "Build the whole unit-of-work tree before starting it",
            Self::InvalidState => "A unit of work can only be attached and run once",
            Self::TransactionFailed => "The operation was rolled back. Check error details and retry",
            Self::RollbackFailed => "A compensation step failed. Inspect the storage root for leftover files",

            Self::ConfigNotFound => "Create an attic.toml or pass --config <path>",
            Self::ConfigInvalid => "Check TOML syntax and value types in the config file",
            Self::ConfigMissingRequired => "Set the missing value in attic.toml or through an ATTIC_* variable",

            Self::PartialCompositeFailure => "Stores are not sharing a transaction. Compare the committed facets with the failed ones and repair by hand",
            Self::ProviderMissing => "Configure a backend for every resource kind the stores require",

            Self::StorageIo => "Check that the storage root exists and is writable",
            Self::DatabaseError => "Check the database file. It may be locked by another process",
            Self::SerializationError => "The stored data format may be corrupted or from a newer version",
            Self::StorageCorrupted => "Stored records disagree with each other. Inspect the attachment directory",

            Self::LockTimeout => "Another process may be holding the store lock. Wait and retry, or check for stale locks",
            Self::LockFailed => "Failed to acquire the store lock. Check permissions on the storage root",

            Self::InternalError => "An unexpected error occurred. Please report this issue with full error output",
        }
    }

    /// Check if this error is potentially recoverable by the user.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::NotFound
            | Self::InvalidReference
            | Self::InvalidDeletedKey
            | Self::TransactionFailed
            | Self::ConfigNotFound
            | Self::ConfigInvalid
            | Self::ConfigMissingRequired
            | Self::ProviderMissing
            | Self::StorageIo
            | Self::DatabaseError
            | Self::LockTimeout
            | Self::LockFailed => true,

            Self::IncompatibleResourceType
            | Self::AlreadyRunning
            | Self::InvalidState
            | Self::RollbackFailed
            | Self::PartialCompositeFailure
            | Self::SerializationError
            | Self::StorageCorrupted
            | Self::InternalError => false,
        }
    }

    /// Get the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self.numeric() / 100 {
            1 => "attachment",
            2 => "transaction",
            3 => "config",
            4 => "composition",
            6 => "storage",
            8 => "lock",
            9 => "internal",
            _ => "unknown",
        }
    }

    /// Iterate over all error codes.
    pub fn all() -> impl Iterator<Item = Self> {
        [
            Self::NotFound,
            Self::InvalidReference,
            Self::InvalidDeletedKey,
            Self::IncompatibleResourceType,
            Self::AlreadyRunning,
            Self::InvalidState,
            Self::TransactionFailed,
            Self::RollbackFailed,
            Self::ConfigNotFound,
            Self::ConfigInvalid,
            Self::ConfigMissingRequired,
            Self::PartialCompositeFailure,
            Self::ProviderMissing,
            Self::StorageIo,
            Self::DatabaseError,
            Self::SerializationError,
            Self::StorageCorrupted,
            Self::LockTimeout,
            Self::LockFailed,
            Self::InternalError,
        ]
        .into_iter()
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code_string())
    }
}

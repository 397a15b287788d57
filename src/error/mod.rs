//! Error types for `quarry`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Supports `anyhow` integration for callers layering extra context
//! - Storage failures are wrapped with context rather than retried;
//!   transactionality is the caller's concern

use thiserror::Error;

/// Primary error type for `quarry` operations.
#[derive(Error, Debug)]
pub enum DomainError {
    // === Invalid arguments ===
    /// A project id that does not resolve to a known project.
    #[error("Invalid project id '{id}'")]
    UnknownProject { id: i64 },

    /// A project key that does not resolve to a known project.
    #[error("Invalid project key '{key}'")]
    UnknownProjectKey { key: String },

    /// A security level id that does not resolve to a known level.
    #[error("Invalid security level id '{id}'")]
    UnknownSecurityLevel { id: i64 },

    /// An issue key that does not match `PROJECT-NUMBER`.
    #[error("Invalid issue key format: {key}")]
    InvalidKey { key: String },

    /// A parent issue must already be persisted before it can be linked.
    #[error("Parent issue has no id; persist it before linking subtasks")]
    UnpersistedParent,

    // === State errors ===
    /// Raw field access on an issue that has no backing record yet.
    #[error("Cannot read field '{field}': issue has not been persisted")]
    NotPersisted { field: String },

    /// A field exists but does not carry the requested value shape.
    #[error("Field '{field}' does not hold a {expected} value")]
    FieldNotApplicable {
        field: String,
        expected: &'static str,
    },

    // === Unsupported operations ===
    /// Mutation attempted on a synthetic text constant.
    #[error("Text constants are read-only; cannot set {field}")]
    ReadOnlyConstant { field: &'static str },

    // === Data access ===
    /// Underlying store operation failed, wrapped with context.
    #[error("{context}: {source}")]
    DataAccess {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// `SQLite` database error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Index document decode failure.
    #[error("Cannot decode index field '{field}': {reason}")]
    IndexDecode { field: String, reason: String },

    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Wrapped anyhow error for callers layering their own context.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Broad classification of a [`DomainError`].
///
/// Callers route on the class rather than matching every variant: bad
/// input goes back to the user, state errors indicate a caller bug, data
/// access failures bubble to the transaction boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    InvalidArgument,
    State,
    Unsupported,
    DataAccess,
}

impl DomainError {
    /// Classify this error for routing.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownProject { .. }
            | Self::UnknownProjectKey { .. }
            | Self::UnknownSecurityLevel { .. }
            | Self::InvalidKey { .. }
            | Self::UnpersistedParent => ErrorClass::InvalidArgument,
            Self::NotPersisted { .. } | Self::FieldNotApplicable { .. } => ErrorClass::State,
            Self::ReadOnlyConstant { .. } => ErrorClass::Unsupported,
            Self::DataAccess { .. }
            | Self::Database(_)
            | Self::IndexDecode { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::Yaml(_)
            | Self::Other(_) => ErrorClass::DataAccess,
        }
    }

    /// Wrap a lower-level persistence failure with context.
    #[must_use]
    pub fn data_access(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::DataAccess {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// State error for raw field access on an unbound issue.
    #[must_use]
    pub fn not_persisted(field: impl Into<String>) -> Self {
        Self::NotPersisted {
            field: field.into(),
        }
    }
}

/// Result type using `DomainError`.
pub type Result<T> = std::result::Result<T, DomainError>;

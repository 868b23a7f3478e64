//! Application error types for DevStudio
//!
//! Provides a unified error model across the process boundary with:
//! - Stable error codes for frontend handling
//! - User-friendly messages
//! - Optional internal details for logging
//! - Retry hints for UI

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error categories for grouping and UI display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Input validation errors (bad paths, invalid format)
    Validation,
    /// Security-related errors (keychain, secret decryption)
    Security,
    /// File I/O errors (read, write, disk space)
    Io,
    /// Internal errors (unexpected state, bugs)
    Internal,
    /// Resource not found
    NotFound,
    /// Database errors
    Database,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Security => write!(f, "security"),
            Self::Io => write!(f, "io"),
            Self::Internal => write!(f, "internal"),
            Self::NotFound => write!(f, "not_found"),
            Self::Database => write!(f, "database"),
        }
    }
}

/// Stable error codes for frontend handling
/// Format: CATEGORY_SPECIFIC_ERROR
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCode(pub String);

impl ErrorCode {
    // Validation errors
    pub const VALIDATION_INVALID_PATH: &'static str = "VALIDATION_INVALID_PATH";
    pub const VALIDATION_PATH_TRAVERSAL: &'static str = "VALIDATION_PATH_TRAVERSAL";
    pub const VALIDATION_SENSITIVE_PATH: &'static str = "VALIDATION_SENSITIVE_PATH";
    pub const VALIDATION_EMPTY_INPUT: &'static str = "VALIDATION_EMPTY_INPUT";
    pub const VALIDATION_INPUT_TOO_LARGE: &'static str = "VALIDATION_INPUT_TOO_LARGE";
    pub const VALIDATION_INVALID_FORMAT: &'static str = "VALIDATION_INVALID_FORMAT";

    // Security errors
    pub const SECURITY_KEYCHAIN_UNAVAILABLE: &'static str = "SECURITY_KEYCHAIN_UNAVAILABLE";
    pub const SECURITY_ENCRYPTION_FAILED: &'static str = "SECURITY_ENCRYPTION_FAILED";
    pub const SECURITY_DECRYPTION_FAILED: &'static str = "SECURITY_DECRYPTION_FAILED";

    // I/O errors
    pub const IO_FILE_NOT_FOUND: &'static str = "IO_FILE_NOT_FOUND";
    pub const IO_PERMISSION_DENIED: &'static str = "IO_PERMISSION_DENIED";
    pub const IO_READ_ERROR: &'static str = "IO_READ_ERROR";
    pub const IO_WRITE_ERROR: &'static str = "IO_WRITE_ERROR";

    // Database errors
    pub const DB_NOT_INITIALIZED: &'static str = "DB_NOT_INITIALIZED";
    pub const DB_QUERY_FAILED: &'static str = "DB_QUERY_FAILED";
    pub const DB_MIGRATION_FAILED: &'static str = "DB_MIGRATION_FAILED";
    pub const DB_INTEGRITY_ERROR: &'static str = "DB_INTEGRITY_ERROR";
    pub const DB_CONFLICT: &'static str = "DB_CONFLICT";

    // Not found errors
    pub const NOT_FOUND_PROJECT: &'static str = "NOT_FOUND_PROJECT";
    pub const NOT_FOUND_FEATURE: &'static str = "NOT_FOUND_FEATURE";
    pub const NOT_FOUND_DOCUMENT: &'static str = "NOT_FOUND_DOCUMENT";

    // Internal errors
    pub const INTERNAL_ERROR: &'static str = "INTERNAL_ERROR";
    pub const INTERNAL_LOCK_FAILED: &'static str = "INTERNAL_LOCK_FAILED";

    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Application error type for all boundary operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppError {
    /// Stable error code for frontend handling
    pub code: String,
    /// User-friendly error message
    pub message: String,
    /// Optional internal details for logging (not shown to user)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Whether the operation can be retried
    pub retryable: bool,
    /// Error category for grouping
    pub category: ErrorCategory,
}

impl AppError {
    /// Create a new application error
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        category: ErrorCategory,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            detail: None,
            retryable: false,
            category,
        }
    }

    /// Add internal detail for logging
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Mark as retryable
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    // =========================================================================
    // Convenience constructors for common errors
    // =========================================================================

    /// Validation error: invalid path
    pub fn invalid_path(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::VALIDATION_INVALID_PATH,
            message,
            ErrorCategory::Validation,
        )
    }

    /// Validation error: path traversal attempt
    pub fn path_traversal() -> Self {
        Self::new(
            ErrorCode::VALIDATION_PATH_TRAVERSAL,
            "Path must be within an allowed directory",
            ErrorCategory::Validation,
        )
    }

    /// Validation error: sensitive path blocked
    pub fn sensitive_path() -> Self {
        Self::new(
            ErrorCode::VALIDATION_SENSITIVE_PATH,
            "This directory contains sensitive data and cannot be used",
            ErrorCategory::Validation,
        )
    }

    /// Validation error: empty input
    pub fn empty_input(field: &str) -> Self {
        Self::new(
            ErrorCode::VALIDATION_EMPTY_INPUT,
            format!("{} cannot be empty", field),
            ErrorCategory::Validation,
        )
    }

    /// Validation error: invalid format
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::VALIDATION_INVALID_FORMAT,
            message,
            ErrorCategory::Validation,
        )
    }

    /// Database error: not initialized
    pub fn db_not_initialized() -> Self {
        Self::new(
            ErrorCode::DB_NOT_INITIALIZED,
            "Database not initialized",
            ErrorCategory::Database,
        )
    }

    /// Database error: query failed
    pub fn db_query_failed(detail: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::DB_QUERY_FAILED,
            "Database operation failed",
            ErrorCategory::Database,
        )
        .with_detail(detail)
    }

    /// Database error: schema migration failed
    pub fn db_migration_failed(detail: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::DB_MIGRATION_FAILED,
            "Database schema upgrade failed",
            ErrorCategory::Database,
        )
        .with_detail(detail)
    }

    /// Database error: conflicting record
    pub fn db_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DB_CONFLICT, message, ErrorCategory::Database)
    }

    /// Not found error: project
    pub fn project_not_found(id: i64) -> Self {
        Self::new(
            ErrorCode::NOT_FOUND_PROJECT,
            format!("Project not found: {}", id),
            ErrorCategory::NotFound,
        )
    }

    /// Not found error: feature
    pub fn feature_not_found(id: i64) -> Self {
        Self::new(
            ErrorCode::NOT_FOUND_FEATURE,
            format!("Feature not found: {}", id),
            ErrorCategory::NotFound,
        )
    }

    /// Not found error: document
    pub fn document_not_found(id: i64) -> Self {
        Self::new(
            ErrorCode::NOT_FOUND_DOCUMENT,
            format!("Document not found: {}", id),
            ErrorCategory::NotFound,
        )
    }

    /// I/O error: file not found
    pub fn file_not_found(path: &str) -> Self {
        Self::new(
            ErrorCode::IO_FILE_NOT_FOUND,
            format!("File not found: {}", path),
            ErrorCategory::Io,
        )
    }

    /// Internal error
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::INTERNAL_ERROR,
            "An internal error occurred",
            ErrorCategory::Internal,
        )
        .with_detail(detail)
    }

    /// Lock error
    pub fn lock_failed(what: &str) -> Self {
        Self::new(
            ErrorCode::INTERNAL_LOCK_FAILED,
            format!("Failed to acquire lock on {}", what),
            ErrorCategory::Internal,
        )
        .retryable()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

// Convert from common error types
impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        Self::db_query_failed(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => Self::new(
                ErrorCode::IO_FILE_NOT_FOUND,
                "File or directory not found",
                ErrorCategory::Io,
            )
            .with_detail(e.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::new(
                ErrorCode::IO_PERMISSION_DENIED,
                "Permission denied",
                ErrorCategory::Io,
            )
            .with_detail(e.to_string()),
            _ => Self::new(ErrorCode::IO_READ_ERROR, "I/O error", ErrorCategory::Io)
                .with_detail(e.to_string()),
        }
    }
}

impl From<crate::db::DbError> for AppError {
    fn from(e: crate::db::DbError) -> Self {
        use crate::db::DbError;
        match &e {
            DbError::NotInitialized => Self::db_not_initialized(),
            DbError::Corruption => Self::new(
                ErrorCode::DB_INTEGRITY_ERROR,
                "Database file is corrupted",
                ErrorCategory::Database,
            ),
            DbError::MigrationFailed { .. }
            | DbError::DuplicateVersion(_)
            | DbError::Initialize(_) => Self::db_migration_failed(e.to_string()),
            DbError::Conflict(msg) => Self::db_conflict(msg.clone()),
            _ => Self::db_query_failed(e.to_string()),
        }
    }
}

impl From<crate::validation::ValidationError> for AppError {
    fn from(e: crate::validation::ValidationError) -> Self {
        use crate::validation::ValidationError;
        match e {
            ValidationError::PathTraversal => Self::path_traversal(),
            ValidationError::SensitivePath => Self::sensitive_path(),
            ValidationError::PathNotFound(p) => Self::invalid_path(format!("Path not found: {}", p)),
            ValidationError::InputTooLarge { size, max } => Self::new(
                ErrorCode::VALIDATION_INPUT_TOO_LARGE,
                format!("Input too large: {} bytes (max: {} bytes)", size, max),
                ErrorCategory::Validation,
            ),
            ValidationError::InvalidFormat(msg) => Self::invalid_format(msg),
            ValidationError::EmptyInput => Self::empty_input("Input"),
        }
    }
}

impl From<crate::secrets::SecretsError> for AppError {
    fn from(e: crate::secrets::SecretsError) -> Self {
        use crate::secrets::SecretsError;
        match &e {
            SecretsError::Decryption(msg) => Self::new(
                ErrorCode::SECURITY_DECRYPTION_FAILED,
                "Failed to decrypt stored secret",
                ErrorCategory::Security,
            )
            .with_detail(msg.clone()),
            SecretsError::KeychainUnavailable => Self::new(
                ErrorCode::SECURITY_KEYCHAIN_UNAVAILABLE,
                "System keychain is not available",
                ErrorCategory::Security,
            ),
            _ => Self::new(
                ErrorCode::SECURITY_ENCRYPTION_FAILED,
                "Secret storage failed",
                ErrorCategory::Security,
            )
            .with_detail(e.to_string()),
        }
    }
}

impl From<crate::files::FilesError> for AppError {
    fn from(e: crate::files::FilesError) -> Self {
        use crate::files::FilesError;
        match e {
            FilesError::Validation(v) => v.into(),
            FilesError::Io(io) => io.into(),
            other => Self::new(ErrorCode::IO_READ_ERROR, "I/O error", ErrorCategory::Io)
                .with_detail(other.to_string()),
        }
    }
}

//! Error types for the domain layer.
//!
//! Every command failure maps to one of five domain categories (validation,
//! not-found, conflict, permission, state) or to an infrastructure failure.
//! Infrastructure failures are the only retryable kind: the command was
//! rejected by storage, not by the domain, so replaying it may succeed.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' must be greater than {min}, got {actual}")]
    NotPositive {
        field: String,
        min: f64,
        actual: f64,
    },

    #[error("Field '{field}' has invalid value: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField {
            field: field.into(),
        }
    }

    /// Creates a not-positive validation error.
    pub fn not_positive(field: impl Into<String>, min: f64, actual: f64) -> Self {
        ValidationError::NotPositive {
            field: field.into(),
            min,
            actual,
        }
    }

    /// Creates an invalid value validation error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Error codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    ValidationFailed,

    // Not found errors
    GroupNotFound,
    RequestNotFound,
    MemberNotFound,

    // Conflict errors
    AlreadyMember,
    DuplicatePendingRequest,
    GroupFull,
    RecentlyRejected,
    JoinBanned,
    VersionConflict,

    // Permission errors
    PermissionDenied,

    // State errors
    RequestAlreadyProcessed,
    NoMembers,
    RecipientMismatch,

    // Infrastructure errors
    StorageError,
}

impl ErrorCode {
    /// Whether errors with this code are worth retrying.
    ///
    /// Domain rejections are final; storage failures and lost optimistic
    /// writes are transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::StorageError | ErrorCode::VersionConflict)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::GroupNotFound => "GROUP_NOT_FOUND",
            ErrorCode::RequestNotFound => "REQUEST_NOT_FOUND",
            ErrorCode::MemberNotFound => "MEMBER_NOT_FOUND",
            ErrorCode::AlreadyMember => "ALREADY_MEMBER",
            ErrorCode::DuplicatePendingRequest => "DUPLICATE_PENDING_REQUEST",
            ErrorCode::GroupFull => "GROUP_FULL",
            ErrorCode::RecentlyRejected => "RECENTLY_REJECTED",
            ErrorCode::JoinBanned => "JOIN_BANNED",
            ErrorCode::VersionConflict => "VERSION_CONFLICT",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::RequestAlreadyProcessed => "REQUEST_ALREADY_PROCESSED",
            ErrorCode::NoMembers => "NO_MEMBERS",
            ErrorCode::RecipientMismatch => "RECIPIENT_MISMATCH",
            ErrorCode::StorageError => "STORAGE_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Standard domain error with code, message, and optional details.
#[derive(Debug, Clone)]
pub struct GroupError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl GroupError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Creates a validation error for a specific field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message).with_detail("field", field)
    }

    /// Creates a group-not-found error.
    pub fn group_not_found(group_id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::GroupNotFound,
            format!("Group '{}' not found", group_id),
        )
    }

    /// Creates a storage-layer error, surfaced to callers as retryable.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Whether this error is worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for GroupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for GroupError {}

impl From<ValidationError> for GroupError {
    fn from(err: ValidationError) -> Self {
        GroupError::new(ErrorCode::ValidationFailed, err.to_string())
    }
}

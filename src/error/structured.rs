//! Structured error output for scripted callers.
//!
//! Provides machine-parseable error information with:
//! - Error codes for categorization
//! - Hints for self-correction
//! - Retryability flags
//! - Context for debugging

use crate::error::MetaError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Machine-readable error codes.
///
/// These codes are stable and can be used for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // === Database Errors (exit code 2) ===
    DatabaseError,
    DatabaseLocked,
    NotInitialized,
    AlreadyInitialized,

    // === Lookup Errors (exit code 3) ===
    ItemNotFound,
    LabelNotFound,
    UserNotFound,
    ContainerNotFound,
    WatchNotFound,

    // === Validation Errors (exit code 4) ===
    ValidationFailed,
    InvalidPosition,

    // === Pin Errors (exit code 5) ===
    PinLimitReached,

    // === Access Errors (exit code 6) ===
    PermissionDenied,

    // === Config Errors (exit code 7) ===
    ConfigError,

    // === I/O Errors (exit code 8) ===
    IoError,
    JsonError,
    YamlError,

    // === Internal Errors (exit code 1) ===
    InternalError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DatabaseError => "DATABASE_ERROR",
            Self::DatabaseLocked => "DATABASE_LOCKED",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::ItemNotFound => "ITEM_NOT_FOUND",
            Self::LabelNotFound => "LABEL_NOT_FOUND",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::ContainerNotFound => "CONTAINER_NOT_FOUND",
            Self::WatchNotFound => "WATCH_NOT_FOUND",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::InvalidPosition => "INVALID_POSITION",
            Self::PinLimitReached => "PIN_LIMIT_REACHED",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::YamlError => "YAML_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether this error is potentially retryable.
    ///
    /// Retryable means the caller might succeed after waiting (lock) or
    /// after fixing its input.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DatabaseLocked | Self::ValidationFailed | Self::InvalidPosition
        )
    }

    /// Get the exit code for this error category.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::DatabaseError
            | Self::DatabaseLocked
            | Self::NotInitialized
            | Self::AlreadyInitialized => 2,
            Self::ItemNotFound
            | Self::LabelNotFound
            | Self::UserNotFound
            | Self::ContainerNotFound
            | Self::WatchNotFound => 3,
            Self::ValidationFailed | Self::InvalidPosition => 4,
            Self::PinLimitReached => 5,
            Self::PermissionDenied => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError | Self::YamlError => 8,
            Self::InternalError => 1,
        }
    }
}

/// Structured error for machine-parseable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional hint for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether the operation can be retried
    pub retryable: bool,
    /// Additional context data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl StructuredError {
    /// Create a new structured error from a `MetaError`.
    #[must_use]
    pub fn from_error(err: &MetaError) -> Self {
        let (code, context) = Self::extract_code_and_context(err);
        let hint = err.suggestion().map(str::to_string);

        Self {
            code,
            message: err.to_string(),
            hint,
            retryable: code.is_retryable(),
            context,
        }
    }

    /// Serialize to JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "hint": self.hint,
                "retryable": self.retryable,
                "context": self.context,
            }
        })
    }

    /// Format for human-readable output.
    #[must_use]
    pub fn to_human(&self, color: bool) -> String {
        let mut output = String::new();

        if color {
            output.push_str("\x1b[31mError:\x1b[0m ");
        } else {
            output.push_str("Error: ");
        }

        output.push_str(&self.message);

        if let Some(hint) = &self.hint {
            output.push('\n');
            if color {
                output.push_str("\x1b[33mHint:\x1b[0m ");
            } else {
                output.push_str("Hint: ");
            }
            output.push_str(hint);
        }

        output
    }

    fn extract_code_and_context(err: &MetaError) -> (ErrorCode, Option<Value>) {
        match err {
            MetaError::NotFound { entity, id } => {
                let code = match *entity {
                    "Item" => ErrorCode::ItemNotFound,
                    "Label" => ErrorCode::LabelNotFound,
                    "User" => ErrorCode::UserNotFound,
                    "Container" => ErrorCode::ContainerNotFound,
                    _ => ErrorCode::WatchNotFound,
                };
                (code, Some(json!({ "entity": entity, "id": id })))
            }
            MetaError::CapacityExceeded {
                container_id,
                kind,
                max,
            } => (
                ErrorCode::PinLimitReached,
                Some(json!({ "container_id": container_id, "kind": kind, "max": max })),
            ),
            MetaError::InvalidPosition { position } => (
                ErrorCode::InvalidPosition,
                Some(json!({ "position": position })),
            ),
            MetaError::PermissionDenied { actor, item_id } => (
                ErrorCode::PermissionDenied,
                Some(json!({ "actor": actor, "item_id": item_id })),
            ),
            MetaError::NotInitialized => (ErrorCode::NotInitialized, None),
            MetaError::AlreadyInitialized { path } => (
                ErrorCode::AlreadyInitialized,
                Some(json!({ "path": path.display().to_string() })),
            ),
            MetaError::Database(inner) => {
                if matches!(
                    inner.sqlite_error_code(),
                    Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
                ) {
                    (ErrorCode::DatabaseLocked, None)
                } else {
                    (ErrorCode::DatabaseError, None)
                }
            }
            MetaError::Validation { field, reason } => (
                ErrorCode::ValidationFailed,
                Some(json!({ "field": field, "reason": reason })),
            ),
            MetaError::Config(_) => (ErrorCode::ConfigError, None),
            MetaError::Io(_) => (ErrorCode::IoError, None),
            MetaError::Json(_) => (ErrorCode::JsonError, None),
            MetaError::Yaml(_) => (ErrorCode::YamlError, None),
            MetaError::Other(_) => (ErrorCode::InternalError, None),
        }
    }
}

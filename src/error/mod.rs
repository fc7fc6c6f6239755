//! Error types and handling for `tracker_meta`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Supports `anyhow` integration through the `Other` variant
//! - Provides recovery hints for user-facing errors
//! - Provides structured JSON output for the CLI (`StructuredError`)
//!
//! Invalid label candidates during reconciliation are *not* errors: they are
//! dropped silently. Pin operations fail closed and roll back.

mod structured;

pub use structured::{ErrorCode, StructuredError};

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for `tracker_meta` operations.
#[derive(Error, Debug)]
pub enum MetaError {
    // === Lookup Errors ===
    /// An item, label, user, container or watch record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    // === Pin Errors ===
    /// The (container, kind) already holds the configured number of pins.
    #[error("Pin limit reached: container {container_id} already has {max} pinned {kind}s")]
    CapacityExceeded {
        container_id: i64,
        kind: String,
        max: i64,
    },

    /// Move target below the first rank.
    #[error("Invalid pin position: {position} (positions start at 1)")]
    InvalidPosition { position: i64 },

    // === Access Errors ===
    /// The actor may not write to the item.
    #[error("Permission denied: {actor} cannot modify item {item_id}")]
    PermissionDenied { actor: String, item_id: i64 },

    // === Storage Errors ===
    /// Workspace directory not found.
    #[error("Tracker not initialized: run 'tmeta init' first")]
    NotInitialized,

    /// Already initialized.
    #[error("Already initialized at '{path}'")]
    AlreadyInitialized { path: PathBuf },

    /// `SQLite` database error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    // === Validation Errors ===
    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    // === Configuration Errors ===
    /// Configuration file or value error.
    #[error("Configuration error: {0}")]
    Config(String),

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MetaError {
    /// Shorthand for a `NotFound` error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Create a validation error for a specific field.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Can the user fix this without code changes?
    #[must_use]
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotInitialized
                | Self::NotFound { .. }
                | Self::Validation { .. }
                | Self::InvalidPosition { .. }
                | Self::CapacityExceeded { .. }
        )
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run: tmeta init"),
            Self::AlreadyInitialized { .. } => Some("Use --force to reinitialize"),
            Self::CapacityExceeded { .. } => {
                Some("Unpin another item first or raise pins.max-per-container")
            }
            Self::InvalidPosition { .. } => Some("Use a position of 1 or greater"),
            Self::PermissionDenied { .. } => Some("Run as an active account with write access"),
            _ => None,
        }
    }
}

/// Result type using `MetaError`.
pub type Result<T> = std::result::Result<T, MetaError>;

//! Validation helpers for `tracker_meta`.
//!
//! These routines check user-supplied names before they reach storage and
//! return `MetaError::Validation` without touching the database.

use crate::error::{MetaError, Result};

/// Maximum label name length, in characters.
pub const MAX_LABEL_LEN: usize = 50;

/// Maximum length of account, container and item names, in characters.
pub const MAX_NAME_LEN: usize = 255;

/// Validates label names.
pub struct LabelValidator;

impl LabelValidator {
    /// Validate a label name for length and allowed characters.
    ///
    /// `/` is allowed anywhere; it only defines a scope when it is interior.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name is invalid.
    pub fn validate(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(MetaError::validation("label", "cannot be empty"));
        }

        if name.chars().count() > MAX_LABEL_LEN {
            return Err(MetaError::validation(
                "label",
                format!("exceeds {MAX_LABEL_LEN} characters"),
            ));
        }

        if name.chars().any(char::is_control) {
            return Err(MetaError::validation(
                "label",
                "contains control characters",
            ));
        }

        if name != name.trim() {
            return Err(MetaError::validation(
                "label",
                "leading or trailing whitespace",
            ));
        }

        Ok(())
    }
}

/// Validates account, container and item names.
pub struct NameValidator;

impl NameValidator {
    /// # Errors
    ///
    /// Returns a validation error naming `field` if the value is empty, too
    /// long, or contains control characters.
    pub fn validate(field: &str, value: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(MetaError::validation(field, "cannot be empty"));
        }
        if value.chars().count() > MAX_NAME_LEN {
            return Err(MetaError::validation(
                field,
                format!("exceeds {MAX_NAME_LEN} characters"),
            ));
        }
        if value.chars().any(char::is_control) {
            return Err(MetaError::validation(field, "contains control characters"));
        }
        Ok(())
    }
}

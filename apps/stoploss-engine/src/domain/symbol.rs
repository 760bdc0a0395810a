//! Symbol value object for exchange trading symbols.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Domain validation error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed domain validation.
    #[error("invalid {field}: {message}")]
    InvalidValue {
        /// Field name.
        field: String,
        /// Explanation.
        message: String,
    },
}

/// An exchange trading symbol (e.g. "RELIANCE", "TCS").
///
/// Normalized to uppercase on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a new Symbol.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_uppercase())
    }

    /// Get the symbol string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Validate the symbol for use in quotes and orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the symbol is empty or contains characters outside
    /// the alphanumeric/`-`/`&` set exchanges use.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.0.is_empty() {
            return Err(DomainError::InvalidValue {
                field: "symbol".to_string(),
                message: "symbol cannot be empty".to_string(),
            });
        }

        if !self
            .0
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '&')
        {
            return Err(DomainError::InvalidValue {
                field: "symbol".to_string(),
                message: "symbol contains invalid characters".to_string(),
            });
        }

        Ok(())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

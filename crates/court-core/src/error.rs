//! # Error Types
//!
//! Errors raised by the foundational types. Higher layers wrap
//! [`CoreError`] with `#[from]` so configuration and arithmetic failures
//! carry their context all the way to the caller.

use thiserror::Error;

/// Errors arising from core primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A configuration field failed validation.
    #[error("invalid configuration: {field} {reason}")]
    InvalidConfig {
        /// Dotted path of the offending field (e.g. `terms.commit_terms`).
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Token arithmetic exceeded the representable range.
    #[error("amount overflow during {operation}")]
    AmountOverflow {
        /// The arithmetic operation that overflowed.
        operation: &'static str,
    },

    /// Division by a zero denominator in pro-rata arithmetic.
    #[error("division by zero during {operation}")]
    DivisionByZero {
        /// The arithmetic operation that was attempted.
        operation: &'static str,
    },

    /// Timestamp could not be parsed or constructed.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Account identifier was rejected at construction.
    #[error("invalid account identifier {value:?}: {reason}")]
    InvalidAccount {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

impl CoreError {
    /// Shorthand for building an [`CoreError::InvalidConfig`].
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

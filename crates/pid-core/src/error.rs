//! # Core Error Types
//!
//! Structured errors for the shared data model. Uses `thiserror` for
//! ergonomic error definitions with diagnostic context.

use thiserror::Error;

/// Errors from constructing or converting core data-model values.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A calendar date string did not parse as ISO `YYYY-MM-DD`.
    #[error("invalid calendar date {0:?}: expected ISO YYYY-MM-DD")]
    InvalidDate(String),

    /// A validity window violated `issuance <= expiry`.
    #[error("invalid validity window: issuance {issuance} is after expiry {expiry}")]
    InvalidValidityWindow {
        /// The offending issuance date.
        issuance: chrono::NaiveDate,
        /// The offending expiry date.
        expiry: chrono::NaiveDate,
    },

    /// An element value could not be converted to the requested type.
    #[error("element value is not a {expected}: {value}")]
    WrongValueType {
        /// The type the caller asked for.
        expected: &'static str,
        /// Display form of the actual value.
        value: String,
    },
}

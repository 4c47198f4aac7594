//! # SD-JWT Error Types
//!
//! Structured errors for SD-JWT construction and disclosure verification.

use thiserror::Error;

use pid_crypto::CryptoError;

/// Errors from building or verifying SD-JWT credentials.
#[derive(Error, Debug)]
pub enum SdJwtError {
    /// The attribute set carries fewer claim groups than the format needs.
    ///
    /// A credential always has at least a mandatory and an optional group.
    #[error("attribute set must carry at least {required} claim groups, got {found}")]
    IncompleteAttributeSet {
        /// Minimum number of claim groups.
        required: usize,
        /// Number of claim groups actually present.
        found: usize,
    },

    /// Key material or holder-key handling failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The compact JWS could not be signed.
    #[error("JWT signing error: {0}")]
    Signing(String),

    /// An issuance string is structurally invalid.
    #[error("invalid SD-JWT issuance: {0}")]
    InvalidIssuance(String),

    /// A disclosure's recomputed digest is not embedded in the signed body.
    #[error("disclosure digest mismatch for claim {claim:?}")]
    DisclosureMismatch {
        /// The claim name of the failing disclosure.
        claim: String,
    },

    /// JSON serialization error while assembling the claim tree.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

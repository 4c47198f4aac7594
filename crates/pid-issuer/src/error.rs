//! # Issuance Error Mapping
//!
//! One error type covering the whole issuance sequence, with a stable
//! mapping from every failure kind to a distinct caller-visible status.
//! The routing layer maps statuses to its own responses without ever
//! inspecting error text.

use thiserror::Error;

use pid_crypto::CryptoError;
use pid_mdoc::MdocError;
use pid_sdjwt::SdJwtError;

/// Errors surfaced by the issuance orchestrator.
///
/// Every kind is terminal for its request: nothing here is retried, and
/// no partial credential is ever returned.
#[derive(Error, Debug)]
pub enum IssueError {
    /// The request context is incomplete for the negotiated protocol.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// mdoc construction or decoding failed.
    #[error(transparent)]
    Mdoc(#[from] MdocError),

    /// SD-JWT construction failed.
    #[error(transparent)]
    SdJwt(#[from] SdJwtError),

    /// Key material, holder key, or secure channel failure.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl IssueError {
    /// The caller-visible status and machine-readable code for this error.
    ///
    /// Statuses are distinct per failure kind so the routing layer can map
    /// them without inspecting messages.
    pub fn status_and_code(&self) -> (u16, &'static str) {
        match self {
            Self::InvalidRequest(_) => (422, "INVALID_REQUEST"),
            Self::Mdoc(MdocError::MissingData(_)) => (422, "MISSING_DATA"),
            Self::Mdoc(MdocError::MalformedCredential(_)) => (422, "MALFORMED_CREDENTIAL"),
            Self::Mdoc(_) => (500, "MDOC_ERROR"),
            Self::SdJwt(SdJwtError::IncompleteAttributeSet { .. }) => {
                (422, "INCOMPLETE_ATTRIBUTE_SET")
            }
            Self::SdJwt(SdJwtError::Crypto(inner)) => crypto_status(inner),
            Self::SdJwt(_) => (500, "SD_JWT_ERROR"),
            Self::Crypto(inner) => crypto_status(inner),
        }
    }
}

fn crypto_status(err: &CryptoError) -> (u16, &'static str) {
    match err {
        CryptoError::UnknownCountry(_) => (404, "UNKNOWN_COUNTRY"),
        CryptoError::UnsupportedCurve(_) => (422, "UNSUPPORTED_CURVE"),
        CryptoError::InvalidPublicKey(_) => (422, "INVALID_PUBLIC_KEY"),
        CryptoError::InvalidCertificate(_) => (422, "INVALID_CERTIFICATE"),
        CryptoError::InvalidEnvelope(_) => (422, "INVALID_ENVELOPE"),
        CryptoError::Authentication => (401, "AUTHENTICATION_FAILED"),
        CryptoError::KeyMaterial(_) | CryptoError::Io(_) => (500, "KEY_MATERIAL_ERROR"),
        CryptoError::Encryption(_) => (500, "ENCRYPTION_ERROR"),
    }
}

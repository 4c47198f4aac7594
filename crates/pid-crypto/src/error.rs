//! # Cryptographic Error Types
//!
//! Structured errors for all cryptographic operations in `pid-crypto`.
//! Uses `thiserror` for ergonomic error definitions with diagnostic context.

use thiserror::Error;

/// Errors from cryptographic operations in the PID formatter.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Signing key material could not be read or decrypted.
    #[error("key material error: {0}")]
    KeyMaterial(String),

    /// No key material is configured for the requested country.
    #[error("no key material configured for country {0:?}")]
    UnknownCountry(String),

    /// A public key is on a curve outside P-256/P-384/P-521.
    #[error("unsupported curve: {0}")]
    UnsupportedCurve(String),

    /// A public key failed to parse or is not a valid curve point.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// An X.509 certificate failed to parse.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// AEAD tag verification failed during decryption.
    ///
    /// Deliberately carries no detail: the plaintext is discarded and the
    /// caller learns only that authentication failed.
    #[error("envelope authentication failed")]
    Authentication,

    /// Symmetric encryption could not be performed.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// A secure envelope field is structurally invalid.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// I/O error reading key material from disk.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

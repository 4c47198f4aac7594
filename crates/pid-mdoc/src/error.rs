//! # mdoc Error Types
//!
//! Structured errors for mdoc construction and decoding. Uses `thiserror`
//! for ergonomic error definitions with diagnostic context.

use thiserror::Error;

/// Errors from building or decoding mdoc credentials.
#[derive(Error, Debug)]
pub enum MdocError {
    /// The attribute set is missing the namespace the doctype requires.
    #[error("missing required namespace {0:?} in attribute data")]
    MissingData(String),

    /// An encoded mdoc is structurally invalid.
    ///
    /// Covers bad base64, bad CBOR, and well-formed CBOR of the wrong
    /// shape — the decoder never leaks a raw parse failure.
    #[error("malformed credential: {0}")]
    MalformedCredential(String),

    /// CBOR serialization failed while building a credential.
    #[error("CBOR encoding error: {0}")]
    Cbor(String),

    /// The issuer signature could not be computed.
    #[error("signing error: {0}")]
    Signing(String),
}

#![deny(missing_docs)]

//! # pid-crypto — Key Material and Transport Cryptography
//!
//! This crate provides the cryptographic building blocks for credential
//! issuance:
//!
//! - **Issuer key material** ([`IssuerKeyMaterial`], [`KeyMaterialProvider`])
//!   resolving a country code to a P-256 signing key, key identifier, and
//!   X.509 certificate, loaded from explicit configuration rather than
//!   ambient state.
//! - **Holder public keys** ([`HolderPublicKey`]) parsed from the device's
//!   base64url-encoded submission, with curve identification across
//!   P-256/P-384/P-521 and raw coordinate access for proof-of-possession
//!   embedding.
//! - **Secure channel** ([`SecureChannelCipher`], [`SecureEnvelope`]):
//!   ECIES-pattern hybrid encryption of finished credentials — ephemeral
//!   ECDH, HKDF-SHA256 key derivation, AES-256-GCM with a detached tag.
//!
//! ## Concurrency
//!
//! Everything here is synchronous and request-scoped. Key material is
//! loaded once and shared read-only across concurrent issuances; all
//! per-call randomness (ephemeral keys, derived nonces) comes from the OS
//! CSPRNG independently per call.

pub mod ecies;
pub mod error;
pub mod holder_key;
pub mod key_provider;

// Re-export primary types.
pub use ecies::{SecureChannelCipher, SecureEnvelope, SecureEnvelopeWire};
pub use error::CryptoError;
pub use holder_key::{HolderPublicKey, NistCurve};
pub use key_provider::{
    ConfigKeyMaterialProvider, InMemoryKeyMaterialProvider, IssuerKeyMaterial, KeyMaterialProvider,
    KeySource,
};

#![deny(missing_docs)]

//! # pid-sdjwt — Selectively-Disclosable Credential Issuance
//!
//! Builds the SD-JWT rendition of a person-identification credential:
//!
//! - **Disclosures** ([`Disclosure`]): salted `[salt, name, value]` triples
//!   whose digests are embedded in the signed body, one per attribute, with
//!   optional decoy digests against disclosure-count fingerprinting.
//! - **Construction** ([`SdJwtCredentialBuilder`]): the verified-claims
//!   tree, day-granularity `iat`/`exp`, a fresh `jti` per issuance, the
//!   holder key as a `cnf` JWK, and an ES256 compact JWS.
//! - **Verification** ([`verify_disclosures`]): issuer-signature and
//!   disclosure-integrity checking for tests and downstream introspection.

pub mod builder;
pub mod disclosure;
pub mod error;
pub mod verify;

// Re-export primary types.
pub use builder::{EvidenceMetadata, SdJwtCredential, SdJwtCredentialBuilder, SdJwtOptions};
pub use disclosure::Disclosure;
pub use error::SdJwtError;
pub use verify::{split_issuance, verify_disclosures};

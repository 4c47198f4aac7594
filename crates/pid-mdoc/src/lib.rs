#![deny(missing_docs)]

//! # pid-mdoc — ISO 18013-5 Mobile Document Issuance
//!
//! Builds the CBOR/COSE rendition of a person-identification credential:
//!
//! - **Construction** ([`MdocCredentialBuilder`]): namespaced
//!   digest-protected items, a mobile security object binding item digests,
//!   validity window, and the holder's device key, all under one ES256
//!   COSE_Sign1 issuer signature carrying the issuer certificate.
//! - **Decoding** ([`decode_mdoc`]): the inverse namespace view, used for
//!   introspection and round-trip testing.
//!
//! Identical inputs never produce identical documents: each item carries a
//! fresh CSPRNG random so issued credentials cannot be linked by content.

pub mod builder;
mod cose;
pub mod decoder;
pub mod error;

// Re-export primary types.
pub use builder::{MdocCredential, MdocCredentialBuilder};
pub use decoder::{decode_mdoc, DecodedNamespaces};
pub use error::MdocError;

//! # Request Context
//!
//! The per-request values the routing layer collects before handing an
//! issuance to the orchestrator. An explicit value threaded through the
//! call — never implicit shared session state.

use serde::{Deserialize, Serialize};

/// Protocol version whose responses are returned unencrypted.
pub const LEGACY_PLAINTEXT_VERSION: &str = "0.1";

/// Everything request-scoped an issuance needs besides the attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Protocol version the requesting wallet speaks.
    pub protocol_version: String,

    /// ISO 3166-1 alpha-2 code of the issuing country.
    pub country: String,

    /// The holder device's public key, base64url(PEM or DER).
    pub holder_public_key: String,

    /// The relying party's certificate for the secure channel,
    /// base64url(PEM or DER). Required unless the protocol version is
    /// [`LEGACY_PLAINTEXT_VERSION`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_certificate: Option<String>,
}

impl RequestContext {
    /// Whether this request's response goes back unencrypted.
    pub fn is_legacy_plaintext(&self) -> bool {
        self.protocol_version == LEGACY_PLAINTEXT_VERSION
    }
}

//! # Issuance Orchestration
//!
//! Sequences one issuance: resolve the country's key material, parse the
//! holder's device key, build both credential renditions, and — unless
//! the wallet speaks the legacy plaintext protocol — seal the mdoc in a
//! secure envelope for the trip back through the intermediary.
//!
//! Construction is all-or-nothing: any failure surfaces as a typed
//! [`IssueError`](crate::error::IssueError) and no partial response exists.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use pid_core::{AttributeSet, ValidityWindow};
use pid_crypto::{
    HolderPublicKey, KeyMaterialProvider, SecureChannelCipher, SecureEnvelopeWire,
};
use pid_mdoc::MdocCredentialBuilder;
use pid_sdjwt::{EvidenceMetadata, SdJwtCredentialBuilder};

use crate::config::ServiceConfig;
use crate::context::RequestContext;
use crate::error::IssueError;

/// The finished, immutable result of one issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuanceResponse {
    /// The mdoc, base64url-encoded.
    pub mdoc: String,

    /// The SD-JWT issuance string (`<jwt>~<disclosure>*~`).
    pub sd_jwt: String,

    /// The sealed mdoc for transport; absent on the legacy plaintext
    /// protocol version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envelope: Option<SecureEnvelopeWire>,
}

/// Drives the issuance sequence against one key material provider.
pub struct IssuanceOrchestrator<P: KeyMaterialProvider> {
    provider: P,
    config: ServiceConfig,
}

impl<P: KeyMaterialProvider> IssuanceOrchestrator<P> {
    /// Create an orchestrator over a provider and service configuration.
    pub fn new(provider: P, config: ServiceConfig) -> Self {
        Self { provider, config }
    }

    /// The configuration this orchestrator serves.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Issue both credential renditions for one request.
    ///
    /// The attribute set arrives already normalized by the federation
    /// layer. Both builders run against the same frozen data; the secure
    /// envelope step is skipped only for the legacy protocol version.
    pub fn issue(
        &self,
        context: &RequestContext,
        attributes: &AttributeSet,
        validity: &ValidityWindow,
        evidence: &EvidenceMetadata,
    ) -> Result<IssuanceResponse, IssueError> {
        let issuer = self.provider.issuer_key(&context.country)?;
        let holder_key = HolderPublicKey::from_base64url(&context.holder_public_key)?;

        tracing::info!(
            country = %context.country,
            doctype = %self.config.doctype,
            provider = self.provider.provider_name(),
            holder_curve = holder_key.curve().jose_name(),
            "issuance started"
        );

        let mdoc = MdocCredentialBuilder::build(
            attributes,
            &self.config.doctype,
            validity,
            &holder_key,
            issuer,
        )?;

        let sd_jwt = SdJwtCredentialBuilder::build(
            attributes,
            &self.config.doctype,
            validity,
            &holder_key,
            issuer,
            evidence,
            &self.config.sd_jwt,
        )?;

        let envelope = if context.is_legacy_plaintext() {
            None
        } else {
            let certificate = context.recipient_certificate.as_deref().ok_or_else(|| {
                IssueError::InvalidRequest(
                    "protocol version requires a recipient certificate".to_string(),
                )
            })?;
            let certificate = URL_SAFE_NO_PAD
                .decode(certificate.trim_end_matches('='))
                .map_err(|e| {
                    IssueError::InvalidRequest(format!("recipient certificate base64url: {e}"))
                })?;
            // The transport contract carries the mdoc as standard base64
            // inside the envelope.
            let payload = STANDARD.encode(mdoc.as_bytes());
            let envelope =
                SecureChannelCipher::encrypt_for_certificate(&certificate, payload.as_bytes())?;
            Some(envelope.to_wire())
        };

        tracing::info!(
            country = %context.country,
            ciphered = envelope.is_some(),
            "issuance complete"
        );

        Ok(IssuanceResponse {
            mdoc: mdoc.to_base64url(),
            sd_jwt: sd_jwt.to_issuance_string(),
            envelope,
        })
    }
}

//! # mdoc Construction
//!
//! Builds an issuer-signed ISO 18013-5 mobile document from a namespaced
//! attribute set: one digest-protected item per element, a mobile security
//! object carrying the item digests and the holder's device key, and a
//! COSE_Sign1 issuer signature binding the whole document.
//!
//! ## Security Invariants
//!
//! - Every item carries a fresh 32-byte CSPRNG random, so two issuances of
//!   identical attribute data are unlinkable.
//! - The MSO digests cover the full tagged item encoding; replacing any
//!   element after signing breaks its digest.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use ciborium::value::Value;
use rand::RngCore;
use sha2::{Digest, Sha256};

use pid_core::{AttributeSet, ElementValue, ValidityWindow};
use pid_crypto::{HolderPublicKey, IssuerKeyMaterial};

use crate::cose::{device_cose_key, sign1, to_cbor};
use crate::error::MdocError;

/// CBOR tag for an embedded CBOR data item (`#6.24`).
pub(crate) const TAG_ENCODED_CBOR: u64 = 24;
/// CBOR tag for an RFC 8943 full-date string.
pub(crate) const TAG_FULL_DATE: u64 = 1004;
/// CBOR tag for an RFC 3339 date-time string.
pub(crate) const TAG_DATE_TIME: u64 = 0;

/// Width of the per-item anti-linkage random.
const ITEM_RANDOM_LEN: usize = 32;

/// A finished, immutable mdoc credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdocCredential {
    encoded: Vec<u8>,
}

impl MdocCredential {
    /// The raw CBOR document bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.encoded
    }

    /// The base64url wire form.
    pub fn to_base64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.encoded)
    }
}

/// Builds issuer-signed mobile documents.
pub struct MdocCredentialBuilder;

impl MdocCredentialBuilder {
    /// Construct and sign one mdoc.
    ///
    /// The attribute set must contain the namespace named by `doctype`;
    /// additional namespaces are carried alongside it. The holder's device
    /// key is embedded for later possession challenges, and the issuer
    /// certificate rides in the signature header for chain validation.
    pub fn build(
        attributes: &AttributeSet,
        doctype: &str,
        validity: &ValidityWindow,
        holder_key: &HolderPublicKey,
        issuer: &IssuerKeyMaterial,
    ) -> Result<MdocCredential, MdocError> {
        if attributes.namespace(doctype).is_none() {
            return Err(MdocError::MissingData(doctype.to_string()));
        }

        let mut namespace_items: Vec<(Value, Value)> = Vec::new();
        let mut value_digests: Vec<(Value, Value)> = Vec::new();

        for (namespace, elements) in attributes.namespaces() {
            let mut items: Vec<Value> = Vec::new();
            let mut digests: Vec<(Value, Value)> = Vec::new();

            for (digest_id, (element_id, value)) in elements.iter().enumerate() {
                let digest_id = digest_id as i64;
                let mut random = vec![0u8; ITEM_RANDOM_LEN];
                rand::rngs::OsRng.fill_bytes(&mut random);

                let item = Value::Map(vec![
                    (
                        Value::Text("digestID".to_string()),
                        Value::Integer(digest_id.into()),
                    ),
                    (Value::Text("random".to_string()), Value::Bytes(random)),
                    (
                        Value::Text("elementIdentifier".to_string()),
                        Value::Text(element_id.clone()),
                    ),
                    (
                        Value::Text("elementValue".to_string()),
                        encode_element_value(value),
                    ),
                ]);

                // IssuerSignedItemBytes = #6.24(bstr .cbor IssuerSignedItem);
                // the MSO digest covers the tagged encoding.
                let tagged = Value::Tag(TAG_ENCODED_CBOR, Box::new(Value::Bytes(to_cbor(&item)?)));
                let digest = Sha256::digest(to_cbor(&tagged)?);

                items.push(tagged);
                digests.push((
                    Value::Integer(digest_id.into()),
                    Value::Bytes(digest.to_vec()),
                ));
            }

            namespace_items.push((Value::Text(namespace.to_string()), Value::Array(items)));
            value_digests.push((Value::Text(namespace.to_string()), Value::Map(digests)));
        }

        let mso = Value::Map(vec![
            (
                Value::Text("version".to_string()),
                Value::Text("1.0".to_string()),
            ),
            (
                Value::Text("digestAlgorithm".to_string()),
                Value::Text("SHA-256".to_string()),
            ),
            (
                Value::Text("valueDigests".to_string()),
                Value::Map(value_digests),
            ),
            (
                Value::Text("deviceKeyInfo".to_string()),
                Value::Map(vec![(
                    Value::Text("deviceKey".to_string()),
                    device_cose_key(holder_key),
                )]),
            ),
            (
                Value::Text("docType".to_string()),
                Value::Text(doctype.to_string()),
            ),
            (
                Value::Text("validityInfo".to_string()),
                validity_info(validity),
            ),
        ]);

        // MobileSecurityObjectBytes = #6.24(bstr .cbor MSO)
        let payload = to_cbor(&Value::Tag(
            TAG_ENCODED_CBOR,
            Box::new(Value::Bytes(to_cbor(&mso)?)),
        ))?;
        let issuer_auth = sign1(payload, issuer)?;

        let document = Value::Map(vec![
            (
                Value::Text("docType".to_string()),
                Value::Text(doctype.to_string()),
            ),
            (
                Value::Text("issuerSigned".to_string()),
                Value::Map(vec![
                    (
                        Value::Text("nameSpaces".to_string()),
                        Value::Map(namespace_items),
                    ),
                    (Value::Text("issuerAuth".to_string()), issuer_auth),
                ]),
            ),
        ]);

        let top = Value::Map(vec![
            (
                Value::Text("version".to_string()),
                Value::Text("1.0".to_string()),
            ),
            (
                Value::Text("documents".to_string()),
                Value::Array(vec![document]),
            ),
            (Value::Text("status".to_string()), Value::Integer(0.into())),
        ]);

        let encoded = to_cbor(&top)?;
        tracing::debug!(
            doctype = %doctype,
            namespaces = attributes.namespace_count(),
            size = encoded.len(),
            "mdoc assembled and signed"
        );
        Ok(MdocCredential { encoded })
    }
}

/// Encode one element value, dispatching on its type tag.
fn encode_element_value(value: &ElementValue) -> Value {
    match value {
        ElementValue::Text(s) => Value::Text(s.clone()),
        ElementValue::Integer(i) => Value::Integer((*i).into()),
        ElementValue::Boolean(b) => Value::Bool(*b),
        ElementValue::Date(d) => Value::Tag(
            TAG_FULL_DATE,
            Box::new(Value::Text(d.format("%Y-%m-%d").to_string())),
        ),
    }
}

/// The MSO validity block: signing instant plus the validity window as
/// tag-0 date-times.
fn validity_info(validity: &ValidityWindow) -> Value {
    let tdate = |s: String| Value::Tag(TAG_DATE_TIME, Box::new(Value::Text(s)));
    let midnight = |d: chrono::NaiveDate| format!("{}T00:00:00Z", d.format("%Y-%m-%d"));
    Value::Map(vec![
        (
            Value::Text("signed".to_string()),
            tdate(Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        ),
        (
            Value::Text("validFrom".to_string()),
            tdate(midnight(validity.issuance)),
        ),
        (
            Value::Text("validUntil".to_string()),
            tdate(midnight(validity.expiry)),
        ),
    ])
}

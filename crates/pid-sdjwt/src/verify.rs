//! # Disclosure Verification
//!
//! Checks an issued SD-JWT: the issuer signature over the body, and that
//! every released disclosure's recomputed digest is embedded in the signed
//! body. Removing disclosures never invalidates the remainder — the
//! signature covers digests, not plaintext — but altering one breaks its
//! digest match.

use std::collections::HashSet;

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use subtle::ConstantTimeEq;

use pid_crypto::IssuerKeyMaterial;

use crate::disclosure::Disclosure;
use crate::error::SdJwtError;

/// Split an issuance string into its compact JWS and disclosure strings.
pub fn split_issuance(issuance: &str) -> Result<(&str, Vec<&str>), SdJwtError> {
    let mut parts = issuance.split('~');
    let jwt = parts
        .next()
        .filter(|jwt| !jwt.is_empty())
        .ok_or_else(|| SdJwtError::InvalidIssuance("empty issuance string".to_string()))?;
    Ok((jwt, parts.filter(|p| !p.is_empty()).collect()))
}

/// Verify the issuer signature and every released disclosure.
///
/// Returns the disclosed claims on success. Fails with
/// [`SdJwtError::DisclosureMismatch`] on the first disclosure whose digest
/// is not embedded in the signed body.
pub fn verify_disclosures(
    issuance: &str,
    issuer: &IssuerKeyMaterial,
) -> Result<Vec<Disclosure>, SdJwtError> {
    let (jwt, disclosure_strings) = split_issuance(issuance)?;
    let payload = verify_signature(jwt, issuer)?;

    let embedded = collect_embedded_digests(&payload);
    let mut disclosed = Vec::with_capacity(disclosure_strings.len());
    for encoded in disclosure_strings {
        let disclosure = Disclosure::parse(encoded)?;
        let digest = disclosure.digest();
        let matched = embedded
            .iter()
            .any(|e| bool::from(e.as_bytes().ct_eq(digest.as_bytes())));
        if !matched {
            return Err(SdJwtError::DisclosureMismatch {
                claim: disclosure.claim_name().to_string(),
            });
        }
        disclosed.push(disclosure);
    }
    Ok(disclosed)
}

/// Verify the ES256 signature and return the decoded payload.
fn verify_signature(
    jwt: &str,
    issuer: &IssuerKeyMaterial,
) -> Result<serde_json::Value, SdJwtError> {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use p256::elliptic_curve::sec1::ToEncodedPoint;

    let point = issuer.public_key().to_encoded_point(false);
    let (x, y) = match (point.x(), point.y()) {
        (Some(x), Some(y)) => (x, y),
        _ => {
            return Err(SdJwtError::InvalidIssuance(
                "issuer public key has no affine coordinates".to_string(),
            ))
        }
    };
    let decoding_key = DecodingKey::from_ec_components(
        &URL_SAFE_NO_PAD.encode(x),
        &URL_SAFE_NO_PAD.encode(y),
    )
    .map_err(|e| SdJwtError::InvalidIssuance(format!("issuer key: {e}")))?;

    // `exp` is day-granular, so the seconds-based expiry check is not
    // meaningful here; validity-window evaluation is the verifier's call.
    let mut validation = Validation::new(Algorithm::ES256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let data = jsonwebtoken::decode::<serde_json::Value>(jwt, &decoding_key, &validation)
        .map_err(|e| SdJwtError::InvalidIssuance(format!("signature: {e}")))?;
    Ok(data.claims)
}

/// Collect every digest from every `_sd` array in the payload tree.
fn collect_embedded_digests(payload: &serde_json::Value) -> HashSet<String> {
    let mut digests = HashSet::new();
    collect_into(payload, &mut digests);
    digests
}

fn collect_into(value: &serde_json::Value, digests: &mut HashSet<String>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                if key == "_sd" {
                    if let Some(entries) = child.as_array() {
                        digests.extend(
                            entries
                                .iter()
                                .filter_map(|d| d.as_str().map(str::to_string)),
                        );
                    }
                } else {
                    collect_into(child, digests);
                }
            }
        }
        serde_json::Value::Array(entries) => {
            for child in entries {
                collect_into(child, digests);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{EvidenceMetadata, SdJwtCredentialBuilder, SdJwtOptions};
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use p256::pkcs8::EncodePublicKey;
    use pid_core::{AttributeSet, ElementValue, ValidityWindow};
    use pid_crypto::HolderPublicKey;

    const KEY_PEM: &str = include_str!("../testdata/issuer_key.pem");
    const CERT_PEM: &[u8] = include_bytes!("../testdata/issuer_cert.pem");

    fn issuer() -> IssuerKeyMaterial {
        IssuerKeyMaterial::from_pem(KEY_PEM, None, CERT_PEM, "mdocIssuer").unwrap()
    }

    fn issuance() -> String {
        let attributes = AttributeSet::builder()
            .attribute("eu.europa.ec.eudiw.pid.1", "family_name", "Doe")
            .attribute("eu.europa.ec.eudiw.pid.1", "given_name", "Jane")
            .attribute(
                "eu.europa.ec.eudiw.pid.1",
                "birth_date",
                ElementValue::date_from_iso("1990-01-01").unwrap(),
            )
            .attribute("eu.europa.ec.eudiw.pid.pt.1", "nationality", "PT")
            .build();
        let secret = p256::SecretKey::random(&mut rand_core::OsRng);
        let pem = secret
            .public_key()
            .to_public_key_pem(Default::default())
            .unwrap();
        SdJwtCredentialBuilder::build(
            &attributes,
            "eu.europa.ec.eudiw.pid.1",
            &ValidityWindow::from_iso("2024-01-01", "2034-01-01").unwrap(),
            &HolderPublicKey::from_spki_pem(&pem).unwrap(),
            &issuer(),
            &EvidenceMetadata {
                issuer_organization: "Test Identity Provider".to_string(),
                evidence: serde_json::json!({"type": "electronic_record"}),
            },
            &SdJwtOptions::default(),
        )
        .unwrap()
        .to_issuance_string()
    }

    #[test]
    fn full_issuance_verifies() {
        let disclosed = verify_disclosures(&issuance(), &issuer()).unwrap();
        // evidence + 4 attributes
        assert_eq!(disclosed.len(), 5);
    }

    #[test]
    fn removing_disclosures_keeps_the_rest_valid() {
        let issuance = issuance();
        let (jwt, disclosures) = split_issuance(&issuance).unwrap();
        // Release only the first two disclosures.
        let partial = format!("{jwt}~{}~{}~", disclosures[0], disclosures[1]);
        let disclosed = verify_disclosures(&partial, &issuer()).unwrap();
        assert_eq!(disclosed.len(), 2);
    }

    #[test]
    fn jwt_alone_still_verifies_signature() {
        let issuance = issuance();
        let (jwt, _) = split_issuance(&issuance).unwrap();
        let disclosed = verify_disclosures(&format!("{jwt}~"), &issuer()).unwrap();
        assert!(disclosed.is_empty());
    }

    #[test]
    fn tampered_disclosure_value_is_rejected() {
        let issuance = issuance();
        let (jwt, disclosures) = split_issuance(&issuance).unwrap();
        // Re-encode the first disclosure with a different value but the
        // same salt and name.
        let original = Disclosure::parse(disclosures[0]).unwrap();
        let bytes = URL_SAFE_NO_PAD.decode(disclosures[0]).unwrap();
        let mut array: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        array[2] = serde_json::json!("Mallory");
        let forged = URL_SAFE_NO_PAD.encode(array.to_string().as_bytes());
        assert_ne!(forged, disclosures[0]);

        let tampered = format!("{jwt}~{forged}~");
        let result = verify_disclosures(&tampered, &issuer());
        assert!(
            matches!(result, Err(SdJwtError::DisclosureMismatch { ref claim }) if claim == original.claim_name())
        );
    }

    #[test]
    fn foreign_disclosure_is_rejected() {
        let issuance = issuance();
        let (jwt, _) = split_issuance(&issuance).unwrap();
        let foreign = Disclosure::new("family_name", serde_json::json!("Doe"));
        let spliced = format!("{jwt}~{}~", foreign.encoded());
        assert!(matches!(
            verify_disclosures(&spliced, &issuer()),
            Err(SdJwtError::DisclosureMismatch { .. })
        ));
    }

    #[test]
    fn tampered_body_fails_signature_check() {
        let issuance = issuance();
        let (jwt, _) = split_issuance(&issuance).unwrap();
        let mut segments: Vec<String> = jwt.split('.').map(str::to_string).collect();
        let mut payload: serde_json::Value = serde_json::from_slice(
            &URL_SAFE_NO_PAD.decode(&segments[1]).unwrap(),
        )
        .unwrap();
        payload["iss"] = serde_json::json!("Forged Issuer");
        segments[1] = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
        let forged_jwt = segments.join(".");
        assert!(matches!(
            verify_disclosures(&format!("{forged_jwt}~"), &issuer()),
            Err(SdJwtError::InvalidIssuance(_))
        ));
    }

    #[test]
    fn empty_issuance_is_invalid() {
        assert!(matches!(
            verify_disclosures("", &issuer()),
            Err(SdJwtError::InvalidIssuance(_))
        ));
    }
}

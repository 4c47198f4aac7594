//! # SD-JWT Construction
//!
//! Assembles and signs the selectively-disclosable rendition of a
//! credential. Protocol claims (`iss`, `jti`, `iat`, `exp`, `status`,
//! `type`) stay in the clear; the federation evidence block and every
//! individual attribute become salted disclosures whose digests live in
//! the signed body. The holder's public key is embedded as a `cnf` JWK so
//! possession can be challenged at presentation time.
//!
//! ## Security Invariants
//!
//! - One digest per attribute, not per group: a holder can release any
//!   subset of attributes without revealing the rest or breaking the
//!   issuer signature.
//! - `jti` is a fresh UUID v4 per issuance; salts are fresh per claim.
//! - `_sd` arrays are sorted after decoy injection, so digest position
//!   reveals nothing about claim identity.

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use p256::pkcs8::EncodePrivateKey;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use pid_core::{AttributeSet, ValidityWindow};
use pid_crypto::{HolderPublicKey, IssuerKeyMaterial};

use crate::disclosure::{decoy_digest, Disclosure};
use crate::error::SdJwtError;

/// Minimum number of claim groups (mandatory + optional).
const MIN_CLAIM_GROUPS: usize = 2;

/// The digest algorithm advertised in `_sd_alg`.
const SD_ALG: &str = "sha-256";

/// Tuning for SD-JWT issuance, carried in service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdJwtOptions {
    /// Value of the `status` claim (validation-status endpoint).
    pub status_url: String,
    /// Trust framework identifier in the verification block.
    pub trust_framework: String,
    /// Assurance level in the verification block.
    pub assurance_level: String,
    /// Inject decoy digests to hide the number of real claims.
    pub add_decoy_claims: bool,
    /// Decoys added per digest array when enabled.
    pub decoy_count: usize,
}

impl Default for SdJwtOptions {
    fn default() -> Self {
        Self {
            status_url: "validation status URL".to_string(),
            trust_framework: "eidas".to_string(),
            assurance_level: "high".to_string(),
            add_decoy_claims: false,
            decoy_count: 4,
        }
    }
}

/// The federation evidence accompanying an issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceMetadata {
    /// The organization that vouched for the attributes; becomes `iss`.
    pub issuer_organization: String,
    /// The evidence block itself, released as a disclosure.
    pub evidence: Value,
}

/// A finished, immutable SD-JWT credential: signed body plus disclosures.
#[derive(Debug, Clone)]
pub struct SdJwtCredential {
    jwt: String,
    disclosures: Vec<Disclosure>,
}

impl SdJwtCredential {
    /// The signed compact JWS.
    pub fn jwt(&self) -> &str {
        &self.jwt
    }

    /// The disclosures released with the body.
    pub fn disclosures(&self) -> &[Disclosure] {
        &self.disclosures
    }

    /// The issuance wire form: `<jwt>~<disclosure>~...~` (trailing tilde).
    pub fn to_issuance_string(&self) -> String {
        let mut out = self.jwt.clone();
        for disclosure in &self.disclosures {
            out.push('~');
            out.push_str(disclosure.encoded());
        }
        out.push('~');
        out
    }
}

/// Builds selectively-disclosable signed credentials.
pub struct SdJwtCredentialBuilder;

impl SdJwtCredentialBuilder {
    /// Construct and sign one SD-JWT credential.
    ///
    /// Claim groups are enumerated by name: every group in `attributes`
    /// becomes a subtree under `verified_claims.claims`, with each of its
    /// attributes independently disclosable. At least two groups must be
    /// present.
    pub fn build(
        attributes: &AttributeSet,
        doctype: &str,
        validity: &ValidityWindow,
        holder_key: &HolderPublicKey,
        issuer: &IssuerKeyMaterial,
        evidence: &EvidenceMetadata,
        options: &SdJwtOptions,
    ) -> Result<SdJwtCredential, SdJwtError> {
        if attributes.namespace_count() < MIN_CLAIM_GROUPS {
            return Err(SdJwtError::IncompleteAttributeSet {
                required: MIN_CLAIM_GROUPS,
                found: attributes.namespace_count(),
            });
        }

        let mut disclosures = Vec::new();

        // The evidence block is disclosable like any attribute.
        let evidence_disclosure = Disclosure::new("evidence", evidence.evidence.clone());
        let verification = json!({
            "trust_framework": options.trust_framework,
            "assurance_level": options.assurance_level,
            "_sd": digest_array(std::slice::from_ref(&evidence_disclosure), options),
        });
        disclosures.push(evidence_disclosure);

        // One subtree per claim group; one salted digest per attribute.
        let mut claim_groups = Map::new();
        for (group, elements) in attributes.namespaces() {
            let group_disclosures: Vec<Disclosure> = elements
                .iter()
                .map(|(name, value)| {
                    Ok(Disclosure::new(name, serde_json::to_value(value)?))
                })
                .collect::<Result<_, SdJwtError>>()?;
            let digests = digest_array(&group_disclosures, options);
            disclosures.extend(group_disclosures);
            claim_groups.insert(group.to_string(), json!({ "_sd": digests }));
        }

        let jti = Uuid::new_v4().to_string();
        let claims = json!({
            "iss": evidence.issuer_organization,
            "jti": jti,
            "iat": validity.issuance_epoch_days(),
            "exp": validity.expiry_epoch_days(),
            "status": options.status_url,
            "type": doctype,
            "cnf": { "jwk": holder_jwk(holder_key) },
            "_sd_alg": SD_ALG,
            "verified_claims": {
                "verification": verification,
                "claims": Value::Object(claim_groups),
            },
        });

        let mut header = Header::new(Algorithm::ES256);
        header.typ = Some("vc+sd-jwt".to_string());
        header.kid = Some(issuer.key_id().to_string());

        let pkcs8 = issuer
            .signing_key()
            .to_pkcs8_der()
            .map_err(|e| SdJwtError::Signing(e.to_string()))?;
        let encoding_key = EncodingKey::from_ec_der(pkcs8.as_bytes());
        let jwt = jsonwebtoken::encode(&header, &claims, &encoding_key)
            .map_err(|e| SdJwtError::Signing(e.to_string()))?;

        tracing::debug!(
            doctype = %doctype,
            jti = %jti,
            disclosures = disclosures.len(),
            decoys = options.add_decoy_claims,
            "sd-jwt assembled and signed"
        );

        Ok(SdJwtCredential { jwt, disclosures })
    }
}

/// Digests for one `_sd` array: real disclosures plus optional decoys,
/// sorted so position reveals nothing.
fn digest_array(disclosures: &[Disclosure], options: &SdJwtOptions) -> Vec<String> {
    let mut digests: Vec<String> = disclosures.iter().map(Disclosure::digest).collect();
    if options.add_decoy_claims {
        digests.extend((0..options.decoy_count).map(|_| decoy_digest()));
    }
    digests.sort();
    digests
}

/// The holder's proof-of-possession key as an EC JWK.
fn holder_jwk(holder_key: &HolderPublicKey) -> Value {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    json!({
        "kty": "EC",
        "crv": holder_key.curve().jose_name(),
        "x": URL_SAFE_NO_PAD.encode(holder_key.x()),
        "y": URL_SAFE_NO_PAD.encode(holder_key.y()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use p256::pkcs8::EncodePublicKey;
    use pid_core::ElementValue;

    const KEY_PEM: &str = include_str!("../testdata/issuer_key.pem");
    const CERT_PEM: &[u8] = include_bytes!("../testdata/issuer_cert.pem");

    const MANDATORY_GROUP: &str = "eu.europa.ec.eudiw.pid.1";
    const OPTIONAL_GROUP: &str = "eu.europa.ec.eudiw.pid.pt.1";

    fn issuer() -> IssuerKeyMaterial {
        IssuerKeyMaterial::from_pem(KEY_PEM, None, CERT_PEM, "mdocIssuer").unwrap()
    }

    fn holder_p256() -> HolderPublicKey {
        let secret = p256::SecretKey::random(&mut rand_core::OsRng);
        let pem = secret
            .public_key()
            .to_public_key_pem(Default::default())
            .unwrap();
        HolderPublicKey::from_spki_pem(&pem).unwrap()
    }

    fn evidence() -> EvidenceMetadata {
        EvidenceMetadata {
            issuer_organization: "Test Identity Provider".to_string(),
            evidence: serde_json::json!({
                "type": "electronic_record",
                "source": { "organization_name": "Test Identity Provider" }
            }),
        }
    }

    fn attributes() -> AttributeSet {
        AttributeSet::builder()
            .attribute(MANDATORY_GROUP, "family_name", "Doe")
            .attribute(MANDATORY_GROUP, "given_name", "Jane")
            .attribute(
                MANDATORY_GROUP,
                "birth_date",
                ElementValue::date_from_iso("1990-01-01").unwrap(),
            )
            .attribute(OPTIONAL_GROUP, "nationality", "PT")
            .build()
    }

    fn validity() -> ValidityWindow {
        ValidityWindow::from_iso("2024-01-01", "2034-01-01").unwrap()
    }

    fn build(attrs: &AttributeSet, options: &SdJwtOptions) -> SdJwtCredential {
        SdJwtCredentialBuilder::build(
            attrs,
            "eu.europa.ec.eudiw.pid.1",
            &validity(),
            &holder_p256(),
            &issuer(),
            &evidence(),
            options,
        )
        .unwrap()
    }

    fn decode_payload(jwt: &str) -> Value {
        let payload_b64 = jwt.split('.').nth(1).unwrap();
        let bytes = URL_SAFE_NO_PAD.decode(payload_b64).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn single_group_is_incomplete() {
        let attrs = AttributeSet::builder()
            .attribute(MANDATORY_GROUP, "family_name", "Doe")
            .build();
        let result = SdJwtCredentialBuilder::build(
            &attrs,
            "eu.europa.ec.eudiw.pid.1",
            &validity(),
            &holder_p256(),
            &issuer(),
            &evidence(),
            &SdJwtOptions::default(),
        );
        assert!(matches!(
            result,
            Err(SdJwtError::IncompleteAttributeSet {
                required: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn three_named_groups_are_all_carried() {
        let attrs = AttributeSet::builder()
            .attribute("group.a", "family_name", "Doe")
            .attribute("group.b", "nationality", "PT")
            .attribute("group.c", "residence_city", "Lisboa")
            .build();
        let credential = build(&attrs, &SdJwtOptions::default());
        let payload = decode_payload(credential.jwt());
        let claims = &payload["verified_claims"]["claims"];
        assert!(claims["group.a"]["_sd"].is_array());
        assert!(claims["group.b"]["_sd"].is_array());
        assert!(claims["group.c"]["_sd"].is_array());
    }

    #[test]
    fn protocol_claims_are_in_the_clear() {
        let credential = build(&attributes(), &SdJwtOptions::default());
        let payload = decode_payload(credential.jwt());
        assert_eq!(payload["iss"], "Test Identity Provider");
        assert_eq!(payload["type"], "eu.europa.ec.eudiw.pid.1");
        assert_eq!(payload["iat"], 19_723);
        assert_eq!(payload["exp"], 23_376);
        assert_eq!(payload["_sd_alg"], "sha-256");
        assert!(payload["jti"].is_string());
        assert!(payload["status"].is_string());
    }

    #[test]
    fn attribute_values_never_appear_in_signed_body() {
        let credential = build(&attributes(), &SdJwtOptions::default());
        let payload_b64 = credential.jwt().split('.').nth(1).unwrap();
        let payload_text =
            String::from_utf8(URL_SAFE_NO_PAD.decode(payload_b64).unwrap()).unwrap();
        assert!(!payload_text.contains("Doe"));
        assert!(!payload_text.contains("Jane"));
        assert!(!payload_text.contains("1990-01-01"));
    }

    #[test]
    fn every_attribute_gets_its_own_disclosure() {
        let credential = build(&attributes(), &SdJwtOptions::default());
        // evidence + 3 mandatory + 1 optional
        assert_eq!(credential.disclosures().len(), 5);
        let names: Vec<&str> = credential
            .disclosures()
            .iter()
            .map(|d| d.claim_name())
            .collect();
        assert!(names.contains(&"evidence"));
        assert!(names.contains(&"family_name"));
        assert!(names.contains(&"nationality"));
    }

    #[test]
    fn jti_is_fresh_per_issuance() {
        let attrs = attributes();
        let a = build(&attrs, &SdJwtOptions::default());
        let b = build(&attrs, &SdJwtOptions::default());
        assert_ne!(
            decode_payload(a.jwt())["jti"],
            decode_payload(b.jwt())["jti"]
        );
    }

    #[test]
    fn issuance_string_is_tilde_delimited_with_trailing_tilde() {
        let credential = build(&attributes(), &SdJwtOptions::default());
        let issuance = credential.to_issuance_string();
        assert!(issuance.ends_with('~'));
        let parts: Vec<&str> = issuance.trim_end_matches('~').split('~').collect();
        assert_eq!(parts.len(), 1 + credential.disclosures().len());
        assert_eq!(parts[0], credential.jwt());
    }

    #[test]
    fn header_advertises_sd_jwt_type_and_kid() {
        let credential = build(&attributes(), &SdJwtOptions::default());
        let header_b64 = credential.jwt().split('.').next().unwrap();
        let header: Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header_b64).unwrap()).unwrap();
        assert_eq!(header["alg"], "ES256");
        assert_eq!(header["typ"], "vc+sd-jwt");
        assert_eq!(header["kid"], "mdocIssuer");
    }

    #[test]
    fn cnf_jwk_identifies_p256_curve() {
        let credential = build(&attributes(), &SdJwtOptions::default());
        let jwk = &decode_payload(credential.jwt())["cnf"]["jwk"];
        assert_eq!(jwk["kty"], "EC");
        assert_eq!(jwk["crv"], "P-256");
        let x = URL_SAFE_NO_PAD.decode(jwk["x"].as_str().unwrap()).unwrap();
        assert_eq!(x.len(), 32);
    }

    #[test]
    fn cnf_jwk_covers_larger_curves() {
        for (holder, crv, width) in [
            (
                {
                    let secret = p384::SecretKey::random(&mut rand_core::OsRng);
                    let pem = secret
                        .public_key()
                        .to_public_key_pem(Default::default())
                        .unwrap();
                    HolderPublicKey::from_spki_pem(&pem).unwrap()
                },
                "P-384",
                48,
            ),
            (
                {
                    let secret = p521::SecretKey::random(&mut rand_core::OsRng);
                    let pem = secret
                        .public_key()
                        .to_public_key_pem(Default::default())
                        .unwrap();
                    HolderPublicKey::from_spki_pem(&pem).unwrap()
                },
                "P-521",
                66,
            ),
        ] {
            let credential = SdJwtCredentialBuilder::build(
                &attributes(),
                "eu.europa.ec.eudiw.pid.1",
                &validity(),
                &holder,
                &issuer(),
                &evidence(),
                &SdJwtOptions::default(),
            )
            .unwrap();
            let jwk = &decode_payload(credential.jwt())["cnf"]["jwk"];
            assert_eq!(jwk["crv"], crv);
            let x = URL_SAFE_NO_PAD.decode(jwk["x"].as_str().unwrap()).unwrap();
            assert_eq!(x.len(), width);
        }
    }

    #[test]
    fn decoys_pad_every_digest_array() {
        let options = SdJwtOptions {
            add_decoy_claims: true,
            decoy_count: 3,
            ..SdJwtOptions::default()
        };
        let credential = build(&attributes(), &options);
        let payload = decode_payload(credential.jwt());
        let mandatory_sd = payload["verified_claims"]["claims"][MANDATORY_GROUP]["_sd"]
            .as_array()
            .unwrap();
        // 3 real attributes + 3 decoys
        assert_eq!(mandatory_sd.len(), 6);
        let verification_sd = payload["verified_claims"]["verification"]["_sd"]
            .as_array()
            .unwrap();
        // 1 evidence disclosure + 3 decoys
        assert_eq!(verification_sd.len(), 4);
    }

    #[test]
    fn sd_arrays_are_sorted() {
        let credential = build(&attributes(), &SdJwtOptions::default());
        let payload = decode_payload(credential.jwt());
        let sd: Vec<String> = payload["verified_claims"]["claims"][MANDATORY_GROUP]["_sd"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        let mut sorted = sd.clone();
        sorted.sort();
        assert_eq!(sd, sorted);
    }
}

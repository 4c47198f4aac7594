//! # Disclosures
//!
//! A disclosure is a `[salt, claim name, claim value]` triple released
//! alongside the signed body. The body embeds only its digest, so a holder
//! can release any subset of disclosures without touching the issuer
//! signature. Decoy digests — digests of nothing but a fresh salt — pad
//! the digest arrays so the number of real claims cannot be counted.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::SdJwtError;

/// Width of a disclosure salt in bytes.
const SALT_LEN: usize = 16;

/// One selectively-disclosable claim: salt, name, value, and the encoded
/// form whose digest the signed body embeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disclosure {
    claim_name: String,
    claim_value: serde_json::Value,
    encoded: String,
}

impl Disclosure {
    /// Create a disclosure with a fresh 16-byte CSPRNG salt.
    pub fn new(claim_name: &str, claim_value: serde_json::Value) -> Self {
        let mut salt = [0u8; SALT_LEN];
        rand::rngs::OsRng.fill_bytes(&mut salt);
        Self::with_salt(&URL_SAFE_NO_PAD.encode(salt), claim_name, claim_value)
    }

    fn with_salt(salt_b64: &str, claim_name: &str, claim_value: serde_json::Value) -> Self {
        let array = serde_json::json!([salt_b64, claim_name, claim_value]);
        // serde_json renders arrays without spaces; the digest is computed
        // over exactly these bytes, base64url-encoded.
        let encoded = URL_SAFE_NO_PAD.encode(array.to_string().as_bytes());
        Self {
            claim_name: claim_name.to_string(),
            claim_value,
            encoded,
        }
    }

    /// Parse a base64url disclosure string back into its triple.
    pub fn parse(encoded: &str) -> Result<Self, SdJwtError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded.trim_end_matches('='))
            .map_err(|e| SdJwtError::InvalidIssuance(format!("disclosure base64url: {e}")))?;
        let array: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| SdJwtError::InvalidIssuance(format!("disclosure JSON: {e}")))?;
        let parts = array
            .as_array()
            .filter(|a| a.len() == 3)
            .ok_or_else(|| {
                SdJwtError::InvalidIssuance("disclosure is not a [salt, name, value] array".into())
            })?;
        let claim_name = parts[1]
            .as_str()
            .ok_or_else(|| SdJwtError::InvalidIssuance("claim name is not a string".into()))?;
        Ok(Self {
            claim_name: claim_name.to_string(),
            claim_value: parts[2].clone(),
            // Preserve the original encoding — digests cover the exact bytes.
            encoded: encoded.trim_end_matches('=').to_string(),
        })
    }

    /// The claim name.
    pub fn claim_name(&self) -> &str {
        &self.claim_name
    }

    /// The claim value.
    pub fn claim_value(&self) -> &serde_json::Value {
        &self.claim_value
    }

    /// The base64url wire form released with the credential.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    /// The SHA-256 digest embedded in the signed body for this disclosure.
    pub fn digest(&self) -> String {
        digest_of(&self.encoded)
    }
}

/// base64url(SHA-256(ascii(encoded disclosure))).
pub(crate) fn digest_of(encoded: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(encoded.as_bytes()))
}

/// A decoy digest: the digest of a fresh random salt, indistinguishable
/// from a real disclosure digest.
pub(crate) fn decoy_digest() -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    URL_SAFE_NO_PAD.encode(Sha256::digest(URL_SAFE_NO_PAD.encode(salt).as_bytes()))
}

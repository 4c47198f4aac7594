//! # Holder Public Keys
//!
//! Parses the credential holder's device public key and identifies its
//! curve. The key arrives base64url-encoded, wrapping either a PEM
//! `SubjectPublicKeyInfo` or its raw DER, on one of the three NIST prime
//! curves. The parsed form exposes fixed-width big-endian x/y coordinates
//! for embedding in proof-of-possession structures.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use pkcs8::DecodePublicKey;

use crate::error::CryptoError;

/// The NIST prime curve a holder key lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NistCurve {
    /// secp256r1.
    P256,
    /// secp384r1.
    P384,
    /// secp521r1.
    P521,
}

impl NistCurve {
    /// The JOSE `crv` identifier for this curve.
    pub fn jose_name(self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
        }
    }

    /// The COSE elliptic-curve registry identifier.
    pub fn cose_id(self) -> i64 {
        match self {
            Self::P256 => 1,
            Self::P384 => 2,
            Self::P521 => 3,
        }
    }

    /// Width of one coordinate in bytes.
    pub fn coordinate_len(self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }
}

/// A holder device public key: identified curve plus raw coordinates.
///
/// Request-scoped; parsed once per issuance and discarded with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolderPublicKey {
    curve: NistCurve,
    x: Vec<u8>,
    y: Vec<u8>,
}

impl HolderPublicKey {
    /// Parse a base64url-encoded PEM or DER `SubjectPublicKeyInfo`.
    ///
    /// This is the form the holder's device submits with an issuance
    /// request. Padded and unpadded base64url are both accepted.
    pub fn from_base64url(encoded: &str) -> Result<Self, CryptoError> {
        let trimmed: String = encoded
            .chars()
            .filter(|c| !c.is_whitespace())
            .take_while(|c| *c != '=')
            .collect();
        let bytes = URL_SAFE_NO_PAD
            .decode(trimmed.as_bytes())
            .map_err(|e| CryptoError::InvalidPublicKey(format!("base64url decode: {e}")))?;
        if bytes.starts_with(b"-----") {
            let pem = std::str::from_utf8(&bytes)
                .map_err(|_| CryptoError::InvalidPublicKey("PEM is not UTF-8".to_string()))?;
            Self::from_spki_pem(pem)
        } else {
            Self::from_spki_der(&bytes)
        }
    }

    /// Parse a PEM-encoded `SubjectPublicKeyInfo`.
    pub fn from_spki_pem(pem: &str) -> Result<Self, CryptoError> {
        if let Ok(key) = p256::PublicKey::from_public_key_pem(pem) {
            return Self::from_p256(&key);
        }
        if let Ok(key) = p384::PublicKey::from_public_key_pem(pem) {
            let point = key.to_encoded_point(false);
            return Self::from_coordinates(NistCurve::P384, &point);
        }
        if let Ok(key) = p521::PublicKey::from_public_key_pem(pem) {
            let point = key.to_encoded_point(false);
            return Self::from_coordinates(NistCurve::P521, &point);
        }
        Err(CryptoError::UnsupportedCurve(
            "holder key is not on P-256, P-384, or P-521".to_string(),
        ))
    }

    /// Parse a DER-encoded `SubjectPublicKeyInfo`.
    pub fn from_spki_der(der: &[u8]) -> Result<Self, CryptoError> {
        if let Ok(key) = p256::PublicKey::from_public_key_der(der) {
            return Self::from_p256(&key);
        }
        if let Ok(key) = p384::PublicKey::from_public_key_der(der) {
            let point = key.to_encoded_point(false);
            return Self::from_coordinates(NistCurve::P384, &point);
        }
        if let Ok(key) = p521::PublicKey::from_public_key_der(der) {
            let point = key.to_encoded_point(false);
            return Self::from_coordinates(NistCurve::P521, &point);
        }
        Err(CryptoError::UnsupportedCurve(
            "holder key is not on P-256, P-384, or P-521".to_string(),
        ))
    }

    fn from_p256(key: &p256::PublicKey) -> Result<Self, CryptoError> {
        let point = key.to_encoded_point(false);
        Self::from_coordinates(NistCurve::P256, &point)
    }

    fn from_coordinates(
        curve: NistCurve,
        point: &impl AsRef<[u8]>,
    ) -> Result<Self, CryptoError> {
        // Uncompressed SEC1: 0x04 || x || y, both fixed width.
        let bytes = point.as_ref();
        let len = curve.coordinate_len();
        if bytes.len() != 1 + 2 * len || bytes[0] != 0x04 {
            return Err(CryptoError::InvalidPublicKey(format!(
                "expected uncompressed point of {} bytes, got {}",
                1 + 2 * len,
                bytes.len()
            )));
        }
        Ok(Self {
            curve,
            x: bytes[1..1 + len].to_vec(),
            y: bytes[1 + len..].to_vec(),
        })
    }

    /// The identified curve.
    pub fn curve(&self) -> NistCurve {
        self.curve
    }

    /// Fixed-width big-endian x coordinate.
    pub fn x(&self) -> &[u8] {
        &self.x
    }

    /// Fixed-width big-endian y coordinate.
    pub fn y(&self) -> &[u8] {
        &self.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::pkcs8::EncodePublicKey;

    fn b64url(bytes: &[u8]) -> String {
        URL_SAFE_NO_PAD.encode(bytes)
    }

    fn p256_pem() -> String {
        let secret = p256::SecretKey::random(&mut rand_core::OsRng);
        secret
            .public_key()
            .to_public_key_pem(Default::default())
            .unwrap()
    }

    #[test]
    fn parses_p256_pem() {
        let key = HolderPublicKey::from_base64url(&b64url(p256_pem().as_bytes())).unwrap();
        assert_eq!(key.curve(), NistCurve::P256);
        assert_eq!(key.x().len(), 32);
        assert_eq!(key.y().len(), 32);
    }

    #[test]
    fn parses_p384_pem() {
        let secret = p384::SecretKey::random(&mut rand_core::OsRng);
        let pem = secret
            .public_key()
            .to_public_key_pem(Default::default())
            .unwrap();
        let key = HolderPublicKey::from_base64url(&b64url(pem.as_bytes())).unwrap();
        assert_eq!(key.curve(), NistCurve::P384);
        assert_eq!(key.x().len(), 48);
    }

    #[test]
    fn parses_p521_pem() {
        let secret = p521::SecretKey::random(&mut rand_core::OsRng);
        let pem = secret
            .public_key()
            .to_public_key_pem(Default::default())
            .unwrap();
        let key = HolderPublicKey::from_base64url(&b64url(pem.as_bytes())).unwrap();
        assert_eq!(key.curve(), NistCurve::P521);
        assert_eq!(key.x().len(), 66);
        assert_eq!(key.y().len(), 66);
    }

    #[test]
    fn parses_der_form() {
        let secret = p256::SecretKey::random(&mut rand_core::OsRng);
        let der = secret.public_key().to_public_key_der().unwrap();
        let key = HolderPublicKey::from_base64url(&b64url(der.as_bytes())).unwrap();
        assert_eq!(key.curve(), NistCurve::P256);
    }

    #[test]
    fn accepts_padded_base64url() {
        let pem = p256_pem();
        let padded = base64::engine::general_purpose::URL_SAFE.encode(pem.as_bytes());
        let key = HolderPublicKey::from_base64url(&padded).unwrap();
        assert_eq!(key.curve(), NistCurve::P256);
    }

    #[test]
    fn rejects_unknown_curve() {
        // An Ed25519 SPKI is a well-formed key on none of the three curves.
        let spki_der: &[u8] = &[
            0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00, 0x3b, 0xa9,
            0x7e, 0xd4, 0xab, 0x9d, 0x3d, 0x68, 0x80, 0x4e, 0x97, 0x38, 0x9b, 0x0c, 0x81, 0x02,
            0x21, 0xa1, 0x98, 0xd9, 0x42, 0x5d, 0x12, 0x9f, 0x0f, 0xba, 0xf8, 0x6b, 0x10, 0x52,
            0x12, 0xd9,
        ];
        let result = HolderPublicKey::from_base64url(&b64url(spki_der));
        assert!(matches!(result, Err(CryptoError::UnsupportedCurve(_))));
    }

    #[test]
    fn rejects_garbage_base64() {
        let result = HolderPublicKey::from_base64url("not base64 at all!!!");
        assert!(matches!(result, Err(CryptoError::InvalidPublicKey(_))));
    }

    #[test]
    fn curve_identifiers() {
        assert_eq!(NistCurve::P256.jose_name(), "P-256");
        assert_eq!(NistCurve::P384.jose_name(), "P-384");
        assert_eq!(NistCurve::P521.jose_name(), "P-521");
        assert_eq!(NistCurve::P256.cose_id(), 1);
        assert_eq!(NistCurve::P384.cose_id(), 2);
        assert_eq!(NistCurve::P521.cose_id(), 3);
    }
}

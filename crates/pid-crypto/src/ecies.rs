//! # Secure Channel Cipher
//!
//! Hybrid (ECIES-pattern) encryption of a finished credential for transport
//! back through the federation intermediary: a fresh ephemeral P-256 key
//! pair per call, ECDH against the recipient's certificate key, HKDF-SHA256
//! to derive the AES-256-GCM key and nonce, and a detached authentication
//! tag. The ephemeral public key travels as raw concatenated (x, y)
//! coordinates — the wire contract is positional, not self-describing.
//!
//! ## Security Invariants
//!
//! - Every envelope uses a freshly generated ephemeral key, so the derived
//!   key/nonce pair is unique per call. Reuse is a correctness violation.
//! - Decryption fails closed: a tag mismatch yields
//!   [`CryptoError::Authentication`] and no plaintext, partial or otherwise.

use aes_gcm::aead::AeadInPlace;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce, Tag};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hkdf::Hkdf;
use p256::elliptic_curve::generic_array::GenericArray;
use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use x509_cert::der::{Decode, DecodePem, Encode};
use x509_cert::Certificate;

use crate::error::CryptoError;

/// AES-GCM nonce width in bytes.
const NONCE_LEN: usize = 12;
/// AES-GCM authentication tag width in bytes.
const TAG_LEN: usize = 16;
/// Raw untagged P-256 point width: x || y.
const POINT_LEN: usize = 64;
/// HKDF domain-separation label for the secure channel.
const KDF_INFO: &[u8] = b"pid-secure-channel";

/// One encrypted delivery: ciphertext plus the material the recipient
/// needs to recompute the shared secret and verify integrity.
///
/// Bound to exactly one recipient key and one plaintext; never reused.
#[derive(Clone, PartialEq, Eq)]
pub struct SecureEnvelope {
    /// AEAD ciphertext without the tag.
    pub ciphertext: Vec<u8>,
    /// The 12-byte AEAD nonce.
    pub nonce: [u8; NONCE_LEN],
    /// The detached 16-byte authentication tag.
    pub auth_tag: [u8; TAG_LEN],
    /// Ephemeral public key as raw big-endian x || y (64 bytes).
    pub ephemeral_public_key: Vec<u8>,
}

impl std::fmt::Debug for SecureEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureEnvelope")
            .field("ciphertext_len", &self.ciphertext.len())
            .field("nonce", &self.nonce)
            .field("auth_tag", &self.auth_tag)
            .finish_non_exhaustive()
    }
}

impl SecureEnvelope {
    /// Encode all four fields as base64url for the redirect response.
    pub fn to_wire(&self) -> SecureEnvelopeWire {
        SecureEnvelopeWire {
            ciphertext: URL_SAFE_NO_PAD.encode(&self.ciphertext),
            nonce: URL_SAFE_NO_PAD.encode(self.nonce),
            auth_tag: URL_SAFE_NO_PAD.encode(self.auth_tag),
            ephemeral_public_key: URL_SAFE_NO_PAD.encode(&self.ephemeral_public_key),
        }
    }

    /// Decode a wire-form envelope back to bytes.
    pub fn from_wire(wire: &SecureEnvelopeWire) -> Result<Self, CryptoError> {
        let decode = |field: &str, s: &str| {
            URL_SAFE_NO_PAD
                .decode(s.trim_end_matches('='))
                .map_err(|e| CryptoError::InvalidEnvelope(format!("{field}: {e}")))
        };
        let nonce: [u8; NONCE_LEN] = decode("nonce", &wire.nonce)?
            .try_into()
            .map_err(|_| CryptoError::InvalidEnvelope("nonce must be 12 bytes".to_string()))?;
        let auth_tag: [u8; TAG_LEN] = decode("auth_tag", &wire.auth_tag)?
            .try_into()
            .map_err(|_| CryptoError::InvalidEnvelope("auth tag must be 16 bytes".to_string()))?;
        Ok(Self {
            ciphertext: decode("ciphertext", &wire.ciphertext)?,
            nonce,
            auth_tag,
            ephemeral_public_key: decode("ephemeral_public_key", &wire.ephemeral_public_key)?,
        })
    }
}

/// Base64url rendition of a [`SecureEnvelope`] — the four redirect fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecureEnvelopeWire {
    /// Base64url ciphertext.
    pub ciphertext: String,
    /// Base64url nonce.
    pub nonce: String,
    /// Base64url authentication tag.
    pub auth_tag: String,
    /// Base64url raw (x, y) ephemeral public key.
    pub ephemeral_public_key: String,
}

/// Hybrid encryption of credential payloads for one recipient.
pub struct SecureChannelCipher;

impl SecureChannelCipher {
    /// Extract the recipient's P-256 public key from an X.509 certificate
    /// (PEM or DER).
    pub fn recipient_key_from_certificate(cert: &[u8]) -> Result<p256::PublicKey, CryptoError> {
        let parsed = if cert.starts_with(b"-----") {
            let pem = std::str::from_utf8(cert)
                .map_err(|_| CryptoError::InvalidCertificate("PEM is not UTF-8".to_string()))?;
            Certificate::from_pem(pem)
                .map_err(|e| CryptoError::InvalidCertificate(e.to_string()))?
        } else {
            Certificate::from_der(cert)
                .map_err(|e| CryptoError::InvalidCertificate(e.to_string()))?
        };
        let spki = parsed
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| CryptoError::InvalidCertificate(e.to_string()))?;
        use pkcs8::DecodePublicKey;
        p256::PublicKey::from_public_key_der(&spki).map_err(|_| {
            CryptoError::UnsupportedCurve(
                "recipient certificate key is not on P-256".to_string(),
            )
        })
    }

    /// Encrypt a payload for the holder of the certificate's private key.
    pub fn encrypt_for_certificate(
        cert: &[u8],
        plaintext: &[u8],
    ) -> Result<SecureEnvelope, CryptoError> {
        let recipient = Self::recipient_key_from_certificate(cert)?;
        Self::encrypt(&recipient, plaintext)
    }

    /// Encrypt a payload under a recipient public key.
    ///
    /// Generates a fresh ephemeral key pair per call; two encryptions of
    /// the same plaintext for the same recipient never share key, nonce,
    /// or ciphertext.
    pub fn encrypt(
        recipient: &p256::PublicKey,
        plaintext: &[u8],
    ) -> Result<SecureEnvelope, CryptoError> {
        let ephemeral = p256::ecdh::EphemeralSecret::random(&mut rand_core::OsRng);
        let ephemeral_point = ephemeral.public_key().to_encoded_point(false);
        let shared = ephemeral.diffie_hellman(recipient);

        let (key, nonce) = derive_key_and_nonce(shared.raw_secret_bytes().as_slice())?;
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| CryptoError::Encryption(format!("cipher init failed: {e}")))?;

        let mut buffer = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(Nonce::from_slice(&nonce), b"", &mut buffer)
            .map_err(|_| CryptoError::Encryption("AEAD encryption failed".to_string()))?;

        let mut ephemeral_xy = Vec::with_capacity(POINT_LEN);
        // Skip the 0x04 uncompressed-point marker; the wire form is bare x || y.
        ephemeral_xy.extend_from_slice(&ephemeral_point.as_bytes()[1..]);

        let auth_tag: [u8; TAG_LEN] = tag
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::Encryption("unexpected tag width".to_string()))?;

        tracing::debug!(plaintext_len = plaintext.len(), "secure envelope sealed");

        Ok(SecureEnvelope {
            ciphertext: buffer,
            nonce,
            auth_tag,
            ephemeral_public_key: ephemeral_xy,
        })
    }

    /// Decrypt an envelope with the recipient's private key.
    ///
    /// Fails closed: any tag mismatch (tampered ciphertext, tag, or wrong
    /// key) yields [`CryptoError::Authentication`].
    pub fn decrypt(
        envelope: &SecureEnvelope,
        recipient_secret: &p256::SecretKey,
    ) -> Result<Vec<u8>, CryptoError> {
        if envelope.ephemeral_public_key.len() != POINT_LEN {
            return Err(CryptoError::InvalidEnvelope(format!(
                "ephemeral key must be {POINT_LEN} raw bytes, got {}",
                envelope.ephemeral_public_key.len()
            )));
        }
        let point = p256::EncodedPoint::from_untagged_bytes(GenericArray::from_slice(
            &envelope.ephemeral_public_key,
        ));
        let ephemeral_public: p256::PublicKey =
            Option::from(p256::PublicKey::from_encoded_point(&point)).ok_or_else(|| {
                CryptoError::InvalidPublicKey(
                    "ephemeral coordinates are not a P-256 point".to_string(),
                )
            })?;

        let shared = p256::ecdh::diffie_hellman(
            recipient_secret.to_nonzero_scalar(),
            ephemeral_public.as_affine(),
        );
        let (key, _derived_nonce) = derive_key_and_nonce(shared.raw_secret_bytes().as_slice())?;
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| CryptoError::Encryption(format!("cipher init failed: {e}")))?;

        let mut buffer = envelope.ciphertext.clone();
        cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(&envelope.nonce),
                b"",
                &mut buffer,
                Tag::from_slice(&envelope.auth_tag),
            )
            .map_err(|_| CryptoError::Authentication)?;
        Ok(buffer)
    }
}

/// Derive the AES-256 key and the nonce from an ECDH shared secret.
///
/// Both come from one HKDF expand so the nonce is fresh exactly when the
/// ephemeral key is.
fn derive_key_and_nonce(shared_secret: &[u8]) -> Result<([u8; 32], [u8; NONCE_LEN]), CryptoError> {
    let hk = Hkdf::<Sha256>::new(None, shared_secret);
    let mut okm = [0u8; 32 + NONCE_LEN];
    hk.expand(KDF_INFO, &mut okm)
        .map_err(|_| CryptoError::Encryption("HKDF expand failed".to_string()))?;
    let mut key = [0u8; 32];
    key.copy_from_slice(&okm[..32]);
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&okm[32..]);
    Ok((key, nonce))
}

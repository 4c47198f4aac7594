//! # Issuer Key Material
//!
//! Resolves a country code to the signing key and certificate used for
//! that country's credentials. Two backends behind one trait:
//!
//! - [`ConfigKeyMaterialProvider`]: loads PEM key files and certificates
//!   from paths named in an explicit configuration, once, at construction.
//! - [`InMemoryKeyMaterialProvider`]: fixture keys for tests.
//!
//! ## Security Invariants
//!
//! - Key material is read-only after construction. Rotation is a
//!   provider swap, never in-place mutation of key bytes.
//! - Builders borrow an [`IssuerKeyMaterial`] for one signing operation
//!   and never persist it.
//! - Passphrases and PEM contents pass through `Zeroizing` buffers.

use std::collections::BTreeMap;
use std::path::PathBuf;

use pkcs8::DecodePrivateKey;
use serde::{Deserialize, Serialize};
use x509_cert::der::{Decode, DecodePem, Encode};
use x509_cert::Certificate;
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// A country's signing key, key identifier, and certificate.
///
/// The signing key is a P-256 scalar; every issuer signature in both
/// credential formats is ES256.
#[derive(Clone)]
pub struct IssuerKeyMaterial {
    signing_key: p256::SecretKey,
    key_id: String,
    certificate_der: Vec<u8>,
}

impl std::fmt::Debug for IssuerKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuerKeyMaterial")
            .field("key_id", &self.key_id)
            .field("certificate_der_len", &self.certificate_der.len())
            .finish_non_exhaustive()
    }
}

impl IssuerKeyMaterial {
    /// Assemble key material from a PEM private key and a certificate.
    ///
    /// The private key may be PKCS#8 (optionally passphrase-encrypted)
    /// or SEC1 `EC PRIVATE KEY`. The certificate may be PEM or DER; it is
    /// normalized to DER for embedding in credentials.
    pub fn from_pem(
        private_key_pem: &str,
        passphrase: Option<&str>,
        certificate: &[u8],
        key_id: &str,
    ) -> Result<Self, CryptoError> {
        let signing_key = parse_private_key_pem(private_key_pem, passphrase)?;
        let certificate_der = normalize_certificate(certificate)?;
        Ok(Self {
            signing_key,
            key_id: key_id.to_string(),
            certificate_der,
        })
    }

    /// Wrap an already-parsed secret key (test fixtures, HSM adapters).
    pub fn from_secret_key(
        signing_key: p256::SecretKey,
        certificate: &[u8],
        key_id: &str,
    ) -> Result<Self, CryptoError> {
        Ok(Self {
            signing_key,
            key_id: key_id.to_string(),
            certificate_der: normalize_certificate(certificate)?,
        })
    }

    /// The P-256 signing key.
    pub fn signing_key(&self) -> &p256::SecretKey {
        &self.signing_key
    }

    /// The key identifier carried in signature headers.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The issuer certificate, DER-encoded.
    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    /// The public half of the signing key.
    pub fn public_key(&self) -> p256::PublicKey {
        self.signing_key.public_key()
    }

    /// The private scalar as minimal-length big-endian bytes — the form a
    /// COSE_Key `d` parameter carries.
    pub fn cose_scalar_bytes(&self) -> Zeroizing<Vec<u8>> {
        let fixed = self.signing_key.to_bytes();
        let start = fixed
            .iter()
            .position(|&b| b != 0)
            .unwrap_or(fixed.len() - 1);
        Zeroizing::new(fixed[start..].to_vec())
    }
}

fn parse_private_key_pem(
    pem: &str,
    passphrase: Option<&str>,
) -> Result<p256::SecretKey, CryptoError> {
    if pem.contains("ENCRYPTED PRIVATE KEY") {
        let passphrase = passphrase.ok_or_else(|| {
            CryptoError::KeyMaterial("key is encrypted but no passphrase configured".to_string())
        })?;
        return p256::SecretKey::from_pkcs8_encrypted_pem(pem, passphrase.as_bytes())
            .map_err(|_| CryptoError::KeyMaterial("PKCS#8 decryption failed".to_string()));
    }
    if pem.contains("EC PRIVATE KEY") {
        return p256::SecretKey::from_sec1_pem(pem)
            .map_err(|_| CryptoError::KeyMaterial("SEC1 key did not parse as P-256".to_string()));
    }
    p256::SecretKey::from_pkcs8_pem(pem)
        .map_err(|_| CryptoError::KeyMaterial("PKCS#8 key did not parse as P-256".to_string()))
}

fn normalize_certificate(certificate: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let parsed = if certificate.starts_with(b"-----") {
        let pem = std::str::from_utf8(certificate)
            .map_err(|_| CryptoError::InvalidCertificate("PEM is not UTF-8".to_string()))?;
        Certificate::from_pem(pem).map_err(|e| CryptoError::InvalidCertificate(e.to_string()))?
    } else {
        Certificate::from_der(certificate)
            .map_err(|e| CryptoError::InvalidCertificate(e.to_string()))?
    };
    parsed
        .to_der()
        .map_err(|e| CryptoError::InvalidCertificate(e.to_string()))
}

/// Trait for resolving a country code to its issuer key material.
///
/// Implementations must be `Send + Sync`; issuance requests for different
/// countries run concurrently against one shared provider.
pub trait KeyMaterialProvider: Send + Sync {
    /// The key material for a country, borrowed for one signing operation.
    fn issuer_key(&self, country: &str) -> Result<&IssuerKeyMaterial, CryptoError>;

    /// Human-readable name for this provider (for diagnostics/logging).
    fn provider_name(&self) -> &str;
}

// ─── ConfigKeyMaterialProvider ───────────────────────────────────────────

/// Where one country's key material lives on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeySource {
    /// Path to the PEM private key (PKCS#8, encrypted PKCS#8, or SEC1).
    pub private_key_path: PathBuf,
    /// Passphrase for an encrypted private key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    /// Path to the issuer certificate (PEM or DER).
    pub certificate_path: PathBuf,
    /// Key identifier carried in signature headers.
    pub key_id: String,
}

/// Loads key material from configured file paths, once, at construction.
///
/// The loaded map is immutable; concurrent issuances share it read-only.
pub struct ConfigKeyMaterialProvider {
    keys: BTreeMap<String, IssuerKeyMaterial>,
}

impl ConfigKeyMaterialProvider {
    /// Load every configured country's key material from disk.
    ///
    /// Fails fast: one unreadable key or wrong passphrase aborts
    /// construction rather than surfacing at issuance time.
    pub fn load(sources: &BTreeMap<String, KeySource>) -> Result<Self, CryptoError> {
        let mut keys = BTreeMap::new();
        for (country, source) in sources {
            let pem = Zeroizing::new(std::fs::read_to_string(&source.private_key_path)?);
            let certificate = std::fs::read(&source.certificate_path)?;
            let material = IssuerKeyMaterial::from_pem(
                &pem,
                source.passphrase.as_deref(),
                &certificate,
                &source.key_id,
            )?;
            tracing::debug!(country = %country, key_id = %source.key_id, "issuer key loaded");
            keys.insert(country.clone(), material);
        }
        Ok(Self { keys })
    }
}

impl KeyMaterialProvider for ConfigKeyMaterialProvider {
    fn issuer_key(&self, country: &str) -> Result<&IssuerKeyMaterial, CryptoError> {
        self.keys
            .get(country)
            .ok_or_else(|| CryptoError::UnknownCountry(country.to_string()))
    }

    fn provider_name(&self) -> &str {
        "ConfigKeyMaterialProvider"
    }
}

// ─── InMemoryKeyMaterialProvider ─────────────────────────────────────────

/// Fixture key material held directly in memory, for tests.
#[derive(Default)]
pub struct InMemoryKeyMaterialProvider {
    keys: BTreeMap<String, IssuerKeyMaterial>,
}

impl InMemoryKeyMaterialProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register key material for a country.
    pub fn with_key(mut self, country: &str, material: IssuerKeyMaterial) -> Self {
        self.keys.insert(country.to_string(), material);
        self
    }
}

impl KeyMaterialProvider for InMemoryKeyMaterialProvider {
    fn issuer_key(&self, country: &str) -> Result<&IssuerKeyMaterial, CryptoError> {
        self.keys
            .get(country)
            .ok_or_else(|| CryptoError::UnknownCountry(country.to_string()))
    }

    fn provider_name(&self) -> &str {
        "InMemoryKeyMaterialProvider"
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────

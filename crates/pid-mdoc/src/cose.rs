//! # COSE Encoding
//!
//! Hand-assembled COSE structures for issuer authentication: the
//! COSE_Sign1 envelope over the mobile security object and the COSE_Key
//! rendition of the holder's device key. Labels follow the COSE registry
//! (`alg` = 1, `kid` = 4, `x5chain` = 33; key parameters `kty` = 1,
//! `crv` = -1, `x` = -2, `y` = -3).

use ciborium::value::Value;
use p256::ecdsa::{signature::Signer, Signature, SigningKey};

use pid_crypto::{HolderPublicKey, IssuerKeyMaterial};

use crate::error::MdocError;

/// COSE algorithm identifier for ES256 (ECDSA w/ SHA-256).
const ALG_ES256: i64 = -7;
/// COSE header label for the key identifier.
const HEADER_KID: i64 = 4;
/// COSE header label for an X.509 certificate chain.
const HEADER_X5CHAIN: i64 = 33;

pub(crate) fn to_cbor(value: &Value) -> Result<Vec<u8>, MdocError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| MdocError::Cbor(e.to_string()))?;
    Ok(buf)
}

/// Encode the protected header: `{1: -7}` (alg ES256).
fn protected_header() -> Result<Vec<u8>, MdocError> {
    to_cbor(&Value::Map(vec![(
        Value::Integer(1i64.into()),
        Value::Integer(ALG_ES256.into()),
    )]))
}

/// Build an untagged COSE_Sign1 array over `payload` with the issuer key.
///
/// The unprotected header carries the key identifier and the issuer
/// certificate for chain validation. The signature is raw `r || s`.
pub(crate) fn sign1(payload: Vec<u8>, issuer: &IssuerKeyMaterial) -> Result<Value, MdocError> {
    let protected = protected_header()?;

    // Sig_structure = ["Signature1", protected, external_aad, payload]
    let sig_structure = Value::Array(vec![
        Value::Text("Signature1".to_string()),
        Value::Bytes(protected.clone()),
        Value::Bytes(Vec::new()),
        Value::Bytes(payload.clone()),
    ]);
    let to_be_signed = to_cbor(&sig_structure)?;

    let signing_key = SigningKey::from(issuer.signing_key());
    let signature: Signature = signing_key
        .try_sign(&to_be_signed)
        .map_err(|e| MdocError::Signing(e.to_string()))?;

    let unprotected = Value::Map(vec![
        (
            Value::Integer(HEADER_KID.into()),
            Value::Bytes(issuer.key_id().as_bytes().to_vec()),
        ),
        (
            Value::Integer(HEADER_X5CHAIN.into()),
            Value::Bytes(issuer.certificate_der().to_vec()),
        ),
    ]);

    Ok(Value::Array(vec![
        Value::Bytes(protected),
        unprotected,
        Value::Bytes(payload),
        Value::Bytes(signature.to_bytes().to_vec()),
    ]))
}

/// Encode the holder's device key as a COSE_Key map (EC2, curve, x, y).
pub(crate) fn device_cose_key(holder: &HolderPublicKey) -> Value {
    Value::Map(vec![
        (Value::Integer(1i64.into()), Value::Integer(2i64.into())),
        (
            Value::Integer((-1i64).into()),
            Value::Integer(holder.curve().cose_id().into()),
        ),
        (
            Value::Integer((-2i64).into()),
            Value::Bytes(holder.x().to_vec()),
        ),
        (
            Value::Integer((-3i64).into()),
            Value::Bytes(holder.y().to_vec()),
        ),
    ])
}

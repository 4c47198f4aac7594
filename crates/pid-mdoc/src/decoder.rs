//! # mdoc Namespace Decoding
//!
//! The inverse of construction: decodes an encoded mdoc back into its
//! namespace → (element, value) structure for introspection and testing.
//! Pure; never inspects or verifies the issuer signature.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ciborium::value::Value;

use pid_core::{parse_calendar_date, ElementValue};

use crate::builder::{TAG_DATE_TIME, TAG_ENCODED_CBOR, TAG_FULL_DATE};
use crate::error::MdocError;

/// Decoded namespaces: element (identifier, value) pairs in item order.
pub type DecodedNamespaces = BTreeMap<String, Vec<(String, ElementValue)>>;

/// Decode a base64url mdoc into its namespace contents.
///
/// Structurally invalid input — bad base64, bad CBOR, or a document of the
/// wrong shape — fails with [`MdocError::MalformedCredential`]. Date-tagged
/// element values decode to their date, not the tag wrapper.
pub fn decode_mdoc(encoded: &str) -> Result<DecodedNamespaces, MdocError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded.trim().trim_end_matches('='))
        .map_err(|e| MdocError::MalformedCredential(format!("base64url decode: {e}")))?;

    let top: Value = ciborium::from_reader(bytes.as_slice())
        .map_err(|e| MdocError::MalformedCredential(format!("CBOR decode: {e}")))?;

    let documents = map_get(&top, "documents")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("documents array missing"))?;
    let document = documents
        .first()
        .ok_or_else(|| malformed("documents array is empty"))?;
    let namespaces = map_get(document, "issuerSigned")
        .and_then(|signed| map_get(signed, "nameSpaces"))
        .and_then(Value::as_map)
        .ok_or_else(|| malformed("issuerSigned.nameSpaces missing"))?;

    let mut decoded = DecodedNamespaces::new();
    for (namespace, items) in namespaces {
        let namespace = namespace
            .as_text()
            .ok_or_else(|| malformed("namespace identifier is not text"))?;
        let items = items
            .as_array()
            .ok_or_else(|| malformed("namespace items are not an array"))?;

        let mut elements = Vec::with_capacity(items.len());
        for item in items {
            elements.push(decode_item(item)?);
        }
        decoded.insert(namespace.to_string(), elements);
    }
    Ok(decoded)
}

/// Decode one `#6.24(bstr .cbor IssuerSignedItem)` into (identifier, value).
fn decode_item(item: &Value) -> Result<(String, ElementValue), MdocError> {
    let Value::Tag(TAG_ENCODED_CBOR, inner) = item else {
        return Err(malformed("item is not an embedded-CBOR tag"));
    };
    let Value::Bytes(bytes) = inner.as_ref() else {
        return Err(malformed("item tag does not wrap bytes"));
    };
    let item: Value = ciborium::from_reader(bytes.as_slice())
        .map_err(|e| MdocError::MalformedCredential(format!("item CBOR decode: {e}")))?;

    let identifier = map_get(&item, "elementIdentifier")
        .and_then(Value::as_text)
        .ok_or_else(|| malformed("elementIdentifier missing"))?
        .to_string();
    let value = map_get(&item, "elementValue").ok_or_else(|| malformed("elementValue missing"))?;
    Ok((identifier, decode_element_value(value)?))
}

/// Decode one element value, unwrapping calendar-date tags.
fn decode_element_value(value: &Value) -> Result<ElementValue, MdocError> {
    match value {
        Value::Text(s) => Ok(ElementValue::Text(s.clone())),
        Value::Bool(b) => Ok(ElementValue::Boolean(*b)),
        Value::Integer(i) => i64::try_from(i128::from(*i))
            .map(ElementValue::Integer)
            .map_err(|_| malformed("integer element value out of range")),
        Value::Tag(tag, inner) if *tag == TAG_FULL_DATE || *tag == TAG_DATE_TIME => {
            let text = inner
                .as_text()
                .ok_or_else(|| malformed("date tag does not wrap text"))?;
            // Tag 0 values carry a time-of-day suffix; the calendar date is
            // the first ten characters either way.
            let date_part = text.get(..10).unwrap_or(text);
            parse_calendar_date(date_part)
                .map(ElementValue::Date)
                .map_err(|_| malformed("tagged date value does not parse"))
        }
        other => Err(MdocError::MalformedCredential(format!(
            "unsupported element value: {other:?}"
        ))),
    }
}

fn malformed(detail: &str) -> MdocError {
    MdocError::MalformedCredential(detail.to_string())
}

/// Look up a text key in a CBOR map value.
fn map_get<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.as_map()?.iter().find_map(|(k, v)| match k {
        Value::Text(t) if t == key => Some(v),
        _ => None,
    })
}

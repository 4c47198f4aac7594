//! # Attribute Sets
//!
//! The flat attribute data a credential is built from: a mapping from
//! namespace identifier to element identifier to [`ElementValue`]. The set
//! is produced by the federation layer, normalized externally, and handed
//! to the credential builders read-only.
//!
//! ## Security Invariant
//!
//! An [`AttributeSet`] is immutable after [`AttributeSetBuilder::build`].
//! Both credential builders read the same frozen set, so the mdoc and
//! SD-JWT renditions of one issuance cannot diverge mid-flight.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::temporal::parse_calendar_date;

/// A single attribute value with an explicit type tag.
///
/// Untagged on the wire: booleans, integers, and strings map directly;
/// strings in ISO `YYYY-MM-DD` form deserialize as [`ElementValue::Date`]
/// (date variants are tried before plain text).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementValue {
    /// A boolean flag, e.g. `age_over_18`.
    Boolean(bool),
    /// An integer value, e.g. `age_in_years`.
    Integer(i64),
    /// A calendar date, e.g. `birth_date`. Serializes as `YYYY-MM-DD`.
    Date(NaiveDate),
    /// Free text, e.g. `family_name`.
    Text(String),
}

impl ElementValue {
    /// Parse an ISO calendar string into a `Date` value.
    pub fn date_from_iso(s: &str) -> Result<Self, CoreError> {
        Ok(Self::Date(parse_calendar_date(s)?))
    }

    /// The date carried by this value, or an error for other tags.
    pub fn as_date(&self) -> Result<NaiveDate, CoreError> {
        match self {
            Self::Date(d) => Ok(*d),
            other => Err(CoreError::WrongValueType {
                expected: "date",
                value: format!("{other:?}"),
            }),
        }
    }

    /// The text carried by this value, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for ElementValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ElementValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for ElementValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i64> for ElementValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<NaiveDate> for ElementValue {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

/// The elements of one namespace, keyed by element identifier.
pub type NamespaceElements = BTreeMap<String, ElementValue>;

/// Namespaced attribute data for one issuance.
///
/// Namespaces double as claim-group identifiers on the SD-JWT side; both
/// builders iterate them by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSet {
    namespaces: BTreeMap<String, NamespaceElements>,
}

impl AttributeSet {
    /// Start building an attribute set.
    pub fn builder() -> AttributeSetBuilder {
        AttributeSetBuilder::default()
    }

    /// The elements of the named namespace, if present.
    pub fn namespace(&self, id: &str) -> Option<&NamespaceElements> {
        self.namespaces.get(id)
    }

    /// Iterate all namespaces in name order.
    pub fn namespaces(&self) -> impl Iterator<Item = (&str, &NamespaceElements)> {
        self.namespaces.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of namespaces in the set.
    pub fn namespace_count(&self) -> usize {
        self.namespaces.len()
    }

    /// `true` when the set carries no namespaces at all.
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}

/// Append-only builder for [`AttributeSet`].
#[derive(Debug, Default)]
pub struct AttributeSetBuilder {
    namespaces: BTreeMap<String, NamespaceElements>,
}

impl AttributeSetBuilder {
    /// Add one attribute under a namespace.
    pub fn attribute(
        mut self,
        namespace: &str,
        element: &str,
        value: impl Into<ElementValue>,
    ) -> Self {
        self.namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(element.to_string(), value.into());
        self
    }

    /// Add an empty namespace (a claim group with no attributes yet).
    pub fn namespace(mut self, namespace: &str) -> Self {
        self.namespaces.entry(namespace.to_string()).or_default();
        self
    }

    /// Freeze into an immutable [`AttributeSet`].
    pub fn build(self) -> AttributeSet {
        AttributeSet {
            namespaces: self.namespaces,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid_set() -> AttributeSet {
        AttributeSet::builder()
            .attribute("eu.europa.ec.eudiw.pid.1", "family_name", "Doe")
            .attribute("eu.europa.ec.eudiw.pid.1", "given_name", "Jane")
            .attribute(
                "eu.europa.ec.eudiw.pid.1",
                "birth_date",
                ElementValue::date_from_iso("1990-01-01").unwrap(),
            )
            .build()
    }

    #[test]
    fn builder_collects_namespaced_attributes() {
        let set = pid_set();
        assert_eq!(set.namespace_count(), 1);
        let ns = set.namespace("eu.europa.ec.eudiw.pid.1").unwrap();
        assert_eq!(ns.len(), 3);
        assert_eq!(ns["family_name"].as_text(), Some("Doe"));
    }

    #[test]
    fn missing_namespace_is_none() {
        let set = pid_set();
        assert!(set.namespace("org.iso.18013.5.1").is_none());
    }

    #[test]
    fn namespaces_iterate_in_name_order() {
        let set = AttributeSet::builder()
            .attribute("b.ns", "x", "1")
            .attribute("a.ns", "y", "2")
            .build();
        let names: Vec<&str> = set.namespaces().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a.ns", "b.ns"]);
    }

    #[test]
    fn date_value_roundtrip() {
        let v = ElementValue::date_from_iso("1990-01-01").unwrap();
        assert_eq!(
            v.as_date().unwrap(),
            NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()
        );
    }

    #[test]
    fn as_date_rejects_text() {
        let v = ElementValue::from("Doe");
        assert!(matches!(
            v.as_date(),
            Err(CoreError::WrongValueType { .. })
        ));
    }

    #[test]
    fn untagged_deserialize_detects_dates() {
        let set: AttributeSet = serde_json::from_str(
            r#"{"pid": {"family_name": "Doe", "birth_date": "1990-01-01", "age_over_18": true, "age": 34}}"#,
        )
        .unwrap();
        let ns = set.namespace("pid").unwrap();
        assert!(matches!(ns["family_name"], ElementValue::Text(_)));
        assert!(matches!(ns["birth_date"], ElementValue::Date(_)));
        assert!(matches!(ns["age_over_18"], ElementValue::Boolean(true)));
        assert!(matches!(ns["age"], ElementValue::Integer(34)));
    }

    #[test]
    fn serialize_date_as_iso_string() {
        let set = AttributeSet::builder()
            .attribute(
                "pid",
                "birth_date",
                ElementValue::date_from_iso("1990-01-01").unwrap(),
            )
            .build();
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["pid"]["birth_date"], "1990-01-01");
    }

    #[test]
    fn empty_namespace_is_carried() {
        let set = AttributeSet::builder().namespace("optional.group").build();
        assert_eq!(set.namespace_count(), 1);
        assert!(set.namespace("optional.group").unwrap().is_empty());
    }
}

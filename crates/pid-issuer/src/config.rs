//! # Service Configuration
//!
//! Explicit configuration for the issuance engine: which countries are
//! served, where their key material lives, and how the SD-JWT rendition is
//! tuned. Deserialized once at startup and passed into constructors —
//! never ambient global state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use pid_crypto::KeySource;
use pid_sdjwt::SdJwtOptions;

/// The document type issued when configuration does not override it.
pub const DEFAULT_DOCTYPE: &str = "eu.europa.ec.eudiw.pid.1";

/// Deployment configuration for the issuance engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Key material sources per ISO 3166-1 alpha-2 country code.
    pub countries: BTreeMap<String, KeySource>,

    /// The document type this deployment issues.
    #[serde(default = "default_doctype")]
    pub doctype: String,

    /// SD-JWT issuance tuning (status endpoint, trust framework, decoys).
    #[serde(default)]
    pub sd_jwt: SdJwtOptions,
}

fn default_doctype() -> String {
    DEFAULT_DOCTYPE.to_string()
}

impl ServiceConfig {
    /// A configuration with no countries, defaults elsewhere.
    pub fn empty() -> Self {
        Self {
            countries: BTreeMap::new(),
            doctype: default_doctype(),
            sd_jwt: SdJwtOptions::default(),
        }
    }
}

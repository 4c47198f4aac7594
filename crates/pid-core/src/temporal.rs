//! # Calendar Dates and Validity Windows
//!
//! Day-granularity date handling for credential validity. Attribute data
//! carries calendar dates as ISO `YYYY-MM-DD` strings; both credential
//! formats express validity as integer days since the Unix epoch. The
//! conversion lives here so the two encodings share one rule.
//!
//! ## Design Decision
//!
//! Validity is day-granular, not second-granular. A credential issued
//! anywhere in the world on `2024-01-01` has the same `iat` regardless of
//! the issuing service's local clock, which keeps the mdoc and SD-JWT
//! renditions of the same issuance consistent with each other.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Days from 0001-01-01 (Common Era day 1) to 1970-01-01.
const UNIX_EPOCH_CE_DAYS: i64 = 719_163;

/// Parse an ISO `YYYY-MM-DD` calendar date string.
pub fn parse_calendar_date(s: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| CoreError::InvalidDate(s.to_string()))
}

/// Convert a calendar date to whole days since 1970-01-01.
///
/// Dates before the epoch yield negative values.
pub fn epoch_days(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce()) - UNIX_EPOCH_CE_DAYS
}

/// The validity period of a credential.
///
/// Invariant: `issuance <= expiry`, enforced at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    /// The date the credential becomes valid.
    pub issuance: NaiveDate,
    /// The date the credential expires.
    pub expiry: NaiveDate,
}

impl ValidityWindow {
    /// Create a validity window, rejecting `issuance > expiry`.
    pub fn new(issuance: NaiveDate, expiry: NaiveDate) -> Result<Self, CoreError> {
        if issuance > expiry {
            return Err(CoreError::InvalidValidityWindow { issuance, expiry });
        }
        Ok(Self { issuance, expiry })
    }

    /// Create a validity window from ISO `YYYY-MM-DD` strings.
    pub fn from_iso(issuance: &str, expiry: &str) -> Result<Self, CoreError> {
        Self::new(parse_calendar_date(issuance)?, parse_calendar_date(expiry)?)
    }

    /// Issuance date as days since the Unix epoch.
    pub fn issuance_epoch_days(&self) -> i64 {
        epoch_days(self.issuance)
    }

    /// Expiry date as days since the Unix epoch.
    pub fn expiry_epoch_days(&self) -> i64 {
        epoch_days(self.expiry)
    }
}

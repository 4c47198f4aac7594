#![deny(missing_docs)]

//! # pid-core — Foundational Types for the PID Formatter
//!
//! This crate defines the data model shared by every credential format the
//! issuer produces. It has no internal crate dependencies — only `serde`,
//! `serde_json`, `chrono`, and `thiserror` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Tagged element values.** Every attribute value carries an explicit
//!    type tag ([`ElementValue`]). Encoders dispatch on the tag, never on an
//!    element-name allowlist.
//!
//! 2. **Append-only construction.** An [`AttributeSet`] is assembled through
//!    its builder and immutable afterwards. Credential builders borrow it;
//!    nothing mutates it once handed over.
//!
//! 3. **One date-to-epoch rule.** Both credential formats express validity
//!    as day-granularity epoch integers computed by
//!    [`ValidityWindow`]/[`epoch_days`] — a single conversion shared across
//!    formats so the two encodings can never disagree.

pub mod attributes;
pub mod error;
pub mod temporal;

// Re-export primary types at crate root for ergonomic imports.
pub use attributes::{AttributeSet, AttributeSetBuilder, ElementValue};
pub use error::CoreError;
pub use temporal::{epoch_days, parse_calendar_date, ValidityWindow};

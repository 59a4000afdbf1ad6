//! Signifyd Connect Core - Shared types library.
//!
//! This crate provides the types exchanged between the connector components:
//! - `connect` - Case building, verification adapters, submission orchestration
//! - `cli` - Command-line tools for building and submitting cases
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. The [`Case`] document is the payload sent to the
//! risk-scoring service; the [`CaseRecord`] is what the connector persists
//! per order.
//!
//! # Modules
//!
//! - [`types`] - Case document, case record, ids and status enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

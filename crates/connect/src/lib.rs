//! Signifyd Connect library.
//!
//! Builds Signifyd fraud-review cases from commerce platform orders, submits
//! them, and reconciles guarantee cancellations back onto the order.
//!
//! # Modules
//!
//! - [`order`] - Host platform order model and data-store boundary
//! - [`ip`] - Browser IP extraction from forwarded-for chains
//! - [`verification`] - Per-payment-method AVS/CVV/card field adapters
//! - [`builder`] - Case document assembly
//! - [`fingerprint`] - Device fingerprint session ids
//! - [`store`] - Case record persistence (in-memory and `PostgreSQL`)
//! - [`client`] - Signifyd case API client
//! - [`service`] - Submission and cancellation orchestration

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod ip;
pub mod order;
pub mod service;
pub mod store;
pub mod verification;

pub use builder::{CaseBuilder, CaseContext};
pub use client::{ApiError, CaseApi, HttpCaseClient};
pub use config::{ConfigError, ConnectConfig};
pub use error::ConnectError;
pub use fingerprint::{DeviceFingerprinter, StoreFingerprinter};
pub use order::{HostError, InMemoryOrderSource, Order, OrderSource};
pub use service::{CaseService, SubmissionOutcome};
pub use store::{CaseStore, InMemoryCaseStore, PgCaseStore, StoreError};
pub use verification::{AdapterRegistry, PaymentContext, VerificationReader};

/// Migrations for the `signifyd_case` table.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

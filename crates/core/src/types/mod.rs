//! Core types for the Signifyd connector.
//!
//! This module provides the case document model and the persisted case record.

pub mod case;
pub mod id;
pub mod record;
pub mod status;

pub use case::{
    Address, Card, Case, DiscountCode, Product, Purchase, Recipient, Shipment, UserAccount,
    VersionInfo,
};
pub use id::*;
pub use record::CaseRecord;
pub use status::*;

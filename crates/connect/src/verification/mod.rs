//! Payment verification data extraction.
//!
//! Every payment gateway stores AVS/CVV results and card details in its own
//! place. This module provides:
//! - [`VerificationAdapter`] - reads one field for one payment method
//! - [`AdapterRegistry`] - resolves `(payment method, field)` to an adapter,
//!   falling back to a no-op adapter for unknown methods
//! - [`VerificationReader`] - normalizes and validates what adapters return
//!
//! # Flow
//!
//! 1. The case builder asks the reader for a field (e.g. BIN)
//! 2. The reader resolves the adapter for the order's payment method
//! 3. The adapter fetches the raw value from the payment record or context
//! 4. The reader normalizes it and applies the field's validation rule
//! 5. Anything that fails along the way is logged and becomes `None`

mod adapters;
mod reader;
mod registry;

use std::collections::HashMap;

use thiserror::Error;

use crate::order::PaymentRecord;

pub use adapters::{
    CodeMapAdapter, DataSource, ExpiryAdapter, ExpiryPart, FieldAdapter, NullAdapter,
    PaymentColumn, ValidatedAdapter, AVS_CODES, CVV_CODES,
};
pub use reader::VerificationReader;
pub use registry::AdapterRegistry;

/// Card verification fields an adapter can provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerificationField {
    Avs,
    Cvv,
    Cardholder,
    Bin,
    Last4,
    ExpiryMonth,
    ExpiryYear,
}

impl VerificationField {
    /// Every field, in the order the card block is assembled.
    pub const ALL: [Self; 7] = [
        Self::Avs,
        Self::Cvv,
        Self::Cardholder,
        Self::Bin,
        Self::Last4,
        Self::ExpiryMonth,
        Self::ExpiryYear,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Avs => "avs",
            Self::Cvv => "cvv",
            Self::Cardholder => "cardholder",
            Self::Bin => "bin",
            Self::Last4 => "last4",
            Self::ExpiryMonth => "expiry_month",
            Self::ExpiryYear => "expiry_year",
        }
    }
}

impl std::fmt::Display for VerificationField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors an adapter can raise while reading a field.
///
/// These never leave the verification module: the reader logs them and
/// treats the field as absent.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The gateway stored a value in a shape the adapter cannot read.
    #[error("malformed {field} value: {value:?}")]
    Malformed { field: &'static str, value: String },
}

/// Transient payment data handed over by a gateway integration for a single
/// case build (e.g. the Payflow Link silent-post response).
///
/// It is moved into the build and dropped with it, so nothing carries over
/// to the next order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentContext {
    data: HashMap<String, String>,
}

impl PaymentContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<HashMap<String, String>> for PaymentContext {
    fn from(data: HashMap<String, String>) -> Self {
        Self { data }
    }
}

/// Reads one verification field for one payment method.
pub trait VerificationAdapter: Send + Sync + std::fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Raw field value, `None` when the gateway did not provide it.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError` when the stored value cannot be interpreted.
    fn data(
        &self,
        payment: &PaymentRecord,
        context: &PaymentContext,
    ) -> Result<Option<String>, AdapterError>;

    /// Whether a normalized value is acceptable for this field.
    fn validate(&self, _value: &str) -> bool {
        true
    }
}

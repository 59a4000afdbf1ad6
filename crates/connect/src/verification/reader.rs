//! Normalized, validated access to verification fields.

use tracing::{debug, error};

use crate::order::{OrderAddress, PaymentRecord};

use super::{AdapterRegistry, PaymentContext, VerificationAdapter, VerificationField};

/// Smallest BIN the risk service accepts (six significant digits).
const MIN_BIN: u64 = 100_000;

/// Reads verification fields for one payment.
///
/// Every accessor returns `None` when the adapter has nothing, when the
/// adapter fails, or when the value does not survive normalization.
#[derive(Debug, Clone, Copy)]
pub struct VerificationReader<'a> {
    registry: &'a AdapterRegistry,
    payment: &'a PaymentRecord,
    context: &'a PaymentContext,
}

/// Raw adapter output for one field.
enum Fetched {
    Value(String),
    Missing,
    Failed,
}

impl<'a> VerificationReader<'a> {
    #[must_use]
    pub const fn new(
        registry: &'a AdapterRegistry,
        payment: &'a PaymentRecord,
        context: &'a PaymentContext,
    ) -> Self {
        Self {
            registry,
            payment,
            context,
        }
    }

    /// AVS result code, one of the accepted AVS codes.
    #[must_use]
    pub fn avs_code(&self) -> Option<String> {
        self.code(VerificationField::Avs)
    }

    /// CVV result code, one of the accepted CVV codes.
    #[must_use]
    pub fn cvv_code(&self) -> Option<String> {
        self.code(VerificationField::Cvv)
    }

    /// Cardholder name in uppercase letters and single spaces.
    ///
    /// Falls back to the billing name when the adapter has no value. A failed
    /// adapter does not fall back.
    #[must_use]
    pub fn cardholder(&self, billing: Option<&OrderAddress>) -> Option<String> {
        let raw = match self.fetch(VerificationField::Cardholder) {
            Fetched::Value(value) => value,
            Fetched::Missing => billing_name(billing?),
            Fetched::Failed => return None,
        };
        sanitize_cardholder(&raw)
    }

    #[must_use]
    pub fn bin(&self) -> Option<u64> {
        self.value(VerificationField::Bin)
            .and_then(|raw| parse_bin(&raw))
    }

    #[must_use]
    pub fn last4(&self) -> Option<String> {
        self.value(VerificationField::Last4)
            .and_then(|raw| parse_last4(&raw))
    }

    #[must_use]
    pub fn expiry_month(&self) -> Option<u32> {
        self.value(VerificationField::ExpiryMonth)
            .and_then(|raw| parse_expiry_month(&raw))
    }

    #[must_use]
    pub fn expiry_year(&self) -> Option<u32> {
        self.value(VerificationField::ExpiryYear)
            .and_then(|raw| parse_expiry_year(&raw))
    }

    fn adapter(&self, field: VerificationField) -> &'a dyn VerificationAdapter {
        let adapter = self.registry.resolve(&self.payment.method, field);
        debug!(
            payment_method = %self.payment.method,
            field = %field,
            adapter = adapter.name(),
            "Using verification adapter"
        );
        adapter
    }

    fn fetch(&self, field: VerificationField) -> Fetched {
        let adapter = self.adapter(field);
        match adapter.data(self.payment, self.context) {
            Ok(Some(value)) => Fetched::Value(value),
            Ok(None) => Fetched::Missing,
            Err(e) => {
                error!(
                    payment_method = %self.payment.method,
                    field = %field,
                    adapter = adapter.name(),
                    error = %e,
                    "Verification adapter failed"
                );
                Fetched::Failed
            }
        }
    }

    fn value(&self, field: VerificationField) -> Option<String> {
        match self.fetch(field) {
            Fetched::Value(value) => Some(value),
            Fetched::Missing | Fetched::Failed => None,
        }
    }

    fn code(&self, field: VerificationField) -> Option<String> {
        let adapter = self.adapter(field);
        let raw = match adapter.data(self.payment, self.context) {
            Ok(raw) => raw?,
            Err(e) => {
                error!(
                    payment_method = %self.payment.method,
                    field = %field,
                    adapter = adapter.name(),
                    error = %e,
                    "Verification adapter failed"
                );
                return None;
            }
        };

        let code = normalize_code(&raw)?;
        if adapter.validate(&code) {
            Some(code)
        } else {
            debug!(field = %field, code = %code, "Discarding unrecognized result code");
            None
        }
    }
}

fn billing_name(billing: &OrderAddress) -> String {
    format!(
        "{} {}",
        billing.firstname.as_deref().unwrap_or_default().trim(),
        billing.lastname.as_deref().unwrap_or_default().trim()
    )
}

fn digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Trim and uppercase a result code. Blank codes are absent.
#[must_use]
pub fn normalize_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_uppercase();
    (!code.is_empty()).then_some(code)
}

/// Card BIN: digits only, at least six significant digits.
#[must_use]
pub fn parse_bin(raw: &str) -> Option<u64> {
    digits(raw)
        .parse::<u64>()
        .ok()
        .filter(|bin| *bin >= MIN_BIN)
}

/// Last four card digits: digits only, exactly four of them.
#[must_use]
pub fn parse_last4(raw: &str) -> Option<String> {
    let last4 = digits(raw);
    (last4.len() == 4).then_some(last4)
}

/// Expiry month in `1..=12`.
#[must_use]
pub fn parse_expiry_month(raw: &str) -> Option<u32> {
    digits(raw)
        .parse::<u32>()
        .ok()
        .filter(|month| (1..=12).contains(month))
}

/// Expiry year as four digits; two-digit years are in the 2000s.
#[must_use]
pub fn parse_expiry_year(raw: &str) -> Option<u32> {
    let year = digits(raw).parse::<u32>().ok().filter(|year| *year > 0)?;
    if year < 1000 { year.checked_add(2000) } else { Some(year) }
}

/// Uppercase, keep only `A-Z` and spaces, collapse runs of whitespace.
#[must_use]
pub fn sanitize_cardholder(raw: &str) -> Option<String> {
    let upper = raw.to_uppercase();
    let kept: String = upper
        .chars()
        .filter(|c| c.is_ascii_uppercase() || *c == ' ')
        .collect();
    let name = kept.split_whitespace().collect::<Vec<_>>().join(" ");
    (!name.is_empty()).then_some(name)
}

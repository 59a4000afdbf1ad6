//! Building blocks for per-gateway verification adapters.

use crate::order::PaymentRecord;

use super::{AdapterError, PaymentContext, VerificationAdapter};

/// AVS result codes the risk service accepts.
pub const AVS_CODES: &[&str] = &[
    "X", "Y", "A", "W", "Z", "N", "U", "R", "E", "S", "G", "B", "C", "D", "F", "I", "M", "P",
];

/// CVV result codes the risk service accepts.
pub const CVV_CODES: &[&str] = &["M", "N", "P", "S", "U"];

/// Card columns on the payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentColumn {
    Owner,
    Last4,
    ExpMonth,
    ExpYear,
    AvsStatus,
    CidStatus,
}

/// Where an adapter reads its raw value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// A card column of the payment record.
    Column(PaymentColumn),
    /// A key of the payment's additional information.
    Additional(&'static str),
    /// A key of the per-build payment context.
    Context(&'static str),
}

impl DataSource {
    fn read<'a>(&self, payment: &'a PaymentRecord, context: &'a PaymentContext) -> Option<&'a str> {
        let value = match self {
            Self::Column(column) => match column {
                PaymentColumn::Owner => payment.cc_owner.as_deref(),
                PaymentColumn::Last4 => payment.cc_last_4.as_deref(),
                PaymentColumn::ExpMonth => payment.cc_exp_month.as_deref(),
                PaymentColumn::ExpYear => payment.cc_exp_year.as_deref(),
                PaymentColumn::AvsStatus => payment.cc_avs_status.as_deref(),
                PaymentColumn::CidStatus => payment.cc_cid_status.as_deref(),
            },
            Self::Additional(key) => payment.additional(key),
            Self::Context(key) => context.get(key),
        };
        value.filter(|v| !v.trim().is_empty())
    }
}

/// Default adapter for payment methods nobody registered: never has data.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAdapter;

impl VerificationAdapter for NullAdapter {
    fn name(&self) -> &'static str {
        "null"
    }

    fn data(
        &self,
        _payment: &PaymentRecord,
        _context: &PaymentContext,
    ) -> Result<Option<String>, AdapterError> {
        Ok(None)
    }
}

/// Passes a single stored value through unchanged.
#[derive(Debug, Clone, Copy)]
pub struct FieldAdapter {
    source: DataSource,
}

impl FieldAdapter {
    #[must_use]
    pub const fn new(source: DataSource) -> Self {
        Self { source }
    }
}

impl VerificationAdapter for FieldAdapter {
    fn name(&self) -> &'static str {
        match self.source {
            DataSource::Column(_) => "payment_column",
            DataSource::Additional(_) => "additional_information",
            DataSource::Context(_) => "payment_context",
        }
    }

    fn data(
        &self,
        payment: &PaymentRecord,
        context: &PaymentContext,
    ) -> Result<Option<String>, AdapterError> {
        Ok(self.source.read(payment, context).map(String::from))
    }
}

/// Translates gateway-specific result codes into the risk service's codes.
///
/// The values of all `sources` are uppercased and concatenated, then looked
/// up in `map`. A missing source value means no data; an unmapped
/// combination also means no data.
#[derive(Debug, Clone)]
pub struct CodeMapAdapter {
    name: &'static str,
    sources: Vec<DataSource>,
    map: &'static [(&'static str, &'static str)],
}

impl CodeMapAdapter {
    #[must_use]
    pub const fn new(
        name: &'static str,
        sources: Vec<DataSource>,
        map: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self { name, sources, map }
    }
}

impl VerificationAdapter for CodeMapAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn data(
        &self,
        payment: &PaymentRecord,
        context: &PaymentContext,
    ) -> Result<Option<String>, AdapterError> {
        let mut key = String::new();
        for source in &self.sources {
            match source.read(payment, context) {
                Some(value) => key.push_str(&value.trim().to_uppercase()),
                None => return Ok(None),
            }
        }

        Ok(self
            .map
            .iter()
            .find(|(from, _)| *from == key)
            .map(|(_, to)| (*to).to_string()))
    }
}

/// Which half of an `MMYY` expiry string to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryPart {
    Month,
    Year,
}

/// Splits a combined `MMYY` expiry value.
#[derive(Debug, Clone, Copy)]
pub struct ExpiryAdapter {
    source: DataSource,
    part: ExpiryPart,
}

impl ExpiryAdapter {
    #[must_use]
    pub const fn new(source: DataSource, part: ExpiryPart) -> Self {
        Self { source, part }
    }
}

impl VerificationAdapter for ExpiryAdapter {
    fn name(&self) -> &'static str {
        "expiry_mmyy"
    }

    fn data(
        &self,
        payment: &PaymentRecord,
        context: &PaymentContext,
    ) -> Result<Option<String>, AdapterError> {
        let Some(raw) = self.source.read(payment, context) else {
            return Ok(None);
        };

        let raw = raw.trim();
        if raw.len() != 4 || !raw.chars().all(|c| c.is_ascii_digit()) {
            return Err(AdapterError::Malformed {
                field: "expdate",
                value: raw.to_string(),
            });
        }

        let (month, year) = raw.split_at(2);
        Ok(Some(
            match self.part {
                ExpiryPart::Month => month,
                ExpiryPart::Year => year,
            }
            .to_string(),
        ))
    }
}

/// Restricts another adapter's output to a fixed set of codes.
#[derive(Debug)]
pub struct ValidatedAdapter {
    inner: Box<dyn VerificationAdapter>,
    accepted: &'static [&'static str],
}

impl ValidatedAdapter {
    #[must_use]
    pub fn new(inner: impl VerificationAdapter + 'static, accepted: &'static [&'static str]) -> Self {
        Self {
            inner: Box::new(inner),
            accepted,
        }
    }

    /// AVS adapter accepting only [`AVS_CODES`].
    #[must_use]
    pub fn avs(inner: impl VerificationAdapter + 'static) -> Self {
        Self::new(inner, AVS_CODES)
    }

    /// CVV adapter accepting only [`CVV_CODES`].
    #[must_use]
    pub fn cvv(inner: impl VerificationAdapter + 'static) -> Self {
        Self::new(inner, CVV_CODES)
    }
}

impl VerificationAdapter for ValidatedAdapter {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn data(
        &self,
        payment: &PaymentRecord,
        context: &PaymentContext,
    ) -> Result<Option<String>, AdapterError> {
        self.inner.data(payment, context)
    }

    fn validate(&self, value: &str) -> bool {
        self.accepted.contains(&value)
    }
}

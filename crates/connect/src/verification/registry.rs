//! Payment method to adapter resolution.

use std::collections::HashMap;

use super::adapters::{
    CodeMapAdapter, DataSource, ExpiryAdapter, ExpiryPart, FieldAdapter, NullAdapter,
    PaymentColumn, ValidatedAdapter,
};
use super::{VerificationAdapter, VerificationField};

/// Braintree AVS: postal code result followed by street address result.
const BRAINTREE_AVS: &[(&str, &str)] = &[
    ("MM", "Y"),
    ("NM", "A"),
    ("MN", "Z"),
    ("NN", "N"),
    ("UU", "U"),
    ("II", "U"),
    ("AA", "E"),
];

const BRAINTREE_CVV: &[(&str, &str)] = &[
    ("M", "M"),
    ("N", "N"),
    ("U", "P"),
    ("I", "P"),
    ("S", "S"),
];

/// Payflow AVS: street address result followed by zip result.
const PAYFLOW_AVS: &[(&str, &str)] = &[
    ("YY", "Y"),
    ("YN", "A"),
    ("NY", "Z"),
    ("NN", "N"),
    ("XX", "U"),
    ("XY", "U"),
    ("YX", "U"),
    ("XN", "U"),
    ("NX", "U"),
];

const PAYFLOW_CVV: &[(&str, &str)] = &[("Y", "M"), ("N", "N"), ("X", "U")];

/// Resolves `(payment method, field)` pairs to adapters.
///
/// Resolution never fails: anything not registered gets [`NullAdapter`].
#[derive(Debug)]
pub struct AdapterRegistry {
    adapters: HashMap<(String, VerificationField), Box<dyn VerificationAdapter>>,
    fallback: NullAdapter,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self {
            adapters: HashMap::new(),
            fallback: NullAdapter,
        }
    }
}

impl AdapterRegistry {
    /// A registry with no payment methods registered.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry preloaded with the supported gateways.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register_braintree();
        registry.register_authorizenet();
        registry.register_payflow("payflowpro", DataSource::Additional);
        registry.register_payflow("payflow_link", DataSource::Context);
        registry
    }

    /// Register (or replace) the adapter for one field of a payment method.
    pub fn register(
        &mut self,
        method: impl Into<String>,
        field: VerificationField,
        adapter: impl VerificationAdapter + 'static,
    ) -> &mut Self {
        self.adapters.insert((method.into(), field), Box::new(adapter));
        self
    }

    /// Adapter for a field of a payment method.
    #[must_use]
    pub fn resolve(&self, method: &str, field: VerificationField) -> &dyn VerificationAdapter {
        match self.adapters.get(&(method.to_string(), field)) {
            Some(adapter) => adapter.as_ref(),
            None => &self.fallback,
        }
    }

    /// Whether any adapter is registered for the payment method.
    #[must_use]
    pub fn supports(&self, method: &str) -> bool {
        self.adapters.keys().any(|(m, _)| m == method)
    }

    fn register_braintree(&mut self) {
        const METHOD: &str = "braintree";
        self.register(
            METHOD,
            VerificationField::Avs,
            ValidatedAdapter::avs(CodeMapAdapter::new(
                "braintree_avs",
                vec![
                    DataSource::Additional("avsPostalCodeResponseCode"),
                    DataSource::Additional("avsStreetAddressResponseCode"),
                ],
                BRAINTREE_AVS,
            )),
        )
        .register(
            METHOD,
            VerificationField::Cvv,
            ValidatedAdapter::cvv(CodeMapAdapter::new(
                "braintree_cvv",
                vec![DataSource::Additional("cvvResponseCode")],
                BRAINTREE_CVV,
            )),
        )
        .register(
            METHOD,
            VerificationField::Cardholder,
            FieldAdapter::new(DataSource::Additional("cardholderName")),
        )
        .register(
            METHOD,
            VerificationField::Bin,
            FieldAdapter::new(DataSource::Additional("bin")),
        );
        self.register_card_columns(METHOD);
    }

    fn register_authorizenet(&mut self) {
        const METHOD: &str = "authorizenet_directpost";
        self.register(
            METHOD,
            VerificationField::Avs,
            ValidatedAdapter::avs(FieldAdapter::new(DataSource::Column(
                PaymentColumn::AvsStatus,
            ))),
        )
        .register(
            METHOD,
            VerificationField::Cvv,
            ValidatedAdapter::cvv(FieldAdapter::new(DataSource::Column(
                PaymentColumn::CidStatus,
            ))),
        )
        .register(
            METHOD,
            VerificationField::Cardholder,
            FieldAdapter::new(DataSource::Column(PaymentColumn::Owner)),
        );
        self.register_card_columns(METHOD);
    }

    /// Payflow Pro keeps the gateway response in additional information;
    /// Payflow Link hands it over through the payment context.
    fn register_payflow(&mut self, method: &str, source: fn(&'static str) -> DataSource) {
        self.register(
            method,
            VerificationField::Avs,
            ValidatedAdapter::avs(CodeMapAdapter::new(
                "payflow_avs",
                vec![source("avsaddr"), source("avszip")],
                PAYFLOW_AVS,
            )),
        )
        .register(
            method,
            VerificationField::Cvv,
            ValidatedAdapter::cvv(CodeMapAdapter::new(
                "payflow_cvv",
                vec![source("cvv2match")],
                PAYFLOW_CVV,
            )),
        )
        .register(method, VerificationField::Last4, FieldAdapter::new(source("acct")))
        .register(
            method,
            VerificationField::ExpiryMonth,
            ExpiryAdapter::new(source("expdate"), ExpiryPart::Month),
        )
        .register(
            method,
            VerificationField::ExpiryYear,
            ExpiryAdapter::new(source("expdate"), ExpiryPart::Year),
        );
    }

    fn register_card_columns(&mut self, method: &str) {
        self.register(
            method,
            VerificationField::Last4,
            FieldAdapter::new(DataSource::Column(PaymentColumn::Last4)),
        )
        .register(
            method,
            VerificationField::ExpiryMonth,
            FieldAdapter::new(DataSource::Column(PaymentColumn::ExpMonth)),
        )
        .register(
            method,
            VerificationField::ExpiryYear,
            FieldAdapter::new(DataSource::Column(PaymentColumn::ExpYear)),
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::order::PaymentRecord;
    use crate::verification::PaymentContext;

    fn braintree_payment(postal: &str, street: &str, cvv: &str) -> PaymentRecord {
        let mut payment = PaymentRecord {
            method: "braintree".to_string(),
            ..PaymentRecord::default()
        };
        let info = &mut payment.additional_information;
        info.insert("avsPostalCodeResponseCode".to_string(), postal.to_string());
        info.insert("avsStreetAddressResponseCode".to_string(), street.to_string());
        info.insert("cvvResponseCode".to_string(), cvv.to_string());
        payment
    }

    #[test]
    fn test_unknown_method_resolves_to_null_adapter() {
        let registry = AdapterRegistry::with_defaults();
        for field in VerificationField::ALL {
            let adapter = registry.resolve("cashondelivery", field);
            assert_eq!(adapter.name(), "null");
            let data = adapter
                .data(&PaymentRecord::default(), &PaymentContext::new())
                .unwrap();
            assert!(data.is_none());
        }
    }

    #[test]
    fn test_empty_registry_supports_nothing() {
        let registry = AdapterRegistry::empty();
        assert!(!registry.supports("braintree"));
        assert_eq!(registry.resolve("braintree", VerificationField::Avs).name(), "null");
    }

    #[test]
    fn test_defaults_cover_known_gateways() {
        let registry = AdapterRegistry::with_defaults();
        for method in ["braintree", "authorizenet_directpost", "payflowpro", "payflow_link"] {
            assert!(registry.supports(method), "{method} should be registered");
        }
    }

    #[test]
    fn test_braintree_avs_mapping() {
        let registry = AdapterRegistry::with_defaults();
        let adapter = registry.resolve("braintree", VerificationField::Avs);
        let context = PaymentContext::new();

        let cases = [("M", "M", "Y"), ("N", "M", "A"), ("M", "N", "Z"), ("N", "N", "N")];
        for (postal, street, expected) in cases {
            let payment = braintree_payment(postal, street, "M");
            let code = adapter.data(&payment, &context).unwrap();
            assert_eq!(code.as_deref(), Some(expected));
        }
    }

    #[test]
    fn test_braintree_cvv_mapping() {
        let registry = AdapterRegistry::with_defaults();
        let adapter = registry.resolve("braintree", VerificationField::Cvv);
        let payment = braintree_payment("M", "M", "I");

        let code = adapter.data(&payment, &PaymentContext::new()).unwrap();
        assert_eq!(code.as_deref(), Some("P"));
        assert!(adapter.validate("P"));
    }

    #[test]
    fn test_payflow_link_reads_context() {
        let registry = AdapterRegistry::with_defaults();
        let payment = PaymentRecord {
            method: "payflow_link".to_string(),
            ..PaymentRecord::default()
        };
        let context = PaymentContext::new()
            .with("avsaddr", "Y")
            .with("avszip", "N")
            .with("cvv2match", "X")
            .with("acct", "1881")
            .with("expdate", "1126");

        let read = |field| {
            registry
                .resolve("payflow_link", field)
                .data(&payment, &context)
                .unwrap()
        };

        assert_eq!(read(VerificationField::Avs).as_deref(), Some("A"));
        assert_eq!(read(VerificationField::Cvv).as_deref(), Some("U"));
        assert_eq!(read(VerificationField::Last4).as_deref(), Some("1881"));
        assert_eq!(read(VerificationField::ExpiryMonth).as_deref(), Some("11"));
        assert_eq!(read(VerificationField::ExpiryYear).as_deref(), Some("26"));
    }

    #[test]
    fn test_payflow_pro_ignores_context() {
        let registry = AdapterRegistry::with_defaults();
        let payment = PaymentRecord {
            method: "payflowpro".to_string(),
            ..PaymentRecord::default()
        };
        let context = PaymentContext::new().with("acct", "1881");

        let last4 = registry
            .resolve("payflowpro", VerificationField::Last4)
            .data(&payment, &context)
            .unwrap();
        assert!(last4.is_none());
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut registry = AdapterRegistry::with_defaults();
        registry.register("braintree", VerificationField::Bin, NullAdapter);
        assert_eq!(registry.resolve("braintree", VerificationField::Bin).name(), "null");
    }
}

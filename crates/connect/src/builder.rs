//! Case document assembly.
//!
//! [`CaseBuilder`] turns a host order into the [`Case`] payload. Field-level
//! problems (an adapter failing, a malformed card value) only blank out the
//! affected field. Host data store failures abort the build.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use signifyd_connect_core::{
    Address, Card, Case, DiscountCode, OrderChannel, Product, Purchase, Recipient, Shipment,
    UserAccount, VersionInfo,
};
use tracing::{debug, instrument};

use crate::error::ConnectError;
use crate::fingerprint::{DeviceFingerprinter, StoreFingerprinter};
use crate::ip::order_ip_address;
use crate::order::{Order, OrderAddress, OrderItem, OrderSource};
use crate::verification::{AdapterRegistry, PaymentContext, VerificationReader};

/// Per-build inputs that do not live on the order.
///
/// Owned by a single build and dropped when it returns.
#[derive(Debug, Clone, Default)]
pub struct CaseContext {
    /// Transient payment data from the gateway integration.
    pub payment_data: PaymentContext,
    /// Remote address of the request that placed the order, if any.
    pub remote_addr: Option<String>,
}

impl CaseContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_payment_data(mut self, payment_data: PaymentContext) -> Self {
        self.payment_data = payment_data;
        self
    }

    #[must_use]
    pub fn with_remote_addr(mut self, remote_addr: impl Into<String>) -> Self {
        self.remote_addr = Some(remote_addr.into());
        self
    }
}

/// Builds [`Case`] documents.
#[derive(Debug)]
pub struct CaseBuilder<F = StoreFingerprinter> {
    registry: AdapterRegistry,
    fingerprinter: F,
    version: VersionInfo,
}

impl<F: DeviceFingerprinter> CaseBuilder<F> {
    #[must_use]
    pub const fn new(registry: AdapterRegistry, fingerprinter: F, version: VersionInfo) -> Self {
        Self {
            registry,
            fingerprinter,
            version,
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Assemble the case for `order`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectError::Host` if customer data cannot be read from the
    /// host data store.
    #[instrument(skip_all, fields(order_id = %order.increment_id))]
    pub async fn build<H: OrderSource>(
        &self,
        order: &Order,
        context: CaseContext,
        host: &H,
    ) -> Result<Case, ConnectError> {
        if !self.registry().supports(&order.payment.method) {
            debug!(
                payment_method = %order.payment.method,
                "No verification adapters for payment method"
            );
        }
        let reader = VerificationReader::new(&self.registry, &order.payment, &context.payment_data);

        let card = make_card(order, &reader);
        let purchase = self.make_purchase(order, &reader, context.remote_addr.as_deref());
        let recipient = make_recipient(order);
        let user_account = make_user_account(order, host).await?;

        debug!(
            products = purchase.products.len(),
            shipments = purchase.shipments.len(),
            "Case assembled"
        );

        Ok(Case {
            card,
            purchase,
            recipient,
            user_account,
            client_version: self.version.clone(),
        })
    }

    fn make_purchase(
        &self,
        order: &Order,
        reader: &VerificationReader<'_>,
        remote_addr: Option<&str>,
    ) -> Purchase {
        Purchase {
            avs_response_code: reader.avs_code(),
            cvv_response_code: reader.cvv_code(),
            order_channel: order_channel(order),
            products: order.items.iter().map(make_product).collect(),
            total_price: order.grand_total,
            currency: order.order_currency_code.clone(),
            order_id: order.increment_id.clone(),
            payment_gateway: order.payment.method.clone(),
            created_at: order.created_at,
            browser_ip_address: order_ip_address(order, remote_addr),
            discount_codes: make_discount(order),
            shipments: make_shipments(order),
            order_session_id: self.session_id(order),
        }
    }

    /// Fingerprint session id, only for storefront orders.
    fn session_id(&self, order: &Order) -> Option<String> {
        if !matches!(order_channel(order), Some(OrderChannel::Web))
            || !self.fingerprinter.is_enabled()
        {
            return None;
        }
        order
            .quote_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(|id| self.fingerprinter.generate(id))
    }
}

fn make_card(order: &Order, reader: &VerificationReader<'_>) -> Card {
    let billing = order.billing_address.as_ref();
    Card {
        card_holder_name: reader.cardholder(billing),
        bin: reader.bin(),
        last4: reader.last4(),
        expiry_month: reader.expiry_month(),
        expiry_year: reader.expiry_year(),
        billing_address: billing.map(format_address).unwrap_or_default(),
    }
}

fn order_channel(order: &Order) -> Option<OrderChannel> {
    match order.origin_store_code.as_deref() {
        None | Some("") => None,
        Some(_) if order.is_admin_order() => Some(OrderChannel::Phone),
        Some(_) => Some(OrderChannel::Web),
    }
}

fn make_product(item: &OrderItem) -> Product {
    Product {
        item_id: item.sku.clone(),
        item_name: item.name.clone(),
        item_is_digital: item.is_virtual,
        item_price: item.price,
        item_quantity: item.qty_ordered.trunc().to_i64().unwrap_or_default(),
        item_url: item.product_url.clone(),
        item_weight: item.weight,
    }
}

fn make_discount(order: &Order) -> Option<DiscountCode> {
    let code = order.coupon_code.as_deref().filter(|c| !c.is_empty())?;
    Some(DiscountCode {
        amount: order.discount_amount.abs(),
        code: code.to_string(),
    })
}

fn make_shipments(order: &Order) -> Vec<Shipment> {
    order
        .shipping_method_parts()
        .map(|parts| Shipment {
            shipper: parts.carrier_code,
            shipping_price: order.shipping_amount,
            shipping_method: parts.method,
        })
        .into_iter()
        .collect()
}

fn format_address(address: &OrderAddress) -> Address {
    Address {
        street_address: address.street_line(1).map(String::from),
        unit: address.street_line(2).map(String::from),
        city: address.city.clone(),
        province_code: address.region_code.clone(),
        postal_code: address.postcode.clone(),
        country_code: address.country_id.clone(),
        latitude: None,
        longitude: None,
    }
}

fn make_recipient(order: &Order) -> Recipient {
    let mut recipient = order
        .shipping_address
        .as_ref()
        .map(|address| Recipient {
            full_name: address.name(),
            confirmation_email: address.email.clone(),
            confirmation_phone: address.telephone.clone(),
            organization: address.company.clone(),
            delivery_address: Some(format_address(address)),
        })
        .unwrap_or_default();

    if recipient.full_name.as_deref().is_none_or(str::is_empty) {
        recipient.full_name = order.customer_name();
    }
    if recipient.confirmation_email.as_deref().is_none_or(str::is_empty) {
        recipient.confirmation_email.clone_from(&order.customer_email);
    }
    recipient
}

/// User account block with lifetime aggregates.
///
/// Scans every order of the customer. Guest orders report zero aggregates.
async fn make_user_account<H: OrderSource>(
    order: &Order,
    host: &H,
) -> Result<UserAccount, ConnectError> {
    let mut account = UserAccount {
        email_address: order.customer_email.clone(),
        username: order.customer_email.clone(),
        account_number: order.customer_id.map(|id| id.to_string()),
        phone: order
            .billing_address
            .as_ref()
            .and_then(|address| address.telephone.clone()),
        created_date: None,
        aggregate_order_count: 0,
        aggregate_order_dollars: Decimal::ZERO,
    };

    let Some(customer_id) = order.customer_id else {
        debug!("Guest order, skipping customer aggregates");
        return Ok(account);
    };

    if let Some(customer) = host.customer(customer_id).await? {
        account.created_date = customer.created_at;
    }

    let history = host.orders_for_customer(customer_id).await?;
    account.aggregate_order_count = history.len() as u64;
    account.aggregate_order_dollars = history.iter().map(|o| o.grand_total).sum();

    Ok(account)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use signifyd_connect_core::CustomerId;

    use super::*;
    use crate::order::{Customer, HistoricalOrder, HostError, InMemoryOrderSource, PaymentRecord};

    fn version() -> VersionInfo {
        VersionInfo {
            store_platform: "Magento 2".to_string(),
            store_platform_version: "2.4.6".to_string(),
            signifyd_client_app: "Magento 2".to_string(),
            signifyd_client_app_version: "0.1.0".to_string(),
        }
    }

    fn builder(fingerprint: bool) -> CaseBuilder {
        CaseBuilder::new(
            AdapterRegistry::with_defaults(),
            StoreFingerprinter::new(fingerprint, "https://shop.example"),
            version(),
        )
    }

    fn item(sku: &str, price: i64, qty: Decimal) -> OrderItem {
        OrderItem {
            sku: sku.to_string(),
            name: format!("Item {sku}"),
            is_virtual: false,
            price: Decimal::new(price, 2),
            qty_ordered: qty,
            product_url: None,
            weight: Some(Decimal::new(15, 1)),
            qty_to_cancel: Decimal::ZERO,
            qty_to_refund: Decimal::ZERO,
        }
    }

    fn address() -> OrderAddress {
        OrderAddress {
            firstname: Some("Grace".to_string()),
            lastname: Some("Hopper".to_string()),
            street: vec!["1 Navy Way".to_string(), "Apt 2".to_string()],
            city: Some("Arlington".to_string()),
            region_code: Some("VA".to_string()),
            postcode: Some("22201".to_string()),
            country_id: Some("US".to_string()),
            email: None,
            telephone: Some("555-0100".to_string()),
            company: Some("USN".to_string()),
        }
    }

    fn order() -> Order {
        Order {
            increment_id: "100000042".to_string(),
            quote_id: Some("77".to_string()),
            origin_store_code: Some("default".to_string()),
            customer_id: Some(CustomerId::new(9)),
            customer_email: Some("grace@example.com".to_string()),
            customer_firstname: Some("Grace".to_string()),
            customer_lastname: Some("Hopper".to_string()),
            items: vec![
                item("A-1", 1999, Decimal::new(25, 1)),
                item("B-2", 500, Decimal::ONE),
            ],
            payment: PaymentRecord {
                method: "checkmo".to_string(),
                ..PaymentRecord::default()
            },
            billing_address: Some(address()),
            shipping_address: Some(address()),
            coupon_code: Some("SPRING".to_string()),
            discount_amount: Decimal::new(-500, 2),
            shipping_method: Some("flatrate_flatrate".to_string()),
            shipping_amount: Decimal::new(1000, 2),
            grand_total: Decimal::new(4997, 2),
            order_currency_code: "USD".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            remote_ip: Some("10.0.0.1".to_string()),
            x_forwarded_for: Some("203.0.113.9, 10.0.0.1".to_string()),
            guarantee: None,
        }
    }

    fn host() -> InMemoryOrderSource {
        InMemoryOrderSource::new()
            .with_customer(Customer {
                id: CustomerId::new(9),
                email: Some("grace@example.com".to_string()),
                created_at: Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
            })
            .with_order(HistoricalOrder {
                increment_id: "100000001".to_string(),
                customer_id: CustomerId::new(9),
                grand_total: Decimal::new(1000, 2),
            })
            .with_order(HistoricalOrder {
                increment_id: "100000042".to_string(),
                customer_id: CustomerId::new(9),
                grand_total: Decimal::new(4997, 2),
            })
            .with_order(HistoricalOrder {
                increment_id: "100000050".to_string(),
                customer_id: CustomerId::new(3),
                grand_total: Decimal::new(99_999, 2),
            })
    }

    #[tokio::test]
    async fn test_build_full_order() {
        let case = builder(false)
            .build(&order(), CaseContext::new(), &host())
            .await
            .unwrap();

        let purchase = &case.purchase;
        assert_eq!(purchase.order_id, "100000042");
        assert_eq!(purchase.order_channel, Some(OrderChannel::Web));
        assert_eq!(purchase.products.len(), 2);
        assert_eq!(purchase.products[0].item_quantity, 2);
        assert_eq!(purchase.browser_ip_address.as_deref(), Some("203.0.113.9"));
        assert_eq!(purchase.payment_gateway, "checkmo");

        let discount = purchase.discount_codes.as_ref().unwrap();
        assert_eq!(discount.amount, Decimal::new(500, 2));
        assert_eq!(discount.code, "SPRING");

        assert_eq!(purchase.shipments.len(), 1);
        assert_eq!(purchase.shipments[0].shipper, "flatrate");
        assert_eq!(purchase.shipments[0].shipping_method, "flatrate");
        assert_eq!(purchase.shipments[0].shipping_price, Decimal::new(1000, 2));

        assert_eq!(case.card.card_holder_name.as_deref(), Some("GRACE HOPPER"));
        assert_eq!(case.card.billing_address.unit.as_deref(), Some("Apt 2"));
        assert!(case.card.bin.is_none());

        assert_eq!(case.user_account.aggregate_order_count, 2);
        assert_eq!(case.user_account.aggregate_order_dollars, Decimal::new(5997, 2));
        assert_eq!(case.user_account.account_number.as_deref(), Some("9"));
        assert!(case.user_account.created_date.is_some());

        assert_eq!(case.client_version, version());
    }

    #[tokio::test]
    async fn test_admin_order_is_phone_without_fingerprint() {
        let mut order = order();
        order.origin_store_code = Some("admin".to_string());

        let case = builder(true)
            .build(&order, CaseContext::new(), &host())
            .await
            .unwrap();
        assert_eq!(case.purchase.order_channel, Some(OrderChannel::Phone));
        assert!(case.purchase.order_session_id.is_none());
    }

    #[tokio::test]
    async fn test_missing_origin_leaves_channel_unset() {
        let mut order = order();
        order.origin_store_code = None;

        let case = builder(true)
            .build(&order, CaseContext::new(), &host())
            .await
            .unwrap();
        assert!(case.purchase.order_channel.is_none());
        assert!(case.purchase.order_session_id.is_none());
    }

    #[tokio::test]
    async fn test_web_order_gets_fingerprint_when_enabled() {
        let case = builder(true)
            .build(&order(), CaseContext::new(), &host())
            .await
            .unwrap();
        assert_eq!(
            case.purchase.order_session_id.as_deref(),
            Some("M2aHR0cHM6Ly9zaG9wLmV4YW1wbGU=77")
        );
    }

    #[tokio::test]
    async fn test_no_coupon_no_shipping() {
        let mut order = order();
        order.coupon_code = Some(String::new());
        order.shipping_method = None;

        let case = builder(false)
            .build(&order, CaseContext::new(), &host())
            .await
            .unwrap();
        assert!(case.purchase.discount_codes.is_none());
        assert!(case.purchase.shipments.is_empty());
    }

    #[tokio::test]
    async fn test_guest_order_has_zero_aggregates() {
        let mut order = order();
        order.customer_id = None;

        let case = builder(false)
            .build(&order, CaseContext::new(), &host())
            .await
            .unwrap();
        assert_eq!(case.user_account.aggregate_order_count, 0);
        assert_eq!(case.user_account.aggregate_order_dollars, Decimal::ZERO);
        assert!(case.user_account.account_number.is_none());
    }

    #[tokio::test]
    async fn test_request_remote_addr_used_without_marker() {
        let mut order = order();
        order.remote_ip = None;

        let context = CaseContext::new().with_remote_addr("198.51.100.4");
        let case = builder(false).build(&order, context, &host()).await.unwrap();
        assert_eq!(case.purchase.browser_ip_address.as_deref(), Some("198.51.100.4"));
    }

    #[tokio::test]
    async fn test_recipient_falls_back_to_order_customer() {
        let mut order = order();
        order.shipping_address = None;

        let case = builder(false)
            .build(&order, CaseContext::new(), &host())
            .await
            .unwrap();
        assert_eq!(case.recipient.full_name.as_deref(), Some("Grace Hopper"));
        assert_eq!(
            case.recipient.confirmation_email.as_deref(),
            Some("grace@example.com")
        );
        assert!(case.recipient.delivery_address.is_none());
    }

    #[tokio::test]
    async fn test_payment_context_applies_to_single_build() {
        let mut order = order();
        order.payment.method = "payflow_link".to_string();
        let builder = builder(false);

        let context = CaseContext::new().with_payment_data(
            PaymentContext::new()
                .with("avsaddr", "Y")
                .with("avszip", "Y")
                .with("acct", "4242"),
        );
        let first = builder.build(&order, context, &host()).await.unwrap();
        assert_eq!(first.purchase.avs_response_code.as_deref(), Some("Y"));
        assert_eq!(first.card.last4.as_deref(), Some("4242"));

        let second = builder
            .build(&order, CaseContext::new(), &host())
            .await
            .unwrap();
        assert!(second.purchase.avs_response_code.is_none());
        assert!(second.card.last4.is_none());
    }

    #[derive(Debug)]
    struct DownSource;

    impl OrderSource for DownSource {
        async fn customer(&self, _id: CustomerId) -> Result<Option<Customer>, HostError> {
            Err(HostError::Unavailable("customers".to_string()))
        }

        async fn orders_for_customer(
            &self,
            _id: CustomerId,
        ) -> Result<Vec<HistoricalOrder>, HostError> {
            Err(HostError::Unavailable("orders".to_string()))
        }

        async fn save_guarantee(
            &self,
            _order_id: &str,
            _guarantee: signifyd_connect_core::Guarantee,
        ) -> Result<(), HostError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_unsupported_method_builds_without_card_codes() {
        let builder = builder(false);
        assert!(!builder.registry().supports("checkmo"));
        assert!(builder.registry().supports("braintree"));

        let case = builder
            .build(&order(), CaseContext::new(), &host())
            .await
            .unwrap();
        assert!(case.purchase.avs_response_code.is_none());
        assert!(case.purchase.cvv_response_code.is_none());
        assert!(case.card.bin.is_none());
    }

    #[tokio::test]
    async fn test_host_failure_propagates() {
        let result = builder(false)
            .build(&order(), CaseContext::new(), &DownSource)
            .await;
        assert!(matches!(result, Err(ConnectError::Host(_))));
    }
}

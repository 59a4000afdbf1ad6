//! Host platform order model and data-store access.
//!
//! These types mirror what the commerce platform exposes for an order. They
//! deserialize from the platform's JSON export so fixtures and the CLI can
//! load them directly. The [`OrderSource`] trait is the boundary to the
//! platform's order and customer tables.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use signifyd_connect_core::{CustomerId, Guarantee};
use thiserror::Error;

/// Origin store code the platform assigns to back-office orders.
pub const ADMIN_STORE_CODE: &str = "admin";

/// Errors raised by the host data store.
#[derive(Debug, Error)]
pub enum HostError {
    /// The store could not be reached or queried.
    #[error("host data store unavailable: {0}")]
    Unavailable(String),

    /// The order to update does not exist.
    #[error("order not found: {0}")]
    OrderNotFound(String),
}

/// An order as stored by the commerce platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub increment_id: String,
    /// Cart the order was converted from.
    #[serde(default)]
    pub quote_id: Option<String>,
    /// Store code the order originated from; `admin` for back-office orders.
    #[serde(default)]
    pub origin_store_code: Option<String>,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_firstname: Option<String>,
    #[serde(default)]
    pub customer_lastname: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub payment: PaymentRecord,
    #[serde(default)]
    pub billing_address: Option<OrderAddress>,
    #[serde(default)]
    pub shipping_address: Option<OrderAddress>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    /// Stored negative by the platform.
    #[serde(default)]
    pub discount_amount: Decimal,
    /// `carrier_method`, e.g. `flatrate_flatrate`.
    #[serde(default)]
    pub shipping_method: Option<String>,
    #[serde(default)]
    pub shipping_amount: Decimal,
    pub grand_total: Decimal,
    pub order_currency_code: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub remote_ip: Option<String>,
    #[serde(default)]
    pub x_forwarded_for: Option<String>,
    #[serde(default)]
    pub guarantee: Option<Guarantee>,
}

impl Order {
    /// Customer first and last name as recorded on the order.
    #[must_use]
    pub fn customer_name(&self) -> Option<String> {
        join_name(
            self.customer_firstname.as_deref(),
            self.customer_lastname.as_deref(),
        )
    }

    /// Whether the order was placed from the back office.
    #[must_use]
    pub fn is_admin_order(&self) -> bool {
        self.origin_store_code.as_deref() == Some(ADMIN_STORE_CODE)
    }

    /// Shipping method split into carrier and method codes.
    ///
    /// Returns `None` when no shipping method is set.
    #[must_use]
    pub fn shipping_method_parts(&self) -> Option<ShippingMethod> {
        let raw = self.shipping_method.as_deref().filter(|m| !m.is_empty())?;
        let (carrier_code, method) = raw.split_once('_').unwrap_or((raw, ""));
        Some(ShippingMethod {
            carrier_code: carrier_code.to_string(),
            method: method.to_string(),
        })
    }
}

/// Carrier and method codes of an order's shipping method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingMethod {
    pub carrier_code: String,
    pub method: String,
}

/// One order line, including canceled and refunded lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub is_virtual: bool,
    pub price: Decimal,
    pub qty_ordered: Decimal,
    #[serde(default)]
    pub product_url: Option<String>,
    #[serde(default)]
    pub weight: Option<Decimal>,
    #[serde(default)]
    pub qty_to_cancel: Decimal,
    #[serde(default)]
    pub qty_to_refund: Decimal,
}

impl OrderItem {
    /// Whether the platform still has quantity to cancel or refund on this line.
    #[must_use]
    pub fn has_open_quantity(&self) -> bool {
        self.qty_to_cancel > Decimal::ZERO || self.qty_to_refund > Decimal::ZERO
    }
}

/// Billing or shipping address attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OrderAddress {
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub street: Vec<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region_code: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub country_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telephone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
}

impl OrderAddress {
    #[must_use]
    pub fn name(&self) -> Option<String> {
        join_name(self.firstname.as_deref(), self.lastname.as_deref())
    }

    /// Street line by 1-based index.
    #[must_use]
    pub fn street_line(&self, line: usize) -> Option<&str> {
        line.checked_sub(1)
            .and_then(|idx| self.street.get(idx))
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Payment attached to an order.
///
/// Card columns are only filled by some gateways; others keep everything in
/// `additional_information`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PaymentRecord {
    /// Payment method code, e.g. `braintree`.
    pub method: String,
    #[serde(default)]
    pub cc_owner: Option<String>,
    #[serde(default)]
    pub cc_last_4: Option<String>,
    #[serde(default)]
    pub cc_exp_month: Option<String>,
    #[serde(default)]
    pub cc_exp_year: Option<String>,
    #[serde(default)]
    pub cc_avs_status: Option<String>,
    #[serde(default)]
    pub cc_cid_status: Option<String>,
    #[serde(default)]
    pub additional_information: HashMap<String, String>,
}

impl PaymentRecord {
    #[must_use]
    pub fn additional(&self, key: &str) -> Option<&str> {
        self.additional_information.get(key).map(String::as_str)
    }
}

/// Registered customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Summary of any order a customer has placed, used for lifetime aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalOrder {
    pub increment_id: String,
    pub customer_id: CustomerId,
    pub grand_total: Decimal,
}

/// Access to the host platform's order and customer data.
pub trait OrderSource: Send + Sync {
    /// Load a customer by id.
    fn customer(
        &self,
        id: CustomerId,
    ) -> impl Future<Output = Result<Option<Customer>, HostError>> + Send;

    /// Every order the customer has placed, unpaginated.
    fn orders_for_customer(
        &self,
        id: CustomerId,
    ) -> impl Future<Output = Result<Vec<HistoricalOrder>, HostError>> + Send;

    /// Persist the guarantee decision on the host order.
    fn save_guarantee(
        &self,
        order_id: &str,
        guarantee: Guarantee,
    ) -> impl Future<Output = Result<(), HostError>> + Send;
}

/// In-memory [`OrderSource`] for fixtures and tests.
#[derive(Debug, Default)]
pub struct InMemoryOrderSource {
    customers: HashMap<CustomerId, Customer>,
    orders: Vec<HistoricalOrder>,
    guarantees: Mutex<HashMap<String, Guarantee>>,
}

impl InMemoryOrderSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_customer(mut self, customer: Customer) -> Self {
        self.customers.insert(customer.id, customer);
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: HistoricalOrder) -> Self {
        self.orders.push(order);
        self
    }

    /// Guarantee most recently saved for an order.
    #[must_use]
    pub fn guarantee(&self, order_id: &str) -> Option<Guarantee> {
        self.guarantees
            .lock()
            .ok()
            .and_then(|map| map.get(order_id).copied())
    }
}

impl OrderSource for InMemoryOrderSource {
    async fn customer(&self, id: CustomerId) -> Result<Option<Customer>, HostError> {
        Ok(self.customers.get(&id).cloned())
    }

    async fn orders_for_customer(
        &self,
        id: CustomerId,
    ) -> Result<Vec<HistoricalOrder>, HostError> {
        Ok(self
            .orders
            .iter()
            .filter(|o| o.customer_id == id)
            .cloned()
            .collect())
    }

    async fn save_guarantee(&self, order_id: &str, guarantee: Guarantee) -> Result<(), HostError> {
        self.guarantees
            .lock()
            .map_err(|_| HostError::Unavailable("guarantee map lock poisoned".to_string()))?
            .insert(order_id.to_string(), guarantee);
        Ok(())
    }
}

fn join_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let name = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!name.is_empty()).then_some(name)
}

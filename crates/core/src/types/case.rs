//! Case document submitted to the risk-scoring service.
//!
//! Every type here serializes with camelCase keys. Monetary values use
//! [`Decimal`] internally and go over the wire as JSON numbers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::status::OrderChannel;

/// Fraud-review payload for a single order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub card: Card,
    pub purchase: Purchase,
    pub recipient: Recipient,
    pub user_account: UserAccount,
    pub client_version: VersionInfo,
}

/// Order-level purchase details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avs_response_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvv_response_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_channel: Option<OrderChannel>,
    pub products: Vec<Product>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub currency: String,
    /// Host order increment id.
    pub order_id: String,
    /// Payment method code of the order.
    pub payment_gateway: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_codes: Option<DiscountCode>,
    /// Zero or one entry.
    pub shipments: Vec<Shipment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_session_id: Option<String>,
}

/// One order line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// SKU.
    pub item_id: String,
    pub item_name: String,
    pub item_is_digital: bool,
    #[serde(with = "rust_decimal::serde::float")]
    pub item_price: Decimal,
    pub item_quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_url: Option<String>,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub item_weight: Option<Decimal>,
}

/// Coupon applied to the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountCode {
    /// Absolute value of the discount.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub shipper: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping_price: Decimal,
    pub shipping_method: String,
}

/// Postal address.
///
/// `latitude` and `longitude` are never geocoded and always serialize as
/// `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Payment card details as far as the payment method exposes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_holder_name: Option<String>,
    /// Leading card digits, at least 100000.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_year: Option<u32>,
    pub billing_address: Address,
}

/// Person receiving the goods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<Address>,
}

/// Buyer account with lifetime order aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
    pub aggregate_order_count: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub aggregate_order_dollars: Decimal,
}

/// Platform and connector versions reported with every case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub store_platform: String,
    pub store_platform_version: String,
    pub signifyd_client_app: String,
    pub signifyd_client_app_version: String,
}

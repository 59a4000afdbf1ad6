//! Integration tests for Signifyd Connect.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory and mock-server tests
//! cargo test -p signifyd-connect-integration-tests
//!
//! # Including PostgreSQL tests (needs DATABASE_URL)
//! cargo test -p signifyd-connect-integration-tests -- --include-ignored
//! ```
//!
//! # Test Categories
//!
//! - `case_building` - Case documents built from order fixtures
//! - `case_lifecycle` - Submission and cancellation against in-memory stores
//! - `http_client` - `HttpCaseClient` against a local mock API
//! - `pg_case_store` - `PgCaseStore` against a real database

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use signifyd_connect::order::{
    Customer, HistoricalOrder, OrderAddress, OrderItem, PaymentRecord,
};
use signifyd_connect::{
    AdapterRegistry, CaseBuilder, InMemoryOrderSource, Order, StoreFingerprinter,
};
use signifyd_connect_core::{CustomerId, VersionInfo};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Customer the sample order belongs to.
pub const CUSTOMER_ID: i32 = 41;

/// Store URL used for fingerprints in tests.
pub const STORE_URL: &str = "https://shop.example";

#[must_use]
pub fn version() -> VersionInfo {
    VersionInfo {
        store_platform: "Magento 2".to_string(),
        store_platform_version: "2.4.6".to_string(),
        signifyd_client_app: "Magento 2".to_string(),
        signifyd_client_app_version: "0.1.0".to_string(),
    }
}

/// Case builder with the default adapters and fingerprinting enabled.
#[must_use]
pub fn builder() -> CaseBuilder {
    CaseBuilder::new(
        AdapterRegistry::with_defaults(),
        StoreFingerprinter::new(true, STORE_URL),
        version(),
    )
}

#[must_use]
pub fn address() -> OrderAddress {
    OrderAddress {
        firstname: Some("Katherine".to_string()),
        lastname: Some("Johnson".to_string()),
        street: vec!["21 Langley Blvd".to_string()],
        city: Some("Hampton".to_string()),
        region_code: Some("VA".to_string()),
        postcode: Some("23681".to_string()),
        country_id: Some("US".to_string()),
        email: Some("kj@example.com".to_string()),
        telephone: Some("555-0199".to_string()),
        company: None,
    }
}

#[must_use]
pub fn item(sku: &str, price: Decimal, qty: Decimal) -> OrderItem {
    OrderItem {
        sku: sku.to_string(),
        name: format!("Product {sku}"),
        is_virtual: false,
        price,
        qty_ordered: qty,
        product_url: Some(format!("{STORE_URL}/{sku}.html")),
        weight: Some(Decimal::ONE),
        qty_to_cancel: Decimal::ZERO,
        qty_to_refund: Decimal::ZERO,
    }
}

/// A storefront order paid with Braintree: two lines, a coupon and a
/// flat-rate shipment.
#[must_use]
pub fn braintree_order() -> Order {
    let mut payment = PaymentRecord {
        method: "braintree".to_string(),
        cc_last_4: Some("1881".to_string()),
        cc_exp_month: Some("4".to_string()),
        cc_exp_year: Some("2030".to_string()),
        ..PaymentRecord::default()
    };
    for (key, value) in [
        ("avsPostalCodeResponseCode", "M"),
        ("avsStreetAddressResponseCode", "N"),
        ("cvvResponseCode", "M"),
        ("bin", "401288"),
        ("cardholderName", "Katherine G. Johnson"),
    ] {
        payment
            .additional_information
            .insert(key.to_string(), value.to_string());
    }

    Order {
        increment_id: "000000123".to_string(),
        quote_id: Some("812".to_string()),
        origin_store_code: Some("default".to_string()),
        customer_id: Some(CustomerId::new(CUSTOMER_ID)),
        customer_email: Some("kj@example.com".to_string()),
        customer_firstname: Some("Katherine".to_string()),
        customer_lastname: Some("Johnson".to_string()),
        items: vec![
            item("ORBIT-1", Decimal::new(4500, 2), Decimal::TWO),
            item("TRAJ-2", Decimal::new(1250, 2), Decimal::ONE),
        ],
        payment,
        billing_address: Some(address()),
        shipping_address: Some(address()),
        coupon_code: Some("LAUNCH10".to_string()),
        discount_amount: Decimal::new(-1000, 2),
        shipping_method: Some("ups_GND".to_string()),
        shipping_amount: Decimal::new(799, 2),
        grand_total: Decimal::new(10_049, 2),
        order_currency_code: "USD".to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap(),
        remote_ip: Some("10.1.1.1".to_string()),
        x_forwarded_for: Some("198.51.100.23, 10.1.1.1".to_string()),
        guarantee: None,
    }
}

/// Host data store holding the sample customer and three past orders.
#[must_use]
pub fn host_with_history() -> InMemoryOrderSource {
    let customer = CustomerId::new(CUSTOMER_ID);
    InMemoryOrderSource::new()
        .with_customer(Customer {
            id: customer,
            email: Some("kj@example.com".to_string()),
            created_at: Some(Utc.with_ymd_and_hms(2019, 2, 20, 0, 0, 0).unwrap()),
        })
        .with_order(HistoricalOrder {
            increment_id: "000000010".to_string(),
            customer_id: customer,
            grand_total: Decimal::new(2000, 2),
        })
        .with_order(HistoricalOrder {
            increment_id: "000000055".to_string(),
            customer_id: customer,
            grand_total: Decimal::new(3051, 2),
        })
        .with_order(HistoricalOrder {
            increment_id: "000000123".to_string(),
            customer_id: customer,
            grand_total: Decimal::new(10_049, 2),
        })
}

// =============================================================================
// Mock Signifyd API
// =============================================================================

/// A request received by [`MockApi`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

/// Minimal HTTP/1.1 server answering every request with one canned response.
#[derive(Debug)]
pub struct MockApi {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockApi {
    /// Start serving `status` with a JSON `body` on a random local port.
    pub async fn start(status: u16, body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        let response = format!(
            "HTTP/1.1 {status} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                if let Some(request) = read_request(&mut socket).await {
                    recorded.lock().unwrap().push(request);
                }
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self {
            base_url: format!("http://{addr}/v2"),
            requests,
        }
    }

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(chunk.get(..n)?);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(buf.get(..header_end)?).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let mut content_length = 0;
    let mut authorization = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.trim().parse().unwrap_or(0),
                "authorization" => authorization = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(chunk.get(..n)?);
    }

    let body = String::from_utf8_lossy(buf.get(header_end..)?).to_string();
    Some(RecordedRequest {
        method,
        path,
        authorization,
        body,
    })
}

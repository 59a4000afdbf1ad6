//! Order fixtures read by the case commands.
//!
//! A fixture is a JSON export of one order together with the customer data
//! the host platform would provide for it:
//!
//! ```json
//! {
//!   "order": { "increment_id": "000000123", "payment": { "method": "braintree" }, ... },
//!   "customer": { "id": 41, "email": "kj@example.com" },
//!   "history": [{ "increment_id": "000000101", "customer_id": 41, "grand_total": "50.00" }],
//!   "payment_data": { "avsaddr": "Y" },
//!   "remote_addr": "198.51.100.23"
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use signifyd_connect::order::{Customer, HistoricalOrder};
use signifyd_connect::{CaseContext, InMemoryOrderSource, Order};

use super::CommandError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderFixture {
    pub order: Order,
    #[serde(default)]
    pub customer: Option<Customer>,
    #[serde(default)]
    pub history: Vec<HistoricalOrder>,
    /// Gateway response data for methods that do not persist it on the order.
    #[serde(default)]
    pub payment_data: Option<HashMap<String, String>>,
    #[serde(default)]
    pub remote_addr: Option<String>,
}

impl OrderFixture {
    /// Read a fixture from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not a valid fixture.
    pub fn load(path: &Path) -> Result<Self, CommandError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CommandError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&raw)
    }

    /// Write the fixture back to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns error if the fixture cannot be serialized or the file written.
    pub fn save(&self, path: &Path) -> Result<(), CommandError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| CommandError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Parse a fixture from JSON text.
    ///
    /// # Errors
    ///
    /// Returns error if the JSON does not describe a fixture.
    pub fn parse(raw: &str) -> Result<Self, CommandError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Host data store seeded with the fixture's customer and order history.
    #[must_use]
    pub fn host(&self) -> InMemoryOrderSource {
        let host = self
            .history
            .iter()
            .cloned()
            .fold(InMemoryOrderSource::new(), InMemoryOrderSource::with_order);
        match &self.customer {
            Some(customer) => host.with_customer(customer.clone()),
            None => host,
        }
    }

    /// Copy the guarantee the host recorded for this order onto the order.
    ///
    /// Returns whether the order changed.
    pub fn record_guarantee(&mut self, host: &InMemoryOrderSource) -> bool {
        match host.guarantee(&self.order.increment_id) {
            Some(guarantee) if self.order.guarantee != Some(guarantee) => {
                self.order.guarantee = Some(guarantee);
                true
            }
            _ => false,
        }
    }

    /// Per-request context for building this order's case.
    #[must_use]
    pub fn context(&self) -> CaseContext {
        let mut context = CaseContext::new();
        if let Some(data) = &self.payment_data {
            context = context.with_payment_data(data.clone().into());
        }
        if let Some(addr) = &self.remote_addr {
            context = context.with_remote_addr(addr.as_str());
        }
        context
    }
}

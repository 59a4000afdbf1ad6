//! Device fingerprint session ids.
//!
//! The storefront's fingerprint script registers the shopper's device under
//! a session id derived from the store URL and the cart id. The same id is
//! attached to the case so the risk service can link the two.

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::config::FingerprintConfig;

/// Prefix identifying ids generated by this connector.
const SESSION_PREFIX: &str = "M2";

/// Device fingerprint service.
pub trait DeviceFingerprinter: Send + Sync {
    fn is_enabled(&self) -> bool;

    /// Session id for a cart.
    fn generate(&self, session_id: &str) -> String;
}

/// Fingerprinter keyed on the store's base URL.
#[derive(Debug, Clone, Default)]
pub struct StoreFingerprinter {
    enabled: bool,
    store_url: String,
}

impl StoreFingerprinter {
    #[must_use]
    pub fn new(enabled: bool, store_url: impl Into<String>) -> Self {
        Self {
            enabled,
            store_url: store_url.into(),
        }
    }

    /// A fingerprinter that never attaches a session id.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_config(config: &FingerprintConfig) -> Self {
        match &config.store_url {
            Some(url) => Self::new(config.enabled, url.as_str()),
            None => Self::disabled(),
        }
    }
}

impl DeviceFingerprinter for StoreFingerprinter {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn generate(&self, session_id: &str) -> String {
        format!(
            "{SESSION_PREFIX}{}{session_id}",
            STANDARD.encode(self.store_url.as_bytes())
        )
    }
}

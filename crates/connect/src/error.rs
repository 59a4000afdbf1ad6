//! Unified error handling for the connector.

use thiserror::Error;

use crate::client::ApiError;
use crate::config::ConfigError;
use crate::order::HostError;
use crate::store::StoreError;

/// Connector-level error type.
///
/// Only collaborator I/O surfaces here. Field extraction problems are logged
/// and degraded to absent values inside the builder, and submission failures
/// are reported as `None`/`false` by [`crate::service::CaseService`].
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Case record storage failed.
    #[error("Case store error: {0}")]
    Store(#[from] StoreError),

    /// Host order data could not be read or written.
    #[error("Host data error: {0}")]
    Host(#[from] HostError),

    /// Risk service call failed.
    #[error("Signifyd API error: {0}")]
    Api(#[from] ApiError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_error_display() {
        let err = ConnectError::from(StoreError::DataCorruption("bad guarantee".to_string()));
        assert_eq!(
            err.to_string(),
            "Case store error: data corruption: bad guarantee"
        );

        let err = ConnectError::from(HostError::Unavailable("orders table".to_string()));
        assert_eq!(
            err.to_string(),
            "Host data error: host data store unavailable: orders table"
        );
    }
}

//! CLI subcommands.

pub mod case;
pub mod fixture;
pub mod migrate;

use signifyd_connect::ConnectError;
use signifyd_connect::client::ApiError;
use signifyd_connect::config::ConfigError;
use thiserror::Error;

/// Errors raised by the case commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Fixture file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid fixture JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Connect(#[from] ConnectError),
}

//! Case commands: build, submit, and cancel.
//!
//! # Usage
//!
//! ```bash
//! signifyd-cli build --order fixtures/order.json
//! signifyd-cli submit --order fixtures/order.json
//! signifyd-cli cancel --order fixtures/order.json
//! ```
//!
//! `submit` and `cancel` record cases in `PostgreSQL` and need
//! `SIGNIFYD_DATABASE_URL` (or `DATABASE_URL`).

use std::path::Path;

use signifyd_connect::config::ConfigError;
use signifyd_connect::store::create_pool;
use signifyd_connect::{
    AdapterRegistry, CaseBuilder, CaseService, ConnectConfig, HttpCaseClient, InMemoryOrderSource,
    PgCaseStore, StoreFingerprinter, SubmissionOutcome,
};
use tracing::{info, warn};

use super::CommandError;
use super::fixture::OrderFixture;

type Service = CaseService<PgCaseStore, HttpCaseClient, InMemoryOrderSource>;

fn case_builder(config: &ConnectConfig) -> CaseBuilder {
    CaseBuilder::new(
        AdapterRegistry::with_defaults(),
        StoreFingerprinter::from_config(&config.fingerprint),
        config.version_info(),
    )
}

async fn service(config: &ConnectConfig, fixture: &OrderFixture) -> Result<Service, CommandError> {
    let database_url = config
        .database_url
        .as_ref()
        .ok_or_else(|| ConfigError::MissingEnvVar("SIGNIFYD_DATABASE_URL".to_string()))?;

    let pool = create_pool(database_url).await?;
    let api = HttpCaseClient::new(&config.api)?;

    Ok(CaseService::new(
        PgCaseStore::new(pool),
        api,
        fixture.host(),
        case_builder(config),
    ))
}

/// Build the case for an order fixture and print it as JSON.
///
/// # Errors
///
/// Returns error if the fixture cannot be loaded or host data is unavailable.
pub async fn build(config: &ConnectConfig, path: &Path) -> Result<(), CommandError> {
    let fixture = OrderFixture::load(path)?;
    let case = case_builder(config)
        .build(&fixture.order, fixture.context(), &fixture.host())
        .await?;

    let json = serde_json::to_string_pretty(&case)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{json}");
    }
    Ok(())
}

/// Submit an order fixture for review.
///
/// # Errors
///
/// Returns error if the fixture, database, or client cannot be set up, or
/// the case record cannot be stored.
pub async fn submit(config: &ConnectConfig, path: &Path) -> Result<(), CommandError> {
    let fixture = OrderFixture::load(path)?;
    let service = service(config, &fixture).await?;

    match service.submit_order(&fixture.order, fixture.context()).await? {
        SubmissionOutcome::AlreadySubmitted => {
            info!(order_id = %fixture.order.increment_id, "Case already exists");
        }
        SubmissionOutcome::Submitted { code } => {
            info!(order_id = %fixture.order.increment_id, %code, "Case submitted");
        }
        SubmissionOutcome::Failed => {
            warn!(order_id = %fixture.order.increment_id, "Case submission failed");
        }
    }
    Ok(())
}

/// Request guarantee cancellation for an order fixture.
///
/// A canceled guarantee is written back onto the order in the fixture file.
///
/// # Errors
///
/// Returns error if the fixture, database, or client cannot be set up, or
/// the case record or fixture file cannot be read or updated.
pub async fn cancel(config: &ConnectConfig, path: &Path) -> Result<(), CommandError> {
    let mut fixture = OrderFixture::load(path)?;
    let service = service(config, &fixture).await?;

    if service.cancel_case(&fixture.order).await? {
        if fixture.record_guarantee(service.host()) {
            fixture.save(path)?;
        }
        info!(order_id = %fixture.order.increment_id, "Guarantee canceled");
    } else {
        info!(order_id = %fixture.order.increment_id, "Guarantee not canceled");
    }
    Ok(())
}

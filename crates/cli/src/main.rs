//! Signifyd Connect CLI - Case submission and database tools.
//!
//! # Usage
//!
//! ```bash
//! # Print the case built for an order fixture
//! signifyd-cli build --order fixtures/order.json
//!
//! # Submit an order for review
//! signifyd-cli submit --order fixtures/order.json
//!
//! # Cancel the guarantee of a fully refunded order
//! signifyd-cli cancel --order fixtures/order.json
//!
//! # Create the case table
//! signifyd-cli migrate
//! ```
//!
//! # Commands
//!
//! - `build` - Build and print a case without sending it
//! - `submit` - Build, submit, and record a case
//! - `cancel` - Request guarantee cancellation
//! - `migrate` - Run database migrations

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use signifyd_connect::ConnectConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "signifyd-cli")]
#[command(author, version, about = "Signifyd Connect CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the case for an order and print it as JSON
    Build {
        /// Order fixture (JSON)
        #[arg(short, long)]
        order: PathBuf,
    },
    /// Submit an order to Signifyd unless it already has a case
    Submit {
        /// Order fixture (JSON)
        #[arg(short, long)]
        order: PathBuf,
    },
    /// Cancel the guarantee of a fully canceled or refunded order
    Cancel {
        /// Order fixture (JSON)
        #[arg(short, long)]
        order: PathBuf,
    },
    /// Run database migrations
    Migrate,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ConnectConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "signifyd_connect=info,signifyd_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if matches!(cli.command, Commands::Migrate) {
        commands::migrate::run().await?;
        return Ok(());
    }

    let config = ConnectConfig::from_env()?;
    let _sentry_guard = init_sentry(&config);

    match cli.command {
        Commands::Build { order } => commands::case::build(&config, &order).await?,
        Commands::Submit { order } => commands::case::submit(&config, &order).await?,
        Commands::Cancel { order } => commands::case::cancel(&config, &order).await?,
        Commands::Migrate => {}
    }
    Ok(())
}

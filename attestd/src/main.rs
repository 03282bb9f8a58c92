//! Price Attestation Daemon
//!
//! Runs exactly one attestation round and exits with the scheduler signal:
//! `0` succeeded, `1` retry-me, `2` fatal.
//!
//! # Usage
//!
//! ```bash
//! XRPL_JSON_RPC_URL=http://127.0.0.1:5005 \
//! XRPL_ACCOUNT=r... WALLET_SECRET=s... GIT_COMMIT=$(git rev-parse HEAD) \
//! AGGREGATOR_URL=http://localhost:8000/sample \
//! cargo run -p attestd
//! ```
//!
//! # Environment Variables
//!
//! - `XRPL_JSON_RPC_URL`: Ledger JSON-RPC endpoint (required). Must be a trusted,
//!   signing-enabled node: the signing secret is sent to it. Public nodes refuse `sign`.
//! - `XRPL_NODE_ENVIRONMENT`: Mainnet or Testnet (default: Testnet)
//! - `XRPL_ACCOUNT`: Attesting account address (required)
//! - `WALLET_SECRET`: Signing secret (required)
//! - `GIT_COMMIT`: Build identifier embedded in evidence (required)
//! - `AGGREGATOR_URL`: Price aggregator endpoint (required)
//! - `ATTEST_SAMPLE_COUNT`: Samples per source (default: 3)
//! - `ATTEST_SAMPLE_DELAY_MS`: Delay between samples (default: 1600)
//! - `ATTEST_EXHAUSTIVE`: Use exhaustive sources (default: true)
//! - `ATTEST_MAX_FEE_DROPS`: Fee ceiling in drops (default: 2000000)
//! - `ATTEST_PUSHGATEWAY_URL`: Prometheus pushgateway (optional)
//! - `ATTEST_LOG_JSON`: JSON log output (default: false)

use std::process;
use std::sync::Arc;

use attest_connectors::{HttpAggregator, XrplRpcClient};
use attest_exec::ExecutionJournal;
use attestd::{Config, DaemonError, PrometheusSink, RoundController, RoundSettings};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log a setup error and exit with its scheduler signal.
fn exit_setup_failure(context: &str, error: DaemonError) -> ! {
    error!(error = %error, "{}", context);
    process::exit(error.scheduler_signal().exit_code());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env();

    // Initialize tracing
    let log_json = config.as_ref().map(|c| c.log_json).unwrap_or(false);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("attestd=info,attest_exec=info,attest_connectors=info"));
    if log_json {
        tracing_subscriber::registry().with(fmt::layer().json()).with(filter).init();
    } else {
        tracing_subscriber::registry().with(fmt::layer()).with(filter).init();
    }

    let config = config.unwrap_or_else(|e| exit_setup_failure("Invalid configuration", e));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        network = %config.network,
        account = %config.account_id,
        build_id = %config.build_id,
        rpc_url = %config.ledger.rpc_url,
        "Price attestation round"
    );

    let credentials = config
        .credentials()
        .unwrap_or_else(|e| exit_setup_failure("Invalid credentials", e));
    let metrics = PrometheusSink::new(config.pushgateway_url.clone())
        .map(Arc::new)
        .unwrap_or_else(|e| exit_setup_failure("Failed to register metrics", e));

    let aggregator = Arc::new(HttpAggregator::new(config.aggregator.url.clone()));
    let ledger = XrplRpcClient::new(config.ledger.rpc_url.clone()).with_max_fee(config.ledger.max_fee_drops);
    if !ledger.is_trusted_endpoint() {
        warn!(
            rpc_url = %config.ledger.rpc_url,
            "Signing secret will be sent to a non-local endpoint over plain HTTP"
        );
    }

    let settings = RoundSettings {
        network: config.network,
        build_id: config.build_id.clone(),
        sampling: config.aggregator.sampling.clone(),
    };
    let controller = RoundController::new(
        aggregator,
        Arc::new(ledger),
        Arc::new(ExecutionJournal::new()),
        credentials,
        settings,
    )
    .with_metrics(metrics.clone());

    let report = controller.run_round().await;
    metrics.flush().await;

    let signal = report.signal();
    if signal.is_failure() {
        process::exit(signal.exit_code());
    }

    Ok(())
}

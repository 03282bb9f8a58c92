//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible defaults.
//!
//! `XRPL_JSON_RPC_URL` must point at a trusted, signing-enabled node: the
//! `sign` method sends `WALLET_SECRET` to it. Public nodes reject `sign`.

use attest_connectors::DEFAULT_MAX_FEE_DROPS;
use attest_domain::{Network, WalletCredentials};
use attest_exec::SamplingParams;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use zeroize::Zeroizing;

use crate::error::{DaemonError, DaemonResult};

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Clone)]
pub struct Config {
    /// Ledger network (selects currency/issuer)
    pub network: Network,

    /// Ledger node configuration
    pub ledger: LedgerConfig,

    /// Aggregator configuration
    pub aggregator: AggregatorConfig,

    /// Attesting account
    pub account_id: String,

    /// Signing secret
    wallet_secret: Zeroizing<String>,

    /// Build identifier embedded in evidence
    pub build_id: String,

    /// Optional Prometheus pushgateway
    pub pushgateway_url: Option<String>,

    /// Emit JSON logs
    pub log_json: bool,
}

/// Ledger node configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint
    pub rpc_url: String,
    /// Upper bound on fee quotes, in drops
    pub max_fee_drops: u64,
}

/// Aggregator configuration.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// HTTP endpoint
    pub url: String,
    /// Sampling parameters passed on every round
    pub sampling: SamplingParams,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let network = load_parsed("XRPL_NODE_ENVIRONMENT", Network::Testnet)?;

        let ledger = LedgerConfig {
            rpc_url: load_required("XRPL_JSON_RPC_URL")?,
            max_fee_drops: load_parsed("ATTEST_MAX_FEE_DROPS", DEFAULT_MAX_FEE_DROPS)?,
        };

        let defaults = SamplingParams::default();
        let delay_ms = load_parsed("ATTEST_SAMPLE_DELAY_MS", defaults.inter_sample_delay.as_millis() as u64)?;
        let aggregator = AggregatorConfig {
            url: load_required("AGGREGATOR_URL")?,
            sampling: SamplingParams {
                source_count: load_parsed("ATTEST_SAMPLE_COUNT", defaults.source_count)?,
                inter_sample_delay: Duration::from_millis(delay_ms),
                exhaustive: load_parsed("ATTEST_EXHAUSTIVE", defaults.exhaustive)?,
            },
        };

        let config = Self {
            network,
            ledger,
            aggregator,
            account_id: load_required("XRPL_ACCOUNT")?,
            wallet_secret: Zeroizing::new(load_required("WALLET_SECRET")?),
            build_id: load_required("GIT_COMMIT")?,
            pushgateway_url: load_optional("ATTEST_PUSHGATEWAY_URL"),
            log_json: load_parsed("ATTEST_LOG_JSON", false)?,
        };

        // Surface bad credentials at startup rather than mid-round
        config.credentials()?;

        Ok(config)
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            network: Network::Testnet,
            ledger: LedgerConfig {
                rpc_url: "http://127.0.0.1:5005".to_string(),
                max_fee_drops: DEFAULT_MAX_FEE_DROPS,
            },
            aggregator: AggregatorConfig {
                url: "http://127.0.0.1:8000/sample".to_string(),
                sampling: SamplingParams {
                    source_count: 1,
                    inter_sample_delay: Duration::ZERO,
                    exhaustive: false,
                },
            },
            account_id: "rTestOracleAccount".to_string(),
            wallet_secret: Zeroizing::new("sTestSecret".to_string()),
            build_id: "test".to_string(),
            pushgateway_url: None,
            log_json: false,
        }
    }

    /// Signing credentials for the attesting account.
    pub fn credentials(&self) -> DaemonResult<WalletCredentials> {
        Ok(WalletCredentials::new(self.account_id.clone(), self.wallet_secret.as_str())?)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("network", &self.network)
            .field("ledger", &self.ledger)
            .field("aggregator", &self.aggregator)
            .field("account_id", &self.account_id)
            .field("wallet_secret", &"<redacted>")
            .field("build_id", &self.build_id)
            .field("pushgateway_url", &self.pushgateway_url)
            .field("log_json", &self.log_json)
            .finish()
    }
}

fn load_required(key: &str) -> DaemonResult<String> {
    match load_optional(key) {
        Some(val) => Ok(val),
        None => Err(DaemonError::Config(format!("{} is required", key))),
    }
}

fn load_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn load_parsed<T>(key: &str, default: T) -> DaemonResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match load_optional(key) {
        Some(val) => val
            .parse::<T>()
            .map_err(|e| DaemonError::Config(format!("Invalid {} value: {} ({})", key, val, e))),
        None => Ok(default),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_config() {
        let config = Config::test();

        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.aggregator.sampling.source_count, 1);
        assert_eq!(config.ledger.max_fee_drops, 2_000_000);
        assert!(config.pushgateway_url.is_none());
    }

    #[test]
    fn test_credentials_from_config() {
        let credentials = Config::test().credentials().unwrap();

        assert_eq!(credentials.account_id, "rTestOracleAccount");
        assert_eq!(credentials.expose_secret(), "sTestSecret");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", Config::test());

        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("sTestSecret"));
    }

    // Each test below uses its own variable name so they can run in parallel.

    #[test]
    fn test_load_parsed_default_when_unset() {
        assert_eq!(load_parsed("ATTEST_CFG_TEST_UNSET", 7u32).unwrap(), 7);
    }

    #[test]
    fn test_load_parsed_value() {
        env::set_var("ATTEST_CFG_TEST_NETWORK", "Mainnet");
        assert_eq!(load_parsed("ATTEST_CFG_TEST_NETWORK", Network::Testnet).unwrap(), Network::Mainnet);
    }

    #[test]
    fn test_load_parsed_invalid() {
        env::set_var("ATTEST_CFG_TEST_COUNT", "three");
        let err = load_parsed("ATTEST_CFG_TEST_COUNT", 3u32).unwrap_err();
        assert!(err.to_string().contains("ATTEST_CFG_TEST_COUNT"));
    }

    #[test]
    fn test_invalid_flag_is_fatal() {
        env::set_var("ATTEST_CFG_TEST_LOG_JSON", "yes");
        let err = load_parsed("ATTEST_CFG_TEST_LOG_JSON", false).unwrap_err();

        assert!(matches!(err, DaemonError::Config(_)));
        assert_eq!(err.scheduler_signal(), attest_exec::SchedulerSignal::Fatal);
    }

    #[test]
    fn test_load_required_rejects_blank() {
        env::set_var("ATTEST_CFG_TEST_BLANK", "   ");
        assert!(load_required("ATTEST_CFG_TEST_BLANK").is_err());
    }
}

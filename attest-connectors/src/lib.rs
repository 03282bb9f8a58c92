//! External service adapters for the attestation oracle.
//!
//! - [`XrplRpcClient`]: XRPL JSON-RPC node (fee, ledger, sequence, sign, submit)
//! - [`HttpAggregator`]: multi-exchange price aggregator over HTTP

#![warn(clippy::all)]

pub mod aggregator_http;
pub mod xrpl_rpc;
pub mod xrpl_tx;

pub use aggregator_http::{AggregatorHttpError, HttpAggregator};
pub use xrpl_rpc::{XrplRpcClient, XrplRpcError, DEFAULT_MAX_FEE_DROPS, EXPIRED_CODE};
pub use xrpl_tx::{ripple_time_to_utc, trust_set_tx_json, TF_SET_NO_RIPPLE};

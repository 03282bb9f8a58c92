//! Prometheus sink for the attested price gauge.
//!
//! The gauge lives in a private registry. When a pushgateway is configured
//! every recorded price is pushed on a blocking task; the push never
//! influences the round's disposition.

use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts, Registry};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use attest_domain::IssuedCurrency;
use attest_exec::MetricsSink;

use crate::error::DaemonResult;

/// Pushgateway job name.
pub const PUSH_JOB: &str = "attestd";

/// Gauge name.
pub const PRICE_METRIC: &str = "attested_price";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Prometheus-backed [`MetricsSink`].
pub struct PrometheusSink {
    registry: Registry,
    price: GaugeVec,
    pushgateway_url: Option<String>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl PrometheusSink {
    /// Create a sink, optionally pushing to `pushgateway_url`.
    pub fn new(pushgateway_url: Option<String>) -> DaemonResult<Self> {
        let registry = Registry::new();
        let price = GaugeVec::new(
            Opts::new(PRICE_METRIC, "Price last attested on the ledger"),
            &["currency", "issuer"],
        )?;
        registry.register(Box::new(price.clone()))?;

        Ok(Self {
            registry,
            price,
            pushgateway_url,
            pending: Mutex::new(Vec::new()),
        })
    }

    /// Registry holding the gauge.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Current gauge value for a currency/issuer pair.
    pub fn price(&self, currency: &IssuedCurrency) -> f64 {
        self.price.with_label_values(&[&currency.currency, &currency.issuer]).get()
    }

    /// Wait for in-flight pushes to finish.
    pub async fn flush(&self) {
        let pending = std::mem::take(&mut *lock(&self.pending));
        for handle in pending {
            if let Err(e) = handle.await {
                warn!(error = %e, "Metrics push task failed");
            }
        }
    }
}

impl MetricsSink for PrometheusSink {
    fn record_price(&self, currency: &IssuedCurrency, price: Decimal) {
        let Some(value) = price.to_f64() else {
            warn!(%price, "Price not representable as gauge value");
            return;
        };

        self.price.with_label_values(&[&currency.currency, &currency.issuer]).set(value);
        debug!(currency = %currency.currency, issuer = %currency.issuer, value, "Price gauge set");

        let Some(url) = self.pushgateway_url.clone() else {
            return;
        };
        let families = self.registry.gather();

        // The push client blocks, so keep it off the async workers.
        match Handle::try_current() {
            Ok(handle) => {
                let task = handle.spawn_blocking(move || push(&url, families));
                lock(&self.pending).push(task);
            },
            Err(_) => push(&url, families),
        }
    }
}

fn push(url: &str, families: Vec<MetricFamily>) {
    let grouping: HashMap<String, String> = HashMap::new();
    if let Err(e) = prometheus::push_metrics(PUSH_JOB, grouping, url, families, None) {
        warn!(error = %e, url, "Failed to push metrics");
    }
}

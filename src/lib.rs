//! Paycheck estimator and budget allocator: progressive tax withholding,
//! known-net overrides, ad-hoc adjustments and per-account allocation
//! balances, persisted as a single JSON snapshot.

pub mod api;
pub mod core;
pub mod store;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("paybudget=info"));

        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    });
}

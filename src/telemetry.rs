//! Logging setup shared by both binaries.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "dispersion_viz=info,dispersion=info,web=info";

/// Installs the fmt subscriber. `RUST_LOG` overrides the default filter.
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

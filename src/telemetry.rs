//! Logging setup for binaries and tests embedding the engine.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "olap_dialogue=info";

/// Install a fmt subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice() {
        init_tracing();
        init_tracing();
        tracing::info!("still logging");
    }
}

use tracing_subscriber::EnvFilter;

use crate::config::RfidConfig;

/// Installs the global fmt subscriber on stderr. `RUST_LOG` wins over the
/// configured default level.
pub fn init(config: &RfidConfig) {
    let default_level = if config.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

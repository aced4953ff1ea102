use crate::Result;

/// Initialize tracing for a hashtag service binary.
///
/// Events go to stderr; stdout is left to the transport. Library code only
/// emits `tracing` events, so tests and embedders that never call this stay silent.
pub fn init(service_name: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    // Default: info for our crates, warn for everything else.
    // Can be overridden with `RUST_LOG`.
    let target = service_name.replace('-', "_");
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,hashtag_core=info,{target}=info")));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| crate::Error::Config(format!("failed to install tracing subscriber: {e}")))?;

    Ok(())
}

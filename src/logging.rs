use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber writing to stderr. The filter is read from
/// `RUST_LOG`, falling back to `info`. Calling this more than once is a
/// no-op.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

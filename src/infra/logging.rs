/// Initializes `tracing` output for the binaries.
///
/// Verbosity follows `RUST_LOG` (for example `RUST_LOG=storefront_api=debug`),
/// defaulting to `info`. Calling it twice is harmless.
pub fn setup_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

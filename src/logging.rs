use tracing_subscriber::EnvFilter;

/// Default filter: per-job traces in debug builds, lifecycle lines only in release.
fn default_directive() -> &'static str {
    if cfg!(debug_assertions) {
        "job_relay=debug"
    } else {
        "job_relay=info"
    }
}

/// Install the stderr subscriber. `RUST_LOG` overrides the default filter.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .try_init();
}

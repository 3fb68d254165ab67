use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber.
///
/// `env_filter` uses the usual `RUST_LOG` directive syntax, e.g.
/// `"warn,indexer=debug"`. Must be called at most once, before any spans or
/// events are emitted.
pub fn initialize(env_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_ansi(false)
        .init();
}

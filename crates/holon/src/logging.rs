// Logging
//
// Human-readable tracing output on stderr, so stdout stays free for progress.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `verbose` forces `debug` and
/// `level` is used as-is. Calling this twice keeps the first subscriber.
pub fn init_logging(level: &str, verbose: bool) {
    let default_level = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

//! stderr logging. `RUST_LOG` wins over the verbosity flag.

use tracing_subscriber::EnvFilter;

pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "datamine=debug"
    } else {
        "datamine=info"
    }
}

/// Install the global subscriber. Later calls are no-ops, so the CLI can be
/// driven more than once in one process (tests).
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(verbose).into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

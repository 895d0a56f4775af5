//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Filter directives used when `RUST_LOG` is not set.
pub fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        // Verbose mode: per-packet tracing from the pipeline crates
        "mediamux=trace,mediamux_packet=trace,mediamux_codec=debug"
    } else {
        "mediamux=info,mediamux_packet=info,mediamux_codec=info"
    }
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins over the defaults picked by `verbose`. Calling this more
/// than once keeps the first subscriber.
pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}

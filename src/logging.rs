use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter, e.g. `keybridge=debug`.
pub const LOG_ENV: &str = "KEYBRIDGE_LOG";

/// Install a stderr subscriber. `KEYBRIDGE_LOG` wins over `verbosity`.
/// Safe to call more than once; later calls are ignored.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

//! Logging setup for the binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to whoever embeds it.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Verbosity offset from repeated `-v` and `-q` flags.
pub fn verbosity(verbose: u8, quiet: u8) -> i8 {
    let clamp = |count: u8| i8::try_from(count).unwrap_or(i8::MAX);
    clamp(verbose).saturating_sub(clamp(quiet))
}

/// Default filter for a verbosity offset (`-v` positive, `-q` negative).
pub fn default_directive(verbosity: i8) -> &'static str {
    match verbosity {
        i8::MIN..=-2 => "error",
        -1 => "warn",
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Initialize the tracing subscriber
///
/// `RUST_LOG` wins when set; otherwise the level follows `verbosity`.
/// Output goes to stderr with target and thread ids.
///
/// # Errors
/// Returns an error if a subscriber has already been installed
pub fn init(verbosity: i8) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true),
        )
        .try_init()
}

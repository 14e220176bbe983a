//! Logging
//!
//! - `LogEvent` - one relayed chunk, rendered per `LogMode`
//! - `LogSink` / `StopObserver` - capabilities injected into a session
//! - `init_tracing` - internal diagnostics via `tracing`

pub mod entry;
pub mod sink;

pub use entry::{LogEvent, Tag};
pub use sink::{ConsoleSink, LogSink, StopObserver};

/// Install the stderr diagnostics subscriber
///
/// `RUST_LOG` wins when set; otherwise `warn`, or `debug` with `verbose`.
/// Session lines go to the `LogSink` on stdout, never through here.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .with(filter)
        .try_init();
}

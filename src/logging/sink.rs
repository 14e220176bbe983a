//! Capabilities a session reports through
//!
//! The bridge never surfaces errors to its caller directly. Everything goes
//! to a `LogSink`, and an unrecoverable end of a session is signalled once
//! through a `StopObserver`.

use std::io::Write;

/// Receives user-facing log lines
///
/// Called concurrently from the pump and heartbeat tasks. Retention and
/// thread-safety of whatever backs the sink are the sink's concern.
pub trait LogSink: Send + Sync + 'static {
    fn log(&self, message: &str);
}

/// Notified when a session has stopped
pub trait StopObserver: Send + Sync + 'static {
    fn on_stopped(&self);
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync + 'static,
{
    fn log(&self, message: &str) {
        self(message)
    }
}

impl<F> StopObserver for F
where
    F: Fn() + Send + Sync + 'static,
{
    fn on_stopped(&self) {
        self()
    }
}

/// Writes timestamped lines to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ConsoleSink {
    /// Current timestamp as HH:MM:SS.mmm
    #[inline]
    fn now() -> String {
        chrono::Local::now().format("%H:%M:%S%.3f").to_string()
    }
}

impl LogSink for ConsoleSink {
    fn log(&self, message: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{} {}", Self::now(), message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_closure_sink() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let captured = lines.clone();
        let sink: Arc<dyn LogSink> = Arc::new(move |msg: &str| captured.lock().push(msg.to_string()));

        sink.log("one");
        sink.log("two");
        assert_eq!(*lines.lock(), vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn test_closure_observer() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let observer: Arc<dyn StopObserver> = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        observer.on_stopped();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}

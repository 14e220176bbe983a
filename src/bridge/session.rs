//! Shared state of one bridge session
//!
//! A `Session` is created by `Bridge::start` and shared (via `Arc`) by the
//! supervisor, both pumps and the heartbeat task. It owns:
//! - the running flag and the cancellation signal
//! - one handle slot per transport (the only place links are stored)
//! - the live logging/reconnect settings
//! - the injected log sink and stop observer

use super::stats::Stats;
use super::State;
use crate::config::{BridgeConfig, LogMode};
use crate::logging::{LogEvent, LogSink, StopObserver, Tag};
use crate::transport::{wait_closed, Connector, Link};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Which transport a handle belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Serial,
    Tcp,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial => f.write_str("serial"),
            Self::Tcp => f.write_str("TCP"),
        }
    }
}

// =============================================================================
// Handle slot
// =============================================================================

/// Holder of the current link for one side
///
/// Every read, replace and close of a handle goes through this lock. Pumps
/// fetch `current()` once per iteration, so a replacement made by a
/// reconnect is picked up without restarting them.
#[derive(Default)]
pub(crate) struct Slot {
    link: Mutex<Option<Arc<Link>>>,
}

impl Slot {
    pub fn current(&self) -> Option<Arc<Link>> {
        self.link.lock().clone()
    }

    /// Store a freshly opened link while the session is still running
    ///
    /// Returns false (and closes `link`) if the session stopped meanwhile.
    pub fn install(&self, link: Link, running: &AtomicBool) -> bool {
        let mut slot = self.link.lock();
        if !running.load(Ordering::SeqCst) {
            link.close();
            return false;
        }
        if let Some(old) = slot.replace(Arc::new(link)) {
            old.close();
        }
        true
    }

    /// Close and forget the current link (no-op when absent)
    pub fn close(&self) {
        if let Some(link) = self.link.lock().take() {
            link.close();
        }
    }

    /// Close `link` and clear the slot if it still holds that link
    ///
    /// A link installed by a concurrent reconnect is left alone.
    pub fn close_if(&self, link: &Arc<Link>) {
        let mut slot = self.link.lock();
        if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, link)) {
            *slot = None;
        }
        link.close();
    }

    pub fn is_open(&self) -> bool {
        self.link.lock().is_some()
    }
}

// =============================================================================
// Live settings
// =============================================================================

/// Settings that can change while the session runs
pub(crate) struct Settings {
    print_log: AtomicBool,
    hex_log: AtomicBool,
    auto_reconnect: AtomicBool,
}

impl Settings {
    fn from_config(config: &BridgeConfig) -> Self {
        Self {
            print_log: AtomicBool::new(config.log_mode != LogMode::Off),
            hex_log: AtomicBool::new(config.log_mode == LogMode::Hex),
            auto_reconnect: AtomicBool::new(config.auto_reconnect),
        }
    }

    pub fn log_mode(&self) -> LogMode {
        LogMode::from_flags(
            self.print_log.load(Ordering::Relaxed),
            self.hex_log.load(Ordering::Relaxed),
        )
    }

    pub fn set_print_log(&self, enabled: bool) {
        self.print_log.store(enabled, Ordering::Relaxed);
    }

    pub fn set_hex_log(&self, enabled: bool) {
        self.hex_log.store(enabled, Ordering::Relaxed);
    }

    pub fn set_auto_reconnect(&self, enabled: bool) {
        self.auto_reconnect.store(enabled, Ordering::Relaxed);
    }

    pub fn auto_reconnect(&self) -> bool {
        self.auto_reconnect.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Session
// =============================================================================

pub(crate) struct Session {
    pub config: BridgeConfig,
    pub connector: Arc<dyn Connector>,
    pub settings: Settings,
    pub stats: Arc<Stats>,
    running: AtomicBool,
    serial: Slot,
    tcp: Slot,
    cancel: watch::Sender<bool>,
    state: Arc<RwLock<State>>,
    sink: Arc<dyn LogSink>,
    observer: Option<Arc<dyn StopObserver>>,
    notified: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Session {
    pub fn new(
        config: BridgeConfig,
        connector: Arc<dyn Connector>,
        sink: Arc<dyn LogSink>,
        observer: Option<Arc<dyn StopObserver>>,
        state: Arc<RwLock<State>>,
    ) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            settings: Settings::from_config(&config),
            config,
            connector,
            stats: Arc::new(Stats::new()),
            running: AtomicBool::new(true),
            serial: Slot::default(),
            tcp: Slot::default(),
            cancel,
            state,
            sink,
            observer,
            notified: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn running_flag(&self) -> &AtomicBool {
        &self.running
    }

    pub fn slot(&self, side: Side) -> &Slot {
        match side {
            Side::Serial => &self.serial,
            Side::Tcp => &self.tcp,
        }
    }

    pub fn set_state(&self, state: State) {
        *self.state.write() = state;
    }

    /// Run a task owned by this session
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.lock().push(tokio::spawn(task));
    }

    /// Handles of the spawned tasks, for joining at teardown
    pub fn take_tasks(&self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut *self.tasks.lock())
    }

    // === Logging ===

    pub fn log(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        debug!("{}", message);
        self.sink.log(message);
    }

    /// Log relayed bytes according to the current logging mode
    pub fn log_traffic(&self, tag: Tag, data: &[u8]) {
        if let Some(line) = LogEvent::new(tag, data).render(self.settings.log_mode()) {
            self.sink.log(&line);
        }
    }

    // === Cancellation ===

    /// Resolves once the session is being stopped
    pub async fn cancelled(&self) {
        wait_closed(self.cancel.subscribe()).await
    }

    /// Sleep for `duration` unless the session stops first
    ///
    /// Returns false if interrupted by a stop.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancelled() => false,
            _ = tokio::time::sleep(duration) => self.is_running(),
        }
    }

    /// Flip the running flag, close both handles and raise the cancel signal
    ///
    /// Idempotent. Does not wait for the tasks.
    pub fn shutdown(&self) {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        if was_running {
            let mut state = self.state.write();
            if *state != State::Stopped {
                *state = State::Stopping;
            }
        }
        self.tcp.close();
        self.serial.close();
        self.cancel.send_replace(true);
    }

    /// End the session from inside after an unrecoverable error
    pub fn terminate(&self) {
        self.shutdown();
        self.set_state(State::Stopped);
        self.notify_stopped();
    }

    /// Invoke the stop observer, at most once per session
    pub fn notify_stopped(&self) {
        if self.notified.swap(true, Ordering::SeqCst) {
            return;
        }
        self.log("Session stopped");
        if let Some(observer) = &self.observer {
            observer.on_stopped();
        }
    }
}

//! Bridge session controller
//!
//! `Bridge` starts and stops sessions relaying bytes between one serial
//! device and one TCP server:
//!
//! ```text
//! Idle -> Connecting -> Active -> Stopping -> Stopped
//! ```
//!
//! `start` connects serial then TCP (retrying per the reconnect policy),
//! then launches both pumps and the optional heartbeat. `stop` closes both
//! handles, cancels the tasks and waits for all of them to finish.
//!
//! Failures never surface as errors: they go to the `LogSink`, and a
//! session that ends on its own is reported through the `StopObserver`.

mod heartbeat;
mod pump;
mod session;
pub mod stats;
mod supervisor;

use self::pump::Direction;
use self::session::{Session, Side};
use self::stats::Stats;
use crate::config::BridgeConfig;
use crate::logging::{LogSink, StopObserver};
use crate::transport::{Connector, SystemConnector};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, warn};

/// Bridge state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Connecting,
    Active,
    Stopping,
    Stopped,
}

/// Controls bridge sessions
///
/// At most one session exists at a time; `start` replaces the previous one.
pub struct Bridge {
    connector: Arc<dyn Connector>,
    sink: Arc<dyn LogSink>,
    observer: Option<Arc<dyn StopObserver>>,
    state: Arc<RwLock<State>>,
    session: Mutex<Option<Arc<Session>>>,
    /// Held by `start` while connecting and by every teardown
    lifecycle: tokio::sync::Mutex<()>,
}

impl Bridge {
    /// Bridge over real serial ports and TCP sockets
    pub fn new(sink: Arc<dyn LogSink>, observer: Option<Arc<dyn StopObserver>>) -> Self {
        Self::with_connector(Arc::new(SystemConnector), sink, observer)
    }

    /// Bridge opening its transports through `connector`
    pub fn with_connector(
        connector: Arc<dyn Connector>,
        sink: Arc<dyn LogSink>,
        observer: Option<Arc<dyn StopObserver>>,
    ) -> Self {
        Self {
            connector,
            sink,
            observer,
            state: Arc::new(RwLock::new(State::Idle)),
            session: Mutex::new(None),
            lifecycle: tokio::sync::Mutex::new(()),
        }
    }

    /// Start a session, stopping any previous one first
    ///
    /// Returns once both transports are connected and the tasks run, or once
    /// the session failed to start. With auto-reconnect on and a peer
    /// unreachable this waits until it becomes reachable, or until `stop` or
    /// another `start` replaces the session.
    pub async fn start(&self, config: BridgeConfig) {
        let session = Arc::new(Session::new(
            config,
            self.connector.clone(),
            self.sink.clone(),
            self.observer.clone(),
            self.state.clone(),
        ));

        // Publish before waiting: a start() still in its connect loop holds
        // the lifecycle lock and only returns once its session is signalled
        let previous = self.session.lock().replace(session.clone());
        if let Some(previous) = &previous {
            previous.shutdown();
        }

        let _lifecycle = self.lifecycle.lock().await;
        if let Some(previous) = previous {
            self.teardown(previous).await;
        }
        if !session.is_running() {
            // Replaced or stopped while waiting; its owner tears it down
            return;
        }

        session.set_state(State::Connecting);
        session.log(format!(
            "Starting bridge: {} @ {} baud <-> TCP {}",
            session.config.serial_port,
            session.config.baud_rate,
            session.config.server_addr()
        ));

        // Serial first; a failure on one side does not skip the other
        let serial_ok = supervisor::connect(&session, Side::Serial).await;
        let tcp_ok = supervisor::connect(&session, Side::Tcp).await;

        if !session.is_running() {
            return;
        }
        if !(serial_ok && tcp_ok) {
            session.log("Bridge not started");
            session.terminate();
            return;
        }

        session.set_state(State::Active);
        session.log("Bridge started");

        session.spawn(pump::run(session.clone(), Direction::TcpToSerial));
        session.spawn(pump::run(session.clone(), Direction::SerialToTcp));
        if let Some(payload) = heartbeat::payload(&session) {
            session.spawn(heartbeat::run(session.clone(), payload));
        }
    }

    /// Stop the current session and wait for its tasks (idempotent)
    pub async fn stop(&self) {
        let current = self.session.lock().take();
        let Some(session) = current else {
            return;
        };
        // Signal first so a start() blocked in its connect loop returns
        session.shutdown();

        let _lifecycle = self.lifecycle.lock().await;
        self.teardown(session).await;
    }

    /// Join the tasks of a session that was taken out of `self.session`
    async fn teardown(&self, session: Arc<Session>) {
        session.shutdown();
        for task in session.take_tasks() {
            if let Err(e) = task.await {
                warn!("Bridge task failed: {}", e);
            }
        }

        session.log(format!(
            "Relayed {} bytes to serial, {} bytes to TCP, {} heartbeats",
            session.stats.tx_bytes(),
            session.stats.rx_bytes(),
            session.stats.heartbeats()
        ));
        // A replacing session owns the state from here on
        if self.session.lock().is_none() {
            session.set_state(State::Stopped);
        }
        session.notify_stopped();
    }

    /// Render relayed bytes as hex (takes effect when printing is on)
    pub fn update_hex_logging(&self, enabled: bool) {
        debug!("hex logging: {}", enabled);
        if let Some(session) = self.session.lock().as_ref() {
            session.settings.set_hex_log(enabled);
        }
    }

    /// Log relayed bytes
    pub fn update_print_logging(&self, enabled: bool) {
        debug!("print logging: {}", enabled);
        if let Some(session) = self.session.lock().as_ref() {
            session.settings.set_print_log(enabled);
        }
    }

    /// Reconnect lost transports instead of stopping the session
    pub fn update_auto_reconnect(&self, enabled: bool) {
        debug!("auto reconnect: {}", enabled);
        if let Some(session) = self.session.lock().as_ref() {
            session.settings.set_auto_reconnect(enabled);
        }
    }

    /// Get current state
    pub fn state(&self) -> State {
        *self.state.read()
    }

    /// Traffic statistics of the current session
    pub fn stats(&self) -> Option<Arc<Stats>> {
        self.session.lock().as_ref().map(|s| s.stats.clone())
    }

    /// True while the current session holds an open serial handle
    pub fn serial_connected(&self) -> bool {
        self.side_open(Side::Serial)
    }

    /// True while the current session holds an open TCP handle
    pub fn tcp_connected(&self) -> bool {
        self.side_open(Side::Tcp)
    }

    fn side_open(&self, side: Side) -> bool {
        self.session
            .lock()
            .as_ref()
            .map(|s| s.slot(side).is_open())
            .unwrap_or(false)
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.shutdown();
        }
    }
}

/// Create a bridge over real transports and start a session
pub async fn start_session(
    config: BridgeConfig,
    sink: Arc<dyn LogSink>,
    observer: Option<Arc<dyn StopObserver>>,
) -> Bridge {
    let bridge = Bridge::new(sink, observer);
    bridge.start(config).await;
    bridge
}

//! Serial-to-TCP bridge
//!
//! Relays bytes unmodified between one serial device and one TCP server,
//! with optional auto-reconnect and heartbeat.
//!
//! ```ignore
//! let bridge = Bridge::new(Arc::new(ConsoleSink), None);
//! bridge.start(config).await;
//! // ...
//! bridge.stop().await;
//! ```

pub mod bridge;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod transport;

pub use bridge::{start_session, Bridge, State};
pub use config::{BridgeConfig, HeartbeatConfig, LogMode};
pub use error::{BridgeError, Result};
pub use logging::{LogSink, StopObserver};

//! Forwarding engine
//!
//! Two pumps run per session, one per direction. Each reads its source
//! handle with a bounded timeout and writes every chunk unmodified to the
//! target handle. A pump only ever reconnects its own source side; a dead
//! target is closed so the opposite pump notices and reconnects it.

use super::session::{Session, Side};
use super::supervisor;
use crate::constants::READ_TIMEOUT;
use crate::error::BridgeError;
use crate::logging::Tag;
use bytes::Bytes;
use std::fmt;
use std::io;
use std::sync::Arc;
use tracing::debug;

/// Relay direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    TcpToSerial,
    SerialToTcp,
}

impl Direction {
    fn source(self) -> Side {
        match self {
            Self::TcpToSerial => Side::Tcp,
            Self::SerialToTcp => Side::Serial,
        }
    }

    fn target(self) -> Side {
        match self {
            Self::TcpToSerial => Side::Serial,
            Self::SerialToTcp => Side::Tcp,
        }
    }

    fn tag(self) -> Tag {
        match self {
            Self::TcpToSerial => Tag::TcpToSerial,
            Self::SerialToTcp => Tag::SerialToTcp,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TcpToSerial => f.write_str("tcp_to_serial"),
            Self::SerialToTcp => f.write_str("serial_to_tcp"),
        }
    }
}

/// Run one pump until the session stops
pub(crate) async fn run(session: Arc<Session>, direction: Direction) {
    let source = direction.source();

    while session.is_running() {
        let Some(link) = session.slot(source).current() else {
            session.log(format!("{} not connected", source));
            if !recover(&session, source).await {
                break;
            }
            continue;
        };

        let read = tokio::select! {
            biased;
            _ = session.cancelled() => break,
            read = tokio::time::timeout(READ_TIMEOUT, link.recv()) => read,
        };

        match read {
            // Timeout: check the running flag and read again
            Err(_) => continue,
            Ok(Ok(data)) => {
                if data.is_empty() {
                    continue;
                }
                if !forward(&session, direction, data).await {
                    break;
                }
            }
            Ok(Err(e)) => {
                if !session.is_running() {
                    break;
                }
                session.log(io_error(source, link.label(), e).to_string());
                drop(link);
                if !recover(&session, source).await {
                    break;
                }
            }
        }
    }

    session.log(format!("stop {}", direction));
}

/// Write one chunk to the target side
///
/// Returns false when the pump must exit.
async fn forward(session: &Session, direction: Direction, data: Bytes) -> bool {
    let target = direction.target();

    // Absent while a reconnect is in flight: drop silently
    let Some(out) = session.slot(target).current() else {
        debug!("{}: {} not connected, dropped {} bytes", direction, target, data.len());
        return true;
    };

    let result = tokio::select! {
        biased;
        _ = session.cancelled() => return false,
        result = out.send(data.clone()) => result,
    };

    match result {
        Ok(()) => {
            match direction {
                Direction::TcpToSerial => session.stats.add_tx(data.len()),
                Direction::SerialToTcp => session.stats.add_rx(data.len()),
            }
            session.log_traffic(direction.tag(), &data);
            true
        }
        Err(e) => {
            if !session.is_running() {
                return false;
            }
            session.log(io_error(target, out.label(), e).to_string());
            if session.settings.auto_reconnect() {
                // The pump reading `target` sees the closed link and reconnects it
                session.slot(target).close_if(&out);
                true
            } else {
                session.terminate();
                false
            }
        }
    }
}

/// Reconnect `side`, or end the session when auto-reconnect is off
async fn recover(session: &Session, side: Side) -> bool {
    if session.settings.auto_reconnect() {
        supervisor::reconnect(session, side).await
    } else {
        session.terminate();
        false
    }
}

fn io_error(side: Side, label: &str, source: io::Error) -> BridgeError {
    match side {
        Side::Serial => BridgeError::SerialIo {
            port: label.to_string(),
            source,
        },
        Side::Tcp => BridgeError::TcpIo {
            addr: label.to_string(),
            source,
        },
    }
}

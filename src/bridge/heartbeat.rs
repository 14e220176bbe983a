//! Heartbeat emitter
//!
//! Writes a fixed payload to the TCP side, either once right after the
//! session connects (`interval_secs == 0`) or every `interval_secs` until
//! the session stops. Send failures are logged and never end the session.

use super::session::{Session, Side};
use crate::error::BridgeError;
use crate::logging::Tag;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

/// Decoded heartbeat payload, or `None` when the heartbeat stays off
///
/// A payload that fails to decode disables the heartbeat for this session.
pub(crate) fn payload(session: &Session) -> Option<Bytes> {
    match session.config.heartbeat.decode_payload() {
        Ok(payload) => payload.map(Bytes::from),
        Err(e) => {
            session.log(format!("{}, heartbeat disabled", e));
            None
        }
    }
}

/// Run the heartbeat until the session stops
pub(crate) async fn run(session: Arc<Session>, payload: Bytes) {
    let interval = session.config.heartbeat.interval_secs;

    if interval == 0 {
        send(&session, &payload).await;
        return;
    }

    let period = Duration::from_secs(interval);
    while session.is_running() {
        send(&session, &payload).await;
        if !session.sleep(period).await {
            break;
        }
    }
}

async fn send(session: &Session, payload: &Bytes) {
    let Some(link) = session.slot(Side::Tcp).current() else {
        session.log("Heartbeat skipped: TCP not connected");
        return;
    };

    let result = tokio::select! {
        biased;
        _ = session.cancelled() => return,
        result = link.send(payload.clone()) => result,
    };

    match result {
        Ok(()) => {
            session.stats.add_heartbeat();
            session.log_traffic(Tag::Heartbeat, payload);
        }
        Err(e) => {
            let err = BridgeError::TcpIo {
                addr: link.label().to_string(),
                source: e,
            };
            session.log(format!("Heartbeat send failed: {}", err));
        }
    }
}

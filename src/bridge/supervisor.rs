//! Connection supervisor
//!
//! Opens (and reopens) the serial and TCP handles of a session. It is the
//! only code that stores links into the session's slots. Reconnecting one
//! side never touches the other.

use super::session::{Session, Side};
use crate::constants::RECONNECT_DELAY;

/// Open `side`, retrying every `RECONNECT_DELAY` while auto-reconnect is on
///
/// Returns true once a link is installed. Returns false if the attempt
/// failed with auto-reconnect off, or if the session was stopped.
pub(crate) async fn connect(session: &Session, side: Side) -> bool {
    let mut attempt = 0u32;

    while session.is_running() {
        attempt += 1;
        let target = match side {
            Side::Serial => format!(
                "{} @ {} baud",
                session.config.serial_port, session.config.baud_rate
            ),
            Side::Tcp => session.config.server_addr(),
        };
        session.log(format!("Connecting {} {} (attempt {})", side, target, attempt));

        let open = async {
            match side {
                Side::Serial => session.connector.open_serial(&session.config).await,
                Side::Tcp => session.connector.open_tcp(&session.config).await,
            }
        };
        let result = tokio::select! {
            biased;
            _ = session.cancelled() => return false,
            result = open => result,
        };

        match result {
            Ok(link) => {
                let label = link.label().to_string();
                if !session.slot(side).install(link, session.running_flag()) {
                    return false;
                }
                session.log(format!("Connected {} {}", side, label));
                return true;
            }
            Err(e) => {
                session.log(e.to_string());
                if !session.settings.auto_reconnect() {
                    return false;
                }
                session.log(format!(
                    "Retrying {} in {}s",
                    side,
                    RECONNECT_DELAY.as_secs()
                ));
                if !session.sleep(RECONNECT_DELAY).await {
                    return false;
                }
            }
        }
    }

    false
}

/// Drop the current handle of `side` and open a new one
pub(crate) async fn reconnect(session: &Session, side: Side) -> bool {
    session.slot(side).close();
    if !session.is_running() {
        return false;
    }
    session.log(format!("Reconnecting {}", side));
    connect(session, side).await
}

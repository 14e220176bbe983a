//! Centralized error types for the bridge
//!
//! All bridge errors are represented by the `BridgeError` enum.
//! Use `Result<T>` as shorthand for `std::result::Result<T, BridgeError>`.

use std::fmt;
use std::path::PathBuf;

/// All bridge errors
#[derive(Debug)]
pub enum BridgeError {
    // === Serial ===
    /// Failed to open serial port
    SerialOpen {
        port: String,
        source: std::io::Error,
    },
    /// Read or write on an open serial port failed
    SerialIo {
        port: String,
        source: std::io::Error,
    },

    // === Network ===
    /// Failed to connect to the TCP server
    TcpConnect {
        addr: String,
        source: std::io::Error,
    },
    /// Read or write on an established TCP connection failed
    TcpIo {
        addr: String,
        source: std::io::Error,
    },

    // === Heartbeat ===
    /// Heartbeat payload could not be decoded
    HeartbeatPayload { reason: String },

    // === Config ===
    /// Config file could not be read or written
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Invalid config value
    ConfigValidation { field: &'static str, reason: String },
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SerialOpen { source, .. }
            | Self::SerialIo { source, .. }
            | Self::TcpConnect { source, .. }
            | Self::TcpIo { source, .. }
            | Self::ConfigRead { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SerialOpen { port, source } => {
                write!(f, "Failed to open serial port {}: {}", port, source)
            }
            Self::SerialIo { port, source } => write!(f, "Serial error on {}: {}", port, source),
            Self::TcpConnect { addr, source } => {
                write!(f, "Could not connect to TCP server {}: {}", addr, source)
            }
            Self::TcpIo { addr, source } => write!(f, "TCP error on {}: {}", addr, source),
            Self::HeartbeatPayload { reason } => write!(f, "Invalid heartbeat payload: {}", reason),
            Self::ConfigRead { path, source } => {
                write!(f, "Config file {}: {}", path.display(), source)
            }
            Self::ConfigValidation { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
        }
    }
}

/// Alias for Result with BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    #[test]
    fn test_display_includes_endpoint_and_cause() {
        let err = BridgeError::TcpConnect {
            addr: "10.0.0.1:9999".into(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert_eq!(
            err.to_string(),
            "Could not connect to TCP server 10.0.0.1:9999: refused"
        );
    }

    #[test]
    fn test_source_chain() {
        let err = BridgeError::SerialOpen {
            port: "COM3".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such device"),
        };
        assert!(err.source().is_some());

        let err = BridgeError::HeartbeatPayload {
            reason: "odd length".into(),
        };
        assert!(err.source().is_none());
        assert_eq!(err.to_string(), "Invalid heartbeat payload: odd length");
    }
}

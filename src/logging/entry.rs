//! Traffic log events
//!
//! Line formats are consumed by existing tooling and must not change:
//! - text: `{tag}:{bytes as text}`
//! - hex:  `{tag}: {lowercase hex, no separators}`

use crate::config::LogMode;
use std::fmt;

/// Origin of a logged chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// TCP -> Serial
    TcpToSerial,
    /// Serial -> TCP
    SerialToTcp,
    /// Heartbeat sent to TCP
    Heartbeat,
}

impl Tag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TcpToSerial => ">>>",
            Self::SerialToTcp => "<<<",
            Self::Heartbeat => "Heartbeat >>>",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One chunk of relayed bytes, borrowed for rendering
#[derive(Debug, Clone, Copy)]
pub struct LogEvent<'a> {
    pub tag: Tag,
    pub data: &'a [u8],
}

impl<'a> LogEvent<'a> {
    pub fn new(tag: Tag, data: &'a [u8]) -> Self {
        Self { tag, data }
    }

    /// Render the log line, or `None` when traffic logging is off
    pub fn render(&self, mode: LogMode) -> Option<String> {
        match mode {
            LogMode::Off => None,
            LogMode::Text => Some(format!(
                "{}:{}",
                self.tag,
                String::from_utf8_lossy(self.data)
            )),
            LogMode::Hex => Some(format!("{}: {}", self.tag, hex::encode(self.data))),
        }
    }
}

//! Application-wide constants
//!
//! Centralized constants to avoid duplication and ensure consistency.

use std::time::Duration;

// =============================================================================
// Network
// =============================================================================

/// Default TCP server address
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default TCP server port
pub const DEFAULT_SERVER_PORT: u16 = 9999;

/// Maximum time a single TCP connect attempt may take
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Serial
// =============================================================================

/// Default serial device
#[cfg(windows)]
pub const DEFAULT_SERIAL_PORT: &str = "COM1";

/// Default serial device
#[cfg(not(windows))]
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyUSB0";

/// Default baud rate
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Port-level read timeout used by the serial reader thread
///
/// Kept short so the thread notices a closed link quickly.
pub const SERIAL_POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Consecutive zero-byte reads before assuming port disconnected
pub const SERIAL_DISCONNECT_THRESHOLD: u32 = 10;

// =============================================================================
// Timing - Session
// =============================================================================

/// Bounded wait of each pump read, so stop requests are observed promptly
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Fixed delay between reconnection attempts
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Upper bound for the heartbeat interval (seconds)
pub const MAX_HEARTBEAT_INTERVAL_SECS: u64 = 3600;

// =============================================================================
// Buffers
// =============================================================================

/// Transport read buffer size
pub const READ_BUFFER_SIZE: usize = 4096;

/// Channel capacity between a link and its background I/O
pub const CHANNEL_CAPACITY: usize = 256;

//! Serial transport
//!
//! Uses blocking threads for low-latency I/O:
//! - Reader thread: reads from serial port, sends to the link
//! - Writer thread: receives from the link, writes to serial port
//!
//! The transport stops when:
//! - the link is closed or dropped
//! - Serial port disconnects (read error or repeated zero-byte reads)
//! - Write error occurs

use super::{Link, LinkIo};
use crate::constants::{READ_BUFFER_SIZE, SERIAL_DISCONNECT_THRESHOLD, SERIAL_POLL_TIMEOUT};
use crate::error::{BridgeError, Result};
use bytes::Bytes;
use serialport::SerialPort;
use std::io::{Read, Write};
use tracing::{debug, warn};

/// Serial transport for one device
///
/// # Example
///
/// ```ignore
/// let link = SerialTransport::new("/dev/ttyUSB0", 115200).spawn()?;
/// let chunk = link.recv().await?;
/// ```
pub struct SerialTransport {
    port_name: String,
    baud_rate: u32,
}

impl SerialTransport {
    /// Create a new serial transport for the specified port
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
        }
    }

    /// Open the serial port with a short read timeout
    pub fn open(&self) -> Result<Box<dyn SerialPort>> {
        serialport::new(&self.port_name, self.baud_rate)
            .timeout(SERIAL_POLL_TIMEOUT)
            .open()
            .map_err(|e| BridgeError::SerialOpen {
                port: self.port_name.clone(),
                source: std::io::Error::from(e),
            })
    }

    /// Open the port and start the reader/writer threads
    pub fn spawn(self) -> Result<Link> {
        let port_read = self.open()?;
        let port_write = port_read.try_clone().map_err(|e| BridgeError::SerialOpen {
            port: self.port_name.clone(),
            source: std::io::Error::from(e),
        })?;

        let (link, io) = Link::pair(self.port_name.clone());
        let LinkIo {
            incoming,
            mut outgoing,
            closed,
        } = io;

        // Reader thread (blocking)
        let closed_reader = closed.clone();
        let name = self.port_name.clone();
        std::thread::spawn(move || {
            let mut port = port_read;
            let mut buf = [0u8; READ_BUFFER_SIZE];
            let mut zero_reads = 0u32;

            while !*closed_reader.borrow() {
                match port.read(&mut buf) {
                    Ok(n) if n > 0 => {
                        zero_reads = 0;
                        if incoming
                            .blocking_send(Bytes::copy_from_slice(&buf[..n]))
                            .is_err()
                        {
                            // Link dropped
                            break;
                        }
                    }
                    Ok(_) => {
                        zero_reads += 1;
                        if zero_reads > SERIAL_DISCONNECT_THRESHOLD {
                            warn!("{}: repeated empty reads, assuming disconnected", name);
                            break;
                        }
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {
                        zero_reads = 0;
                    }
                    Err(e) => {
                        debug!("{}: read failed: {}", name, e);
                        break;
                    }
                }
            }
            // Dropping `incoming` makes the next Link::recv fail
        });

        // Writer thread (blocking)
        let name = self.port_name;
        std::thread::spawn(move || {
            let mut port = port_write;

            while let Some(data) = outgoing.blocking_recv() {
                if *closed.borrow() {
                    break;
                }
                if let Err(e) = port.write_all(&data).and_then(|_| port.flush()) {
                    debug!("{}: write failed: {}", name, e);
                    break;
                }
            }
        });

        Ok(link)
    }
}

/// Names of the serial ports present on this machine
pub fn available_ports() -> Vec<String> {
    serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(|p| p.port_name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_transport_new() {
        let transport = SerialTransport::new("COM3", 9600);
        assert_eq!(transport.port_name, "COM3");
        assert_eq!(transport.baud_rate, 9600);
    }

    #[test]
    fn test_open_missing_port_fails() {
        let transport = SerialTransport::new("/dev/does-not-exist-bridge-test", 9600);
        match transport.spawn() {
            Err(BridgeError::SerialOpen { port, .. }) => {
                assert_eq!(port, "/dev/does-not-exist-bridge-test")
            }
            other => panic!("Expected SerialOpen error, got {:?}", other.map(|_| ())),
        }
    }
}

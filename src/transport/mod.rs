//! Transport handles for byte-level I/O
//!
//! A `Link` is one open transport connection (serial port or TCP stream).
//! Each transport manages its own execution model internally:
//! - Serial: blocking threads (reader with short port timeout, writer)
//! - TCP: async tokio tasks over the split stream
//!
//! The bridge only ever sees a `Link`: it reads chunks, queues writes and
//! closes it. A `Link` does NOT handle reconnection (that's the supervisor's
//! job) or logging of traffic (that's the pumps' job).

pub mod serial;
pub mod tcp;

pub use serial::SerialTransport;
pub use tcp::TcpTransport;

use crate::config::BridgeConfig;
use crate::constants::CHANNEL_CAPACITY;
use crate::error::Result;
use bytes::Bytes;
use std::future::Future;
use std::io;
use std::pin::Pin;
use tokio::sync::{mpsc, watch, Mutex};

/// One open transport connection
///
/// Writes go through a single queue drained by one writer, so concurrent
/// senders (pump and heartbeat) never interleave within a chunk.
pub struct Link {
    label: String,
    rx: Mutex<mpsc::Receiver<Bytes>>,
    tx: mpsc::Sender<Bytes>,
    closed: watch::Sender<bool>,
}

/// Background side of a `Link`, driven by the transport implementation
pub struct LinkIo {
    /// Bytes read from the device/socket, delivered to `Link::recv`
    pub incoming: mpsc::Sender<Bytes>,
    /// Bytes queued by `Link::send`, to be written to the device/socket
    pub outgoing: mpsc::Receiver<Bytes>,
    /// Flips to `true` when the link is closed
    pub closed: watch::Receiver<bool>,
}

impl Link {
    /// Create a link and the I/O endpoints that feed it
    pub fn pair(label: impl Into<String>) -> (Link, LinkIo) {
        let (in_tx, in_rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);
        let (out_tx, out_rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);
        let (closed_tx, closed_rx) = watch::channel(false);

        let link = Link {
            label: label.into(),
            rx: Mutex::new(in_rx),
            tx: out_tx,
            closed: closed_tx,
        };
        let io = LinkIo {
            incoming: in_tx,
            outgoing: out_rx,
            closed: closed_rx,
        };
        (link, io)
    }

    /// Port name or `host:port`
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Receive the next chunk
    ///
    /// Fails once the link is closed locally or the peer went away.
    pub async fn recv(&self) -> io::Result<Bytes> {
        if self.is_closed() {
            return Err(closed_error());
        }
        let mut rx = self.rx.lock().await;
        tokio::select! {
            biased;
            _ = wait_closed(self.closed.subscribe()) => Err(closed_error()),
            msg = rx.recv() => msg.ok_or_else(|| {
                io::Error::new(io::ErrorKind::UnexpectedEof, "connection lost")
            }),
        }
    }

    /// Queue bytes for writing
    pub async fn send(&self, data: Bytes) -> io::Result<()> {
        if self.is_closed() {
            return Err(closed_error());
        }
        self.tx
            .send(data)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "writer stopped"))
    }

    /// Close the link (idempotent)
    ///
    /// Wakes any pending `recv` and stops the background I/O.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("label", &self.label)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl LinkIo {
    /// True once the owning `Link` was closed or dropped
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow() || self.closed.has_changed().is_err()
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "link closed")
}

/// Resolve once the watched flag is `true` (or its sender is gone)
pub async fn wait_closed(mut flag: watch::Receiver<bool>) {
    while !*flag.borrow_and_update() {
        if flag.changed().await.is_err() {
            return;
        }
    }
}

// =============================================================================
// Connector
// =============================================================================

/// Future returned by `Connector` methods
pub type OpenFuture<'a> = Pin<Box<dyn Future<Output = Result<Link>> + Send + 'a>>;

/// Opens transport links for a session
///
/// `SystemConnector` opens real devices; tests substitute their own.
pub trait Connector: Send + Sync + 'static {
    /// Open the serial device named in `config`
    fn open_serial<'a>(&'a self, config: &'a BridgeConfig) -> OpenFuture<'a>;

    /// Connect to the TCP server named in `config`
    fn open_tcp<'a>(&'a self, config: &'a BridgeConfig) -> OpenFuture<'a>;
}

/// Real serial ports and TCP sockets
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConnector;

impl Connector for SystemConnector {
    fn open_serial<'a>(&'a self, config: &'a BridgeConfig) -> OpenFuture<'a> {
        Box::pin(async move { SerialTransport::new(&config.serial_port, config.baud_rate).spawn() })
    }

    fn open_tcp<'a>(&'a self, config: &'a BridgeConfig) -> OpenFuture<'a> {
        Box::pin(async move {
            TcpTransport::new(&config.server_host, config.server_port)
                .connect()
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_link_recv_and_send() {
        let (link, mut io) = Link::pair("test");

        io.incoming.send(Bytes::from_static(b"in")).await.unwrap();
        assert_eq!(link.recv().await.unwrap().as_ref(), b"in");

        link.send(Bytes::from_static(b"out")).await.unwrap();
        assert_eq!(io.outgoing.recv().await.unwrap().as_ref(), b"out");
    }

    #[tokio::test]
    async fn test_close_wakes_pending_recv() {
        let (link, io) = Link::pair("test");
        let link = std::sync::Arc::new(link);

        let reader = link.clone();
        let pending = tokio::spawn(async move { reader.recv().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        link.close();

        let result = tokio::time::timeout(Duration::from_millis(500), pending)
            .await
            .expect("recv did not wake")
            .unwrap();
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotConnected);
        assert!(io.is_closed());
    }

    #[tokio::test]
    async fn test_peer_gone_is_error() {
        let (link, io) = Link::pair("test");
        drop(io);

        assert_eq!(
            link.recv().await.unwrap_err().kind(),
            io::ErrorKind::UnexpectedEof
        );
        assert!(link.send(Bytes::from_static(b"x")).await.is_err());
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (link, _io) = Link::pair("test");
        link.close();
        link.close();
        assert!(link.is_closed());
        assert!(link.send(Bytes::from_static(b"x")).await.is_err());
    }

    #[tokio::test]
    async fn test_drop_closes_io_side() {
        let (link, io) = Link::pair("test");
        assert!(!io.is_closed());
        drop(link);
        assert!(io.is_closed());
        wait_closed(io.closed.clone()).await;
    }
}

//! TCP client transport
//!
//! Connects to the configured server and runs two async tokio tasks:
//! - RX task: reads from the socket, sends to the link
//! - TX task: receives from the link, writes to the socket
//!
//! Both tasks stop when the link is closed. A zero-byte read (peer closed
//! the connection) or a socket error ends the RX task, which the bridge
//! sees as a failed `Link::recv`.

use super::{wait_closed, Link, LinkIo};
use crate::constants::{CONNECT_TIMEOUT, READ_BUFFER_SIZE};
use crate::error::{BridgeError, Result};
use bytes::Bytes;
use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// TCP client transport
pub struct TcpTransport {
    host: String,
    port: u16,
}

impl TcpTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Server address as `host:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connect (bounded by `CONNECT_TIMEOUT`) and start the I/O tasks
    pub async fn connect(&self) -> Result<Link> {
        let addr = self.addr();
        let stream = tokio::time::timeout(
            CONNECT_TIMEOUT,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        .map_err(|_| BridgeError::TcpConnect {
            addr: addr.clone(),
            source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
        })?
        .map_err(|e| BridgeError::TcpConnect {
            addr: addr.clone(),
            source: e,
        })?;

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY on {}: {}", addr, e);
        }

        Ok(Self::spawn_stream(stream, addr))
    }

    /// Wrap an established stream into a link
    pub fn spawn_stream(stream: TcpStream, label: impl Into<String>) -> Link {
        let label = label.into();
        let (link, io) = Link::pair(label.clone());
        let LinkIo {
            incoming,
            mut outgoing,
            closed,
        } = io;
        let (mut reader, mut writer) = stream.into_split();

        // RX task
        let closed_rx = closed.clone();
        let name = label.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; READ_BUFFER_SIZE];
            loop {
                tokio::select! {
                    biased;
                    _ = wait_closed(closed_rx.clone()) => break,
                    result = reader.read(&mut buf) => match result {
                        Ok(0) => {
                            debug!("{}: connection closed by peer", name);
                            break;
                        }
                        Ok(n) => {
                            if incoming.send(Bytes::copy_from_slice(&buf[..n])).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            debug!("{}: read failed: {}", name, e);
                            break;
                        }
                    },
                }
            }
        });

        // TX task
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = wait_closed(closed.clone()) => break,
                    msg = outgoing.recv() => match msg {
                        Some(data) => {
                            if let Err(e) = writer.write_all(&data).await {
                                debug!("{}: write failed: {}", label, e);
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
            let _ = writer.shutdown().await;
        });

        link
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_link_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let link = TcpTransport::new("127.0.0.1", port).connect().await.unwrap();
        let (mut server, _) = listener.accept().await.unwrap();

        link.send(Bytes::from_static(b"\x00\x01hello")).await.unwrap();
        let mut buf = [0u8; 7];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"\x00\x01hello");

        server.write_all(b"reply").await.unwrap();
        let chunk = tokio::time::timeout(Duration::from_secs(1), link.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(chunk.as_ref(), b"reply");
    }

    #[tokio::test]
    async fn test_peer_close_fails_recv() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let link = TcpTransport::new("127.0.0.1", port).connect().await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        drop(server);

        let result = tokio::time::timeout(Duration::from_secs(1), link.recv())
            .await
            .unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_local_close_shuts_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let link = TcpTransport::new("127.0.0.1", port).connect().await.unwrap();
        let (mut server, _) = listener.accept().await.unwrap();

        link.close();
        let mut buf = [0u8; 8];
        let n = tokio::time::timeout(Duration::from_secs(1), server.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        match TcpTransport::new("127.0.0.1", port).connect().await {
            Err(BridgeError::TcpConnect { addr, .. }) => {
                assert_eq!(addr, format!("127.0.0.1:{}", port))
            }
            other => panic!("Expected TcpConnect error, got {:?}", other),
        }
    }
}

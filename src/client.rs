//! One-shot TCP echo client.
//!
//! Connects, sends a single message, reads a single reply, and closes.
//! There is no read loop and no framing: a reply split across packets
//! yields only the first chunk, up to [`CHUNK_SIZE`] bytes.

use crate::server::CHUNK_SIZE;
use bytes::BytesMut;
use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{error, info};

/// Client instance
pub struct Client {
    host: String,
    port: u16,
    stream: Option<TcpStream>,
}

impl Client {
    /// Create a client for the given endpoint (not yet connected)
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Client {
            host: host.into(),
            port,
            stream: None,
        }
    }

    /// Establish the connection.
    ///
    /// Failure is logged and returned, not fatal: callers decide what
    /// to do with an unconnected client.
    pub async fn connect(&mut self) -> io::Result<()> {
        match TcpStream::connect((self.host.as_str(), self.port)).await {
            Ok(stream) => {
                info!(host = %self.host, port = self.port, "Connected to server");
                self.stream = Some(stream);
                Ok(())
            }
            Err(e) => {
                error!(host = %self.host, port = self.port, error = %e, "Connection failed");
                Err(e)
            }
        }
    }

    /// Send the message and read exactly one reply chunk.
    ///
    /// The text is written in one call, then a single read of up to
    /// [`CHUNK_SIZE`] bytes is decoded as UTF-8. Longer replies are
    /// truncated to the first chunk.
    pub async fn send_message(&mut self, message: &str) -> io::Result<String> {
        let stream = self.stream.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "client is not connected")
        })?;

        let result: io::Result<String> = async {
            stream.write_all(message.as_bytes()).await?;

            let mut buffer = BytesMut::with_capacity(CHUNK_SIZE);
            let n = stream.read_buf(&mut buffer).await?;

            let reply = std::str::from_utf8(&buffer[..n])
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            Ok(reply.to_string())
        }
        .await;

        match result {
            Ok(reply) => {
                info!(reply = %reply, "Received from server");
                Ok(reply)
            }
            Err(e) => {
                error!(error = %e, "Communication error");
                Err(e)
            }
        }
    }

    /// Close the socket if open.
    ///
    /// Safe to call when connect was never attempted or already
    /// failed; closing twice is a no-op.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
            info!("Connection closed");
        }
    }

    /// One full cycle: connect, send, always close.
    ///
    /// Returns the echoed reply, or `None` if connect or the exchange
    /// failed. The close runs regardless of the send outcome.
    pub async fn run(&mut self, message: &str) -> Option<String> {
        let reply = match self.connect().await {
            Ok(()) => self.send_message(message).await.ok(),
            Err(_) => None,
        };
        self.close().await;
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Mode};
    use crate::server::{serve, Server};
    use std::net::SocketAddr;

    async fn spawn_server() -> SocketAddr {
        let server = Server::new(Config {
            mode: Mode::Serve,
            host: "127.0.0.1".to_string(),
            port: 0,
            backlog: 5,
            message: "Hello, server!".to_string(),
            log_level: "info".to_string(),
        });
        let listener = server.setup().unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener));
        addr
    }

    /// Reserve a port with no listener on it.
    async fn dead_port() -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    #[tokio::test]
    async fn test_round_trip() {
        let addr = spawn_server().await;

        let mut client = Client::new("127.0.0.1", addr.port());
        let reply = client.run("Hello, server!").await;
        assert_eq!(reply.as_deref(), Some("Hello, server!"));
    }

    #[tokio::test]
    async fn test_connect_failure_is_not_fatal() {
        let port = dead_port().await;

        let mut client = Client::new("127.0.0.1", port);
        let reply = client.run("Hello, server!").await;
        assert_eq!(reply, None);
    }

    #[tokio::test]
    async fn test_send_without_connect() {
        let mut client = Client::new("127.0.0.1", 1);
        let err = client.send_message("hi").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let addr = spawn_server().await;

        // Never connected
        let mut client = Client::new("127.0.0.1", addr.port());
        client.close().await;

        // Connected, then closed twice
        client.connect().await.unwrap();
        client.close().await;
        client.close().await;
        assert!(client.stream.is_none());
    }

    #[tokio::test]
    async fn test_sequential_runs() {
        let addr = spawn_server().await;

        for msg in ["one", "two"] {
            let mut client = Client::new("127.0.0.1", addr.port());
            let reply = client.run(msg).await;
            assert_eq!(reply.as_deref(), Some(msg));
        }
    }
}

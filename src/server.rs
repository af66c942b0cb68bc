//! TCP echo server.
//!
//! Accepts connections one at a time and echoes bytes back verbatim
//! until the peer closes or a transport error occurs. The accept loop
//! is strictly sequential: a connection is served to completion before
//! the next accept, so a second client waits in the listen backlog.

use crate::config::Config;
use bytes::BytesMut;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

/// Fixed per-read chunk size
pub const CHUNK_SIZE: usize = 1024;

/// Server instance
pub struct Server {
    config: Config,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: Config) -> Self {
        Server { config }
    }

    /// Bind and listen on the configured address.
    ///
    /// Sets `SO_REUSEADDR` before binding so a restart after a clean
    /// shutdown can rebind the same port, and applies the configured
    /// listen backlog. Any failure here is fatal to the caller.
    pub fn setup(&self) -> io::Result<TcpListener> {
        let addr: SocketAddr = self
            .config
            .address()
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("address '{}' did not resolve", self.config.address()),
                )
            })?;

        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        // Tokio requires the socket in non-blocking mode
        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;
        socket.listen(self.config.backlog as i32)?;

        let listener = TcpListener::from_std(socket.into())?;
        info!(
            address = %listener.local_addr()?,
            backlog = self.config.backlog,
            "Server listening"
        );
        Ok(listener)
    }

    /// Start the server: bind once, then accept and serve forever.
    ///
    /// Returns an error only if setup fails; the accept loop itself
    /// runs until an interrupt signal, which closes the listening
    /// socket before returning.
    pub async fn run(&self) -> io::Result<()> {
        let listener = self.setup()?;
        serve(listener).await
    }
}

/// Accept loop: one connection at a time, each served in full.
///
/// An accept error is logged and the loop moves on to the next accept
/// attempt. Ctrl-C exits the loop, including mid-connection, and drops
/// the listening socket.
pub async fn serve(listener: TcpListener) -> io::Result<()> {
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    info!(peer = %peer, "Connection established");
                    tokio::select! {
                        _ = serve_connection(stream, peer) => {}
                        _ = &mut shutdown => {
                            info!("Server shutting down");
                            return Ok(());
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            },
            _ = &mut shutdown => {
                info!("Server shutting down");
                return Ok(());
            }
        }
    }
}

/// Echo loop for a single connection.
///
/// Reads up to [`CHUNK_SIZE`] bytes at a time and writes each chunk
/// back unchanged. An empty read means the peer closed its write side
/// and ends the loop normally; a read or write error ends it
/// abnormally after logging. The stream is dropped (closed) on every
/// exit path.
async fn serve_connection(mut stream: TcpStream, peer: SocketAddr) {
    let mut buffer = BytesMut::with_capacity(CHUNK_SIZE);

    loop {
        buffer.clear();
        let n = match stream.read_buf(&mut buffer).await {
            Ok(0) => {
                debug!(peer = %peer, "Connection closed by peer");
                return;
            }
            Ok(n) => n,
            Err(e) => {
                error!(peer = %peer, error = %e, "Error handling client");
                return;
            }
        };

        info!(
            peer = %peer,
            bytes = n,
            payload = %String::from_utf8_lossy(&buffer[..n]),
            "Received"
        );

        if let Err(e) = stream.write_all(&buffer[..n]).await {
            error!(peer = %peer, error = %e, "Error handling client");
            return;
        }
    }
}

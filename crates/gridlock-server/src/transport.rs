//! TCP transport.
//!
//! Plain TCP listener wrapper. Messages are length-prefixed CBOR frames (see
//! `gridlock_proto::framing`); the transport itself only hands out accepted
//! streams and leaves framing to the session loop.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};

use crate::error::ServerError;

/// TCP transport wrapping a bound listener.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Create and bind a new TCP transport.
    pub async fn bind(address: &str) -> Result<Self, ServerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| ServerError::Config(format!("invalid bind address '{address}': {e}")))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Transport(format!("failed to bind {addr}: {e}")))?;

        tracing::info!("TCP transport bound to {}", addr);

        Ok(Self { listener })
    }

    /// Accept a new TCP connection.
    ///
    /// Blocks until a connection is available.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ServerError> {
        self.listener
            .accept()
            .await
            .map_err(|e| ServerError::Transport(format!("accept failed: {e}")))
    }

    /// Local address the transport is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener
            .local_addr()
            .map_err(|e| ServerError::Transport(format!("failed to get local address: {e}")))
    }
}

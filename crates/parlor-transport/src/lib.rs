//! Transport abstraction and the WebSocket implementation behind it.
//!
//! The server core works against the [`Transport`] and [`Connection`]
//! traits; [`WebSocketTransport`] is the production implementation.
//! Payloads are opaque byte frames — encoding belongs to the protocol
//! crate.

#![allow(async_fn_in_trait)]

mod error;
mod websocket;

use std::fmt;
use std::net::SocketAddr;

pub use error::TransportError;
pub use websocket::{WebSocketConnection, WebSocketTransport};

/// Transport-level connection identifier, distinct from any game
/// identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// Accepts inbound connections.
pub trait Transport {
    type Conn: Connection;

    /// Waits for and returns the next connection.
    async fn accept(&mut self) -> Result<Self::Conn, TransportError>;

    /// The address the transport is listening on.
    fn local_addr(&self) -> SocketAddr;
}

/// A bidirectional frame pipe to one client.
pub trait Connection: Send {
    fn id(&self) -> ConnectionId;

    /// The remote peer's address.
    fn peer_addr(&self) -> SocketAddr;

    async fn send(&self, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Waits for the next data frame.
    async fn recv(&self) -> Result<Vec<u8>, TransportError>;

    /// Closes the connection cleanly.
    async fn close(&self) -> Result<(), TransportError>;
}

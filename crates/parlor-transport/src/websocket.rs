//! WebSocket transport on tokio-tungstenite.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use crate::{Connection, ConnectionId, Transport, TransportError};

type Ws = WebSocketStream<TcpStream>;

/// Listens for WebSocket connections on a TCP socket.
pub struct WebSocketTransport {
    listener: TcpListener,
    local_addr: SocketAddr,
    next_id: u64,
}

impl WebSocketTransport {
    /// Binds to `addr`. Use port 0 to let the OS pick (handy in tests).
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| TransportError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        tracing::info!(%local_addr, "websocket transport listening");
        Ok(Self {
            listener,
            local_addr,
            next_id: 1,
        })
    }
}

impl Transport for WebSocketTransport {
    type Conn = WebSocketConnection;

    async fn accept(&mut self) -> Result<WebSocketConnection, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(|e| TransportError::AcceptFailed(e.to_string()))?;
        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| TransportError::AcceptFailed(e.to_string()))?;

        let id = ConnectionId(self.next_id);
        self.next_id += 1;
        tracing::debug!(%id, %peer, "connection accepted");

        let (writer, reader) = ws.split();
        Ok(WebSocketConnection {
            id,
            peer,
            writer: Arc::new(Mutex::new(writer)),
            reader: Arc::new(Mutex::new(reader)),
        })
    }

    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

/// One accepted WebSocket client. Cloning shares the underlying
/// socket, so a writer task and a reader loop can hold it at once.
#[derive(Clone)]
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    writer: Arc<Mutex<SplitSink<Ws, Message>>>,
    reader: Arc<Mutex<SplitStream<Ws>>>,
}

impl WebSocketConnection {
    /// Closes with a policy-violation status, for connections refused
    /// by the throttle.
    pub async fn close_policy(&self, reason: &str) -> Result<(), TransportError> {
        let frame = CloseFrame {
            code: CloseCode::Policy,
            reason: reason.to_string().into(),
        };
        self.writer
            .lock()
            .await
            .send(Message::Close(Some(frame)))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }
}

impl Connection for WebSocketConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    async fn send(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .send(Message::Binary(payload.into()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn recv(&self) -> Result<Vec<u8>, TransportError> {
        let mut reader = self.reader.lock().await;
        loop {
            match reader.next().await {
                Some(Ok(Message::Binary(bytes))) => return Ok(bytes.into()),
                Some(Ok(Message::Text(text))) => return Ok(text.as_bytes().to_vec()),
                // Pings and pongs are handled by tungstenite; skip.
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Ok(Message::Close(_))) | None => return Err(TransportError::ConnectionClosed),
                Some(Err(e)) => return Err(TransportError::ReceiveFailed(e.to_string())),
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .send(Message::Close(None))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }
}

// =========================================================================
// Tests
// =========================================================================

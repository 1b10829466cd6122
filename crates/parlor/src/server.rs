//! Server assembly: accept loop, shared state, graceful shutdown.

use std::sync::Arc;

use parlor_arena::{ArenaConfig, ArenaMatch};
use parlor_protocol::JsonCodec;
use parlor_room::RoomRegistry;
use parlor_session::{Admission, Sessions, Throttle, ThrottleConfig};
use parlor_transport::{Connection, Transport, WebSocketConnection, WebSocketTransport};
use parlor_word::{Dictionary, WordRound};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::ParlorError;
use crate::handler;

/// Default listen address; override with `PARLOR_ADDR`.
pub const DEFAULT_ADDR: &str = "127.0.0.1:8081";

/// Everything the connection handlers share.
pub(crate) struct ServerState {
    pub(crate) sessions: Sessions,
    pub(crate) word_rooms: Mutex<RoomRegistry<WordRound>>,
    pub(crate) arena_rooms: Mutex<RoomRegistry<ArenaMatch>>,
    pub(crate) throttle: Mutex<Throttle>,
    pub(crate) dictionary: Dictionary,
    pub(crate) arena_config: ArenaConfig,
    pub(crate) codec: JsonCodec,
}

/// Builder for [`ParlorServer`].
pub struct ParlorServerBuilder {
    bind_addr: String,
    dictionary: Option<Vec<String>>,
    throttle: ThrottleConfig,
    arena: ArenaConfig,
}

impl Default for ParlorServerBuilder {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_ADDR.to_string(),
            dictionary: None,
            throttle: ThrottleConfig::default(),
            arena: ArenaConfig::default(),
        }
    }
}

impl ParlorServerBuilder {
    /// Listen address; `127.0.0.1:0` asks the OS for a free port.
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Word list for word rooms. Defaults to the built-in list.
    pub fn dictionary(mut self, words: Vec<String>) -> Self {
        self.dictionary = Some(words);
        self
    }

    pub fn throttle(mut self, config: ThrottleConfig) -> Self {
        self.throttle = config;
        self
    }

    pub fn arena(mut self, config: ArenaConfig) -> Self {
        self.arena = config;
        self
    }

    /// Binds the socket and assembles the server.
    pub async fn build(self) -> Result<ParlorServer, ParlorError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let dictionary = match self.dictionary {
            Some(words) => Dictionary::from_words(words),
            None => Dictionary::built_in(),
        };
        Ok(ParlorServer {
            transport,
            state: Arc::new(ServerState {
                sessions: Sessions::new(),
                word_rooms: Mutex::new(RoomRegistry::new()),
                arena_rooms: Mutex::new(RoomRegistry::new()),
                throttle: Mutex::new(Throttle::new(self.throttle)),
                dictionary,
                arena_config: self.arena,
                codec: JsonCodec,
            }),
        })
    }
}

pub struct ParlorServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl ParlorServer {
    pub fn builder() -> ParlorServerBuilder {
        ParlorServerBuilder::default()
    }

    /// The bound listen address.
    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.transport.local_addr()
    }

    /// Accepts connections until ctrl-c, then tears every room down.
    pub async fn run(mut self) -> Result<(), ParlorError> {
        tracing::info!(addr = %self.local_addr(), "parlor server running");

        loop {
            tokio::select! {
                accepted = self.transport.accept() => {
                    let conn = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::warn!(error = %e, "accept failed");
                            continue;
                        }
                    };
                    self.admit(conn).await;
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown signal received");
                    break;
                }
            }
        }

        self.state.word_rooms.lock().await.shutdown_all().await;
        self.state.arena_rooms.lock().await.shutdown_all().await;
        tracing::info!("parlor server stopped");
        Ok(())
    }

    async fn admit(&self, conn: WebSocketConnection) {
        let ip = conn.peer_addr().ip();
        let now = Instant::now();
        let admission = {
            let mut throttle = self.state.throttle.lock().await;
            throttle.prune(now);
            throttle.check(ip, now)
        };
        if let Admission::Banned { .. } = admission {
            tracing::warn!(%ip, "connection refused by throttle");
            tokio::spawn(async move {
                let _ = conn.close_policy("too many connections").await;
            });
            return;
        }
        let state = self.state.clone();
        tokio::spawn(handler::handle_connection(conn, state));
    }
}

//! The set of live rooms for one game mode.
//!
//! A plain owned map from room code to handle — the server holds one
//! registry per mode behind a mutex. No global state: dropping the
//! registry (after [`shutdown_all`](RoomRegistry::shutdown_all))
//! tears every room down, which keeps embedded servers and tests
//! isolated from each other.

use std::collections::HashMap;

use parlor_protocol::{PlayerId, RoomCode};

use crate::actor::{JoinGrant, RoomHandle, RoomInfo, spawn_room};
use crate::core::MemberSender;
use crate::error::RoomError;
use crate::mode::GameMode;

pub struct RoomRegistry<M: GameMode> {
    rooms: HashMap<RoomCode, RoomHandle<M>>,
}

impl<M: GameMode> Default for RoomRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: GameMode> RoomRegistry<M> {
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
        }
    }

    /// A 4-letter code not currently in use. Rejection sampling: with
    /// 456 976 possible codes and a handful live, retries are rare.
    fn generate_code(&self) -> RoomCode {
        use rand::Rng;
        let mut rng = rand::rng();
        loop {
            let letters = std::array::from_fn(|_| rng.random_range(b'A'..=b'Z'));
            let code = RoomCode::from_letters(letters);
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }

    /// Creates a room and joins `host_id` as its first member.
    pub async fn create(
        &mut self,
        config: M::Config,
        host_id: PlayerId,
        username: String,
        sender: MemberSender,
    ) -> Result<(RoomCode, JoinGrant), RoomError> {
        let code = self.generate_code();
        let handle = spawn_room::<M>(code, config);
        let grant = handle.join(host_id, username, sender, None).await?;
        self.rooms.insert(code, handle);
        tracing::info!(room_id = %code, kind = M::KIND, rooms = self.rooms.len(), "room registered");
        Ok((code, grant))
    }

    pub async fn join(
        &mut self,
        code: RoomCode,
        id: PlayerId,
        username: String,
        sender: MemberSender,
        token: Option<String>,
    ) -> Result<JoinGrant, RoomError> {
        let handle = self.rooms.get(&code).ok_or(RoomError::NotFound(code))?;
        match handle.join(id, username, sender, token).await {
            // The actor exited between lookup and send; drop the stale
            // entry and report the room gone.
            Err(RoomError::Unavailable(_)) => {
                self.rooms.remove(&code);
                Err(RoomError::NotFound(code))
            }
            other => other,
        }
    }

    /// Removes the member; an emptied room is shut down and forgotten.
    pub async fn leave(&mut self, code: RoomCode, id: PlayerId) {
        let Some(handle) = self.rooms.get(&code) else {
            return;
        };
        match handle.leave(id).await {
            Ok(0) | Err(_) => {
                if let Some(handle) = self.rooms.remove(&code) {
                    handle.shutdown().await;
                }
                tracing::info!(room_id = %code, rooms = self.rooms.len(), "room unregistered");
            }
            Ok(_) => {}
        }
    }

    /// Reports a dead connection. Unlike [`leave`](Self::leave), a
    /// member mid-round keeps their slot for reconnection; the room is
    /// only destroyed if it is actually empty afterwards.
    pub async fn disconnect(&mut self, code: RoomCode, id: PlayerId) {
        let Some(handle) = self.rooms.get(&code) else {
            return;
        };
        match handle.disconnect(id).await {
            Ok(0) | Err(_) => {
                if let Some(handle) = self.rooms.remove(&code) {
                    handle.shutdown().await;
                }
                tracing::info!(room_id = %code, rooms = self.rooms.len(), "room unregistered");
            }
            Ok(_) => {}
        }
    }

    pub async fn toggle_ready(&mut self, code: RoomCode, id: PlayerId) -> Result<(), RoomError> {
        let result = self.handle(code)?.toggle_ready(id).await;
        self.reap(code, result)
    }

    pub async fn start(&mut self, code: RoomCode, id: PlayerId) -> Result<(), RoomError> {
        let result = self.handle(code)?.start(id).await;
        self.reap(code, result)
    }

    pub async fn input(&mut self, code: RoomCode, id: PlayerId, input: M::Input) -> Result<(), RoomError> {
        let result = self.handle(code)?.input(id, input).await;
        self.reap(code, result)
    }

    pub async fn info(&mut self, code: RoomCode) -> Result<RoomInfo, RoomError> {
        let result = self.handle(code)?.info().await;
        self.reap(code, result)
    }

    fn handle(&self, code: RoomCode) -> Result<&RoomHandle<M>, RoomError> {
        self.rooms.get(&code).ok_or(RoomError::NotFound(code))
    }

    /// An `Unavailable` answer means the actor exited on its own; the
    /// entry is dropped so the code reads as gone from then on.
    fn reap<T>(&mut self, code: RoomCode, result: Result<T, RoomError>) -> Result<T, RoomError> {
        match result {
            Err(RoomError::Unavailable(_)) => {
                self.rooms.remove(&code);
                tracing::info!(room_id = %code, rooms = self.rooms.len(), "stale room dropped");
                Err(RoomError::NotFound(code))
            }
            other => other,
        }
    }

    pub fn contains(&self, code: RoomCode) -> bool {
        self.rooms.contains_key(&code)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Stops every room. Used on server shutdown.
    pub async fn shutdown_all(&mut self) {
        for (_, handle) in self.rooms.drain() {
            handle.shutdown().await;
        }
    }
}

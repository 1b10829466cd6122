//! The room actor: one task per room, commands over a channel.
//!
//! All room state is owned by a single spawned task; the rest of the
//! server talks to it through a cloneable [`RoomHandle`]. Requests that
//! need an answer carry a oneshot. The actor exits when the last member
//! leaves, when the handle side sends `Shutdown`, or when every handle
//! is dropped — and because timers are plain deadlines inside the
//! actor, they die with it.

use parlor_protocol::{PlayerId, RoomCode, RoomPhase};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::core::{Member, MemberSender, Outbox, RoomCore};
use crate::error::RoomError;
use crate::mode::GameMode;

const COMMAND_BUFFER: usize = 64;

/// What a successful join hands back to the connection handler.
#[derive(Debug, Clone)]
pub struct JoinGrant {
    /// Identity inside the room. On a reconnection this is the old
    /// member's id, not the new connection's.
    pub member_id: PlayerId,
    /// Token that reclaims this slot after a dropped connection.
    pub token: String,
    pub rejoined: bool,
}

/// Snapshot answered by [`RoomHandle::info`].
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub phase: RoomPhase,
    pub members: usize,
}

pub enum RoomCommand<M: GameMode> {
    Join {
        id: PlayerId,
        username: String,
        sender: MemberSender,
        token: Option<String>,
        reply: oneshot::Sender<Result<JoinGrant, RoomError>>,
    },
    Leave {
        id: PlayerId,
        /// Answered with the number of members remaining.
        reply: oneshot::Sender<usize>,
    },
    /// The connection died without an explicit leave. Mid-round the
    /// member slot is held for reconnection; in the waiting phase it
    /// is removed like a leave. Once no member has a live connection
    /// the room is torn down outright.
    Disconnect {
        id: PlayerId,
        reply: oneshot::Sender<usize>,
    },
    ToggleReady {
        id: PlayerId,
    },
    Start {
        id: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Input {
        id: PlayerId,
        input: M::Input,
    },
    Info {
        reply: oneshot::Sender<RoomInfo>,
    },
    Shutdown,
}

/// Cloneable front for a room actor.
#[derive(Debug)]
pub struct RoomHandle<M: GameMode> {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand<M>>,
}

impl<M: GameMode> Clone for RoomHandle<M> {
    fn clone(&self) -> Self {
        Self {
            code: self.code,
            sender: self.sender.clone(),
        }
    }
}

impl<M: GameMode> RoomHandle<M> {
    pub fn code(&self) -> RoomCode {
        self.code
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand<M>,
    ) -> Result<T, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(make(tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.code))?;
        rx.await.map_err(|_| RoomError::Unavailable(self.code))
    }

    pub async fn join(
        &self,
        id: PlayerId,
        username: String,
        sender: MemberSender,
        token: Option<String>,
    ) -> Result<JoinGrant, RoomError> {
        self.request(|reply| RoomCommand::Join {
            id,
            username,
            sender,
            token,
            reply,
        })
        .await?
    }

    /// Returns how many members remain after the leave.
    pub async fn leave(&self, id: PlayerId) -> Result<usize, RoomError> {
        self.request(|reply| RoomCommand::Leave { id, reply }).await
    }

    /// Reports a dead connection; returns how many members remain.
    pub async fn disconnect(&self, id: PlayerId) -> Result<usize, RoomError> {
        self.request(|reply| RoomCommand::Disconnect { id, reply })
            .await
    }

    pub async fn toggle_ready(&self, id: PlayerId) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::ToggleReady { id })
            .await
            .map_err(|_| RoomError::Unavailable(self.code))
    }

    pub async fn start(&self, id: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Start { id, reply })
            .await?
    }

    pub async fn input(&self, id: PlayerId, input: M::Input) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Input { id, input })
            .await
            .map_err(|_| RoomError::Unavailable(self.code))
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Info { reply: tx })
            .await
            .map_err(|_| RoomError::Unavailable(self.code))?;
        rx.await.map_err(|_| RoomError::Unavailable(self.code))
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(RoomCommand::Shutdown).await;
    }
}

/// Spawns a room actor and returns its handle.
pub fn spawn_room<M: GameMode>(code: RoomCode, config: M::Config) -> RoomHandle<M> {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let actor = RoomActor::<M> {
        core: RoomCore::new(code),
        config,
        carry: M::Carry::default(),
        game: None,
        rx,
    };
    tokio::spawn(actor.run());
    RoomHandle { code, sender: tx }
}

struct RoomActor<M: GameMode> {
    core: RoomCore,
    config: M::Config,
    carry: M::Carry,
    game: Option<M>,
    rx: mpsc::Receiver<RoomCommand<M>>,
}

enum Step<M: GameMode> {
    Cmd(Option<RoomCommand<M>>),
    Wake,
}

impl<M: GameMode> RoomActor<M> {
    async fn run(mut self) {
        tracing::info!(room_id = %self.core.code, kind = M::KIND, "room created");

        loop {
            let step = match self.game.as_ref().and_then(M::deadline) {
                Some(at) => tokio::select! {
                    cmd = self.rx.recv() => Step::Cmd(cmd),
                    _ = tokio::time::sleep_until(at) => Step::Wake,
                },
                None => Step::Cmd(self.rx.recv().await),
            };

            let mut out = Outbox::new();
            let stop = match step {
                Step::Cmd(None) => true,
                Step::Cmd(Some(cmd)) => self.handle(cmd, &mut out),
                Step::Wake => {
                    if let Some(game) = self.game.as_mut() {
                        game.wake(&mut self.core, Instant::now(), &mut out);
                    }
                    false
                }
            };
            self.core.deliver(&mut out);

            // A mode signals "round over, room reusable" by resetting
            // the phase; the actor drops the finished game and lets go
            // of any slots that were only held for reconnection.
            if self.core.phase == RoomPhase::Waiting {
                self.game = None;
                self.prune_disconnected();
            }

            if stop || self.core.is_empty() {
                break;
            }
        }

        tracing::info!(room_id = %self.core.code, kind = M::KIND, "room destroyed");
    }

    fn prune_disconnected(&mut self) {
        let removed = self.core.prune_disconnected();
        if removed.is_empty() {
            return;
        }
        let mut out = Outbox::new();
        for member in &removed {
            tracing::info!(room_id = %self.core.code, id = %member.id, "held slot released");
            M::announce_leave(&self.core, member.id, &member.username, &mut out);
        }
        if !self.core.is_empty() {
            out.broadcast(M::status(&self.core, None));
        }
        self.core.deliver(&mut out);
    }

    /// Handles one command; returns `true` to stop the actor.
    fn handle(&mut self, cmd: RoomCommand<M>, out: &mut Outbox) -> bool {
        match cmd {
            RoomCommand::Join {
                id,
                username,
                sender,
                token,
                reply,
            } => {
                let _ = reply.send(self.handle_join(id, username, sender, token, out));
            }
            RoomCommand::Leave { id, reply } => {
                self.handle_leave(id, out);
                let _ = reply.send(self.core.len());
            }
            RoomCommand::Disconnect { id, reply } => {
                self.handle_disconnect(id, out);
                let _ = reply.send(self.core.len());
            }
            RoomCommand::ToggleReady { id } => {
                if self.core.phase == RoomPhase::Waiting && self.core.toggle_ready(id).is_some() {
                    out.broadcast(M::status(&self.core, self.game.as_ref()));
                }
            }
            RoomCommand::Start { id, reply } => {
                let _ = reply.send(self.handle_start(id, out));
            }
            RoomCommand::Input { id, input } => match self.game.as_mut() {
                Some(game) => game.input(&mut self.core, id, input, Instant::now(), out),
                None => {
                    tracing::debug!(room_id = %self.core.code, %id, "input with no live game");
                }
            },
            RoomCommand::Info { reply } => {
                let _ = reply.send(RoomInfo {
                    code: self.core.code,
                    phase: self.core.phase,
                    members: self.core.len(),
                });
            }
            RoomCommand::Shutdown => return true,
        }
        false
    }

    fn handle_join(
        &mut self,
        id: PlayerId,
        username: String,
        sender: MemberSender,
        token: Option<String>,
        out: &mut Outbox,
    ) -> Result<JoinGrant, RoomError> {
        if !self.core.phase.is_joinable() {
            return self.handle_reconnect(username, sender, token, out);
        }

        // A returning player reclaims their old slot instead of being
        // seated twice: the token wins, the display name is the
        // fallback.
        let returning = token
            .as_deref()
            .and_then(|t| self.core.member_by_token(t))
            .or_else(|| self.core.member_by_username(&username))
            .map(|m| m.id);
        if let Some(member_id) = returning {
            return Ok(self.rebind_slot(member_id, sender, out));
        }

        if self.core.len() >= M::MAX_PLAYERS {
            return Err(RoomError::RoomFull(self.core.code));
        }

        let token = parlor_session::reconnect_token();
        self.core.insert(Member {
            id,
            username,
            ready: false,
            token: token.clone(),
            sender,
        });
        tracing::info!(room_id = %self.core.code, %id, "player joined");

        M::announce_join(&self.core, id, out);
        out.broadcast(M::status(&self.core, self.game.as_ref()));

        Ok(JoinGrant {
            member_id: id,
            token,
            rejoined: false,
        })
    }

    /// Mid-game joins are only honored as reconnections: the token is
    /// authoritative, with the username as a fallback for clients that
    /// lost their token with the rest of their state.
    fn handle_reconnect(
        &mut self,
        username: String,
        sender: MemberSender,
        token: Option<String>,
        out: &mut Outbox,
    ) -> Result<JoinGrant, RoomError> {
        let member_id = token
            .as_deref()
            .and_then(|t| self.core.member_by_token(t))
            .or_else(|| self.core.member_by_username(&username))
            .map(|m| m.id)
            .ok_or(RoomError::MatchInProgress)?;
        Ok(self.rebind_slot(member_id, sender, out))
    }

    /// Points an existing slot at a new connection and replays whatever
    /// the mode wants a returning client to see.
    fn rebind_slot(&mut self, member_id: PlayerId, sender: MemberSender, out: &mut Outbox) -> JoinGrant {
        let token = self
            .core
            .rebind(member_id, sender)
            .expect("member id resolved before rebind");
        tracing::info!(room_id = %self.core.code, id = %member_id, "player reconnected");

        if let Some(game) = self.game.as_mut() {
            game.rejoined(&self.core, member_id, out);
        }
        out.broadcast(M::status(&self.core, self.game.as_ref()));

        JoinGrant {
            member_id,
            token,
            rejoined: true,
        }
    }

    /// Members remain but every channel is closed: nobody is left to
    /// play on or to reconnect for.
    fn abandoned(&self) -> bool {
        !self.core.is_empty() && self.core.iter().all(|m| m.sender.is_closed())
    }

    fn handle_leave(&mut self, id: PlayerId, out: &mut Outbox) {
        let Some(member) = self.core.remove(id) else {
            return;
        };
        tracing::info!(room_id = %self.core.code, %id, "player left");

        M::announce_leave(&self.core, id, &member.username, out);
        if let Some(game) = self.game.as_mut() {
            game.member_left(&mut self.core, id, Instant::now(), out);
        }
        if self.abandoned() {
            tracing::info!(room_id = %self.core.code, "only dead connections remain, room abandoned");
            self.core.prune_disconnected();
        }
        if !self.core.is_empty() {
            out.broadcast(M::status(&self.core, self.game.as_ref()));
        }
    }

    /// A dropped connection only removes the member while the room is
    /// waiting, and only if nothing has rebound the slot in the
    /// meantime. During a round the slot is held so the reconnection
    /// token can reclaim it.
    fn handle_disconnect(&mut self, id: PlayerId, out: &mut Outbox) {
        let slot_dead = self.core.get(id).is_some_and(|m| m.sender.is_closed());
        if !slot_dead {
            return;
        }
        if self.core.phase == RoomPhase::Waiting {
            self.handle_leave(id, out);
        } else if self.abandoned() {
            tracing::info!(room_id = %self.core.code, "last connection lost, room abandoned");
            self.core.prune_disconnected();
        } else {
            tracing::info!(room_id = %self.core.code, %id, "connection lost, slot held");
        }
    }

    fn handle_start(&mut self, id: PlayerId, out: &mut Outbox) -> Result<(), RoomError> {
        if !self.core.is_host(id) {
            return Err(RoomError::NotHost);
        }
        if self.core.phase != RoomPhase::Waiting {
            return Err(RoomError::MatchInProgress);
        }
        if !self.core.all_ready() {
            return Err(RoomError::NotAllReady);
        }
        if self.core.len() < M::MIN_PLAYERS {
            return Err(RoomError::NotEnoughPlayers);
        }

        tracing::info!(room_id = %self.core.code, kind = M::KIND, "game starting");
        self.game = Some(M::launch(
            &self.config,
            &mut self.core,
            &mut self.carry,
            Instant::now(),
            out,
        ));
        Ok(())
    }
}

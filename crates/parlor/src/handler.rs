//! Per-connection handler: reads frames, routes them to rooms, and
//! pumps room broadcasts back out.

use std::sync::Arc;

use parlor_arena::{ArenaConfig, ArenaInput};
use parlor_protocol::{ClientMessage, Codec, RoomCode, ServerMessage, WordMode};
use parlor_room::RoomError;
use parlor_session::{RoomSlot, Session};
use parlor_transport::{Connection, WebSocketConnection};
use parlor_word::{Guess, WordConfig};
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::server::ServerState;

/// Display names are clipped to this many chars.
const MAX_USERNAME_LEN: usize = 24;

type Tx = UnboundedSender<ServerMessage>;

/// Owns one connection from accept to teardown.
///
/// Outbound traffic goes through an unbounded channel drained by a
/// writer task, so room actors broadcasting to this player never block
/// on the socket.
pub(crate) async fn handle_connection(conn: WebSocketConnection, state: Arc<ServerState>) {
    let mut session = state.sessions.open();
    let codec = state.codec;

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let writer_conn = conn.clone();
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let bytes = match codec.encode(&msg) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!(error = %e, "outbound message failed to encode");
                    continue;
                }
            };
            if writer_conn.send(bytes).await.is_err() {
                break;
            }
        }
    });

    let _ = tx.send(ServerMessage::Connected {
        client_id: session.id,
    });

    loop {
        let bytes = match conn.recv().await {
            Ok(bytes) => bytes,
            Err(_) => break,
        };
        match codec.decode::<ClientMessage>(&bytes) {
            Ok(msg) => dispatch(&mut session, &state, &tx, msg).await,
            Err(e) => {
                tracing::debug!(player_id = %session.id, error = %e, "undecodable frame");
                let _ = tx.send(ServerMessage::Error {
                    message: "invalid message".into(),
                });
            }
        }
    }

    // Teardown. The writer goes first so the rooms see this player's
    // channel as closed: a disconnect mid-round holds the slot for the
    // reconnection token instead of removing the player.
    writer.abort();
    let _ = writer.await;
    drop(tx);
    if let Some(slot) = session.word_room.take() {
        state
            .word_rooms
            .lock()
            .await
            .disconnect(slot.code, slot.member_id)
            .await;
    }
    if let Some(slot) = session.arena_room.take() {
        state
            .arena_rooms
            .lock()
            .await
            .disconnect(slot.code, slot.member_id)
            .await;
    }
    state.sessions.close(&session);
}

async fn dispatch(session: &mut Session, state: &ServerState, tx: &Tx, msg: ClientMessage) {
    match msg {
        ClientMessage::SetUsername { username } => {
            let username: String = username.trim().chars().take(MAX_USERNAME_LEN).collect();
            if !username.is_empty() {
                session.username = username;
            }
            let _ = tx.send(ServerMessage::UsernameSet {
                username: session.username.clone(),
            });
        }

        // -- Word rooms --
        ClientMessage::CreateRoom { mode } => create_word_room(session, state, tx, mode).await,
        ClientMessage::JoinRoom { code, token } => {
            join_word_room(session, state, tx, &code, token).await
        }
        ClientMessage::ToggleReady {} => {
            if let Some(slot) = session.word_room {
                let _ = state
                    .word_rooms
                    .lock()
                    .await
                    .toggle_ready(slot.code, slot.member_id)
                    .await;
            }
        }
        ClientMessage::StartGame {} => {
            if let Some(slot) = session.word_room {
                let result = state
                    .word_rooms
                    .lock()
                    .await
                    .start(slot.code, slot.member_id)
                    .await;
                report_start(tx, result);
            }
        }
        ClientMessage::SubmitGuess { guess } => {
            if let Some(slot) = session.word_room {
                let _ = state
                    .word_rooms
                    .lock()
                    .await
                    .input(slot.code, slot.member_id, Guess(guess))
                    .await;
            }
        }
        ClientMessage::LeaveRoom {} => {
            if let Some(slot) = session.word_room.take() {
                state
                    .word_rooms
                    .lock()
                    .await
                    .leave(slot.code, slot.member_id)
                    .await;
                let _ = tx.send(ServerMessage::RoomLeft);
            }
        }

        // -- Arena rooms --
        ClientMessage::CreateArenaRoom {} => create_arena_room(session, state, tx).await,
        ClientMessage::JoinArenaRoom { code, token } => {
            let username = session.username.clone();
            join_arena_room(session, state, tx, &code, username, token).await
        }
        ClientMessage::ToggleArenaReady {} => {
            if let Some(slot) = session.arena_room {
                let _ = state
                    .arena_rooms
                    .lock()
                    .await
                    .toggle_ready(slot.code, slot.member_id)
                    .await;
            }
        }
        ClientMessage::StartArenaGame {} => {
            if let Some(slot) = session.arena_room {
                let result = state
                    .arena_rooms
                    .lock()
                    .await
                    .start(slot.code, slot.member_id)
                    .await;
                report_start(tx, result);
            }
        }
        ClientMessage::ArenaDirection { direction } => {
            arena_input(session, state, ArenaInput::Direction(direction)).await;
        }
        ClientMessage::ArenaRestart {} => {
            arena_input(session, state, ArenaInput::Restart).await;
        }
        ClientMessage::ArenaQuickRestart {} => {
            arena_input(session, state, ArenaInput::QuickRestart).await;
        }
        ClientMessage::ArenaRejoin {
            room_code,
            username,
            token,
        } => {
            let username: String = username.trim().chars().take(MAX_USERNAME_LEN).collect();
            if !username.is_empty() {
                session.username = username;
            }
            let name = session.username.clone();
            join_arena_room(session, state, tx, &room_code, name, token).await;
        }
        ClientMessage::LeaveArenaRoom {} => {
            if let Some(slot) = session.arena_room.take() {
                state
                    .arena_rooms
                    .lock()
                    .await
                    .leave(slot.code, slot.member_id)
                    .await;
                let _ = tx.send(ServerMessage::ArenaRoomLeft);
            }
        }
    }
}

async fn create_word_room(session: &mut Session, state: &ServerState, tx: &Tx, mode: WordMode) {
    leave_word_room(session, state).await;

    let config = WordConfig {
        mode,
        dictionary: state.dictionary.clone(),
    };
    let result = state
        .word_rooms
        .lock()
        .await
        .create(config, session.id, session.username.clone(), tx.clone())
        .await;
    match result {
        Ok((code, grant)) => {
            session.word_room = Some(RoomSlot::new(code, grant.member_id));
            let _ = tx.send(ServerMessage::RoomCreated {
                code,
                mode,
                token: grant.token,
            });
        }
        Err(e) => send_error(tx, &e),
    }
}

async fn join_word_room(
    session: &mut Session,
    state: &ServerState,
    tx: &Tx,
    code: &str,
    token: Option<String>,
) {
    let Ok(code) = code.parse::<RoomCode>() else {
        let _ = tx.send(ServerMessage::Error {
            message: format!("room {} not found", code.trim().to_uppercase()),
        });
        return;
    };
    leave_word_room(session, state).await;

    let result = state
        .word_rooms
        .lock()
        .await
        .join(code, session.id, session.username.clone(), tx.clone(), token)
        .await;
    match result {
        Ok(grant) => {
            session.word_room = Some(RoomSlot::new(code, grant.member_id));
            let _ = tx.send(ServerMessage::RoomJoined {
                code,
                token: grant.token,
                rejoined: grant.rejoined,
            });
        }
        Err(e) => send_error(tx, &e),
    }
}

async fn create_arena_room(session: &mut Session, state: &ServerState, tx: &Tx) {
    leave_arena_room(session, state).await;

    let config: ArenaConfig = state.arena_config.clone();
    let result = state
        .arena_rooms
        .lock()
        .await
        .create(config, session.id, session.username.clone(), tx.clone())
        .await;
    match result {
        Ok((code, grant)) => {
            session.arena_room = Some(RoomSlot::new(code, grant.member_id));
            let _ = tx.send(ServerMessage::ArenaRoomCreated {
                code,
                token: grant.token,
            });
        }
        Err(e) => send_error(tx, &e),
    }
}

async fn join_arena_room(
    session: &mut Session,
    state: &ServerState,
    tx: &Tx,
    code: &str,
    username: String,
    token: Option<String>,
) {
    let Ok(code) = code.parse::<RoomCode>() else {
        let _ = tx.send(ServerMessage::Error {
            message: format!("room {} not found", code.trim().to_uppercase()),
        });
        return;
    };
    leave_arena_room(session, state).await;

    let result = state
        .arena_rooms
        .lock()
        .await
        .join(code, session.id, username, tx.clone(), token)
        .await;
    match result {
        Ok(grant) => {
            session.arena_room = Some(RoomSlot::new(code, grant.member_id));
            let _ = tx.send(ServerMessage::ArenaRoomJoined {
                code,
                token: grant.token,
                rejoined: grant.rejoined,
            });
        }
        Err(e) => send_error(tx, &e),
    }
}

async fn arena_input(session: &Session, state: &ServerState, input: ArenaInput) {
    if let Some(slot) = session.arena_room {
        let _ = state
            .arena_rooms
            .lock()
            .await
            .input(slot.code, slot.member_id, input)
            .await;
    }
}

async fn leave_word_room(session: &mut Session, state: &ServerState) {
    if let Some(slot) = session.word_room.take() {
        state
            .word_rooms
            .lock()
            .await
            .leave(slot.code, slot.member_id)
            .await;
    }
}

async fn leave_arena_room(session: &mut Session, state: &ServerState) {
    if let Some(slot) = session.arena_room.take() {
        state
            .arena_rooms
            .lock()
            .await
            .leave(slot.code, slot.member_id)
            .await;
    }
}

/// A failed start is the host's mistake, not a room event: everyone
/// else stays unbothered, and a stray non-host click is dropped
/// silently.
fn report_start(tx: &Tx, result: Result<(), RoomError>) {
    match result {
        Ok(()) | Err(RoomError::NotHost) => {}
        Err(e) => send_error(tx, &e),
    }
}

fn send_error(tx: &Tx, e: &RoomError) {
    let _ = tx.send(ServerMessage::Error {
        message: e.to_string(),
    });
}

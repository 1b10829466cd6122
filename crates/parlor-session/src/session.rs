//! Session types: the server's record of a single connection.
//!
//! A session tracks WHO a connection is (id, display name) and WHERE it
//! is (word-room and arena-room slots, independent of each other). The
//! session itself is owned by the connection's handler task; the shared
//! [`Sessions`] allocator only hands out ids and keeps a live count.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parlor_protocol::{PlayerId, RoomCode};

/// A room membership held by a session.
///
/// `member_id` is the identity inside the room, which differs from the
/// connection id after a reconnection (the new connection takes over
/// the old member slot).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomSlot {
    pub code: RoomCode,
    pub member_id: PlayerId,
}

impl RoomSlot {
    pub fn new(code: RoomCode, member_id: PlayerId) -> Self {
        Self { code, member_id }
    }
}

/// One connection's identity and current memberships.
#[derive(Debug, Clone)]
pub struct Session {
    /// Process-unique connection id, announced to the client.
    pub id: PlayerId,

    /// Mutable display name. Defaults to `player-{id}` until the
    /// client sets one.
    pub username: String,

    /// Word-room membership, if any.
    pub word_room: Option<RoomSlot>,

    /// Arena-room membership, if any. Independent of `word_room` — a
    /// connection can hold both at once.
    pub arena_room: Option<RoomSlot>,
}

impl Session {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            username: format!("player-{}", id.0),
            word_room: None,
            arena_room: None,
        }
    }
}

/// Allocates connection ids and tracks how many sessions are live.
///
/// A plain owned value inside the server state — intentionally not a
/// static, so tests and embedded servers get independent id spaces.
#[derive(Debug, Default)]
pub struct Sessions {
    next_id: AtomicU64,
    active: AtomicUsize,
}

impl Sessions {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            active: AtomicUsize::new(0),
        }
    }

    /// Opens a session for a new connection.
    pub fn open(&self) -> Session {
        let id = PlayerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let active = self.active.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(player_id = %id, active, "session opened");
        Session::new(id)
    }

    /// Releases a session when its connection ends.
    pub fn close(&self, session: &Session) {
        let active = self.active.fetch_sub(1, Ordering::Relaxed) - 1;
        tracing::info!(player_id = %session.id, active, "session closed");
    }

    /// Number of currently open sessions.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }
}

// =========================================================================
// Tests
// =========================================================================

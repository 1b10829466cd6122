//! The client/server message enums — the wire protocol proper.
//!
//! Every frame is `{"type": "<kebab-case name>", "data": {...}}`, which
//! maps onto adjacently tagged serde enums (`tag = "type"`,
//! `content = "data"`). Payload field names are camelCase to match the
//! browser client.

use serde::{Deserialize, Serialize};

use crate::{
    Cell, Direction, PlayerId, PowerUpKind, RoomCode, RoomPhase, RoundEndReason,
    Verdict, WordMode,
};

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Everything a client can send.
///
/// Room codes arrive as raw strings and are parsed (and uppercased)
/// server-side, so that a typo produces a normal "room not found"
/// instead of a decode error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    SetUsername {
        username: String,
    },
    CreateRoom {
        #[serde(default)]
        mode: WordMode,
    },
    JoinRoom {
        code: String,
        #[serde(default)]
        token: Option<String>,
    },
    // Unit-payload messages are empty struct variants so the client's
    // `"data": {}` deserializes.
    ToggleReady {},
    StartGame {},
    SubmitGuess {
        guess: String,
    },
    LeaveRoom {},
    CreateArenaRoom {},
    JoinArenaRoom {
        code: String,
        #[serde(default)]
        token: Option<String>,
    },
    ToggleArenaReady {},
    StartArenaGame {},
    ArenaDirection {
        direction: Direction,
    },
    ArenaRestart {},
    ArenaQuickRestart {},
    #[serde(rename_all = "camelCase")]
    ArenaRejoin {
        room_code: String,
        username: String,
        #[serde(default)]
        token: Option<String>,
    },
    LeaveArenaRoom {},
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Everything the server can send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    Connected {
        client_id: PlayerId,
    },
    UsernameSet {
        username: String,
    },

    // -- Word room lifecycle --
    RoomCreated {
        code: RoomCode,
        mode: WordMode,
        token: String,
    },
    RoomJoined {
        code: RoomCode,
        token: String,
        rejoined: bool,
    },
    RoomLeft,
    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        player_id: PlayerId,
        username: String,
    },
    #[serde(rename_all = "camelCase")]
    PlayerLeft {
        player_id: PlayerId,
        username: String,
    },
    RoomStatus(WordRoomStatus),

    // -- Word rounds --
    #[serde(rename_all = "camelCase")]
    GameStart {
        word_length: usize,
        first_letter: char,
        mode: WordMode,
    },
    #[serde(rename_all = "camelCase")]
    GuessResult {
        guess: String,
        evaluation: Vec<Verdict>,
        attempt_number: u32,
    },
    #[serde(rename_all = "camelCase")]
    PlayerProgress {
        player_id: PlayerId,
        username: String,
        attempt_count: u32,
        finished: bool,
    },
    #[serde(rename_all = "camelCase")]
    TimerUpdate {
        remaining_ms: u64,
    },
    GameEnd {
        reason: RoundEndReason,
        word: String,
        results: Vec<WordResult>,
    },

    // -- Arena room lifecycle --
    ArenaRoomCreated {
        code: RoomCode,
        token: String,
    },
    ArenaRoomJoined {
        code: RoomCode,
        token: String,
        rejoined: bool,
    },
    ArenaRoomLeft,
    #[serde(rename_all = "camelCase")]
    ArenaPlayerJoined {
        player_id: PlayerId,
        username: String,
    },
    #[serde(rename_all = "camelCase")]
    ArenaPlayerLeft {
        player_id: PlayerId,
        username: String,
    },
    ArenaRoomStatus(ArenaRoomStatus),

    // -- Arena rounds --
    ArenaYourId {
        id: PlayerId,
    },
    ArenaCountdown {
        count: u32,
    },
    ArenaGameStarted,
    #[serde(rename_all = "camelCase")]
    ArenaGameState {
        agents: Vec<AgentState>,
        food: Option<Food>,
        power_ups: Vec<PowerUp>,
        tick_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    ArenaPlayerDied {
        player_id: PlayerId,
        username: String,
    },
    ArenaGameEnd {
        winner: Option<ArenaWinner>,
        results: Vec<ArenaResult>,
    },

    Error {
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Status snapshots and results
// ---------------------------------------------------------------------------

/// Full word-room snapshot, broadcast on every membership or ready change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordRoomStatus {
    pub code: RoomCode,
    pub mode: WordMode,
    pub phase: RoomPhase,
    pub host_id: PlayerId,
    /// 0 while no round is running.
    pub word_length: usize,
    pub players: Vec<WordPlayerEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordPlayerEntry {
    pub id: PlayerId,
    pub username: String,
    pub is_ready: bool,
    pub is_host: bool,
    pub finished: bool,
    pub attempt_count: u32,
    pub score: u32,
}

/// Per-player word-round result, ordered by score descending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordResult {
    pub id: PlayerId,
    pub username: String,
    pub finished: bool,
    pub attempt_count: u32,
    /// Elapsed ms from round start to the winning guess.
    pub finish_ms: Option<u64>,
    pub score: u32,
    pub is_winner: bool,
}

/// Full arena-room snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArenaRoomStatus {
    pub code: RoomCode,
    pub phase: RoomPhase,
    pub host_id: PlayerId,
    pub players: Vec<ArenaPlayerEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArenaPlayerEntry {
    pub id: PlayerId,
    pub username: String,
    pub is_ready: bool,
    pub is_host: bool,
    pub alive: bool,
    pub score: u64,
}

/// One agent in an `arena-game-state` snapshot. Dead agents keep their
/// entry (empty body, `alive: false`) so clients can show final scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentState {
    pub id: PlayerId,
    pub username: String,
    /// Head first.
    pub body: Vec<Cell>,
    pub score: u64,
    pub alive: bool,
    pub speed_boost: bool,
    pub shield: bool,
}

/// The single food item on the field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Food {
    pub cell: Cell,
    pub is_super: bool,
}

/// A power-up waiting on the field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerUp {
    pub cell: Cell,
    pub kind: PowerUpKind,
    /// Elapsed ms from round start when it appeared.
    pub spawned_at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaWinner {
    pub id: PlayerId,
    pub username: String,
}

/// Per-agent arena result, ordered by score descending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArenaResult {
    pub id: PlayerId,
    pub username: String,
    pub score: u64,
    pub length: usize,
    pub alive: bool,
}

// =========================================================================
// Tests
// =========================================================================

//! Wire protocol for Parlor.
//!
//! Defines the language clients and server speak:
//!
//! - **Messages** ([`ClientMessage`], [`ServerMessage`]) — every frame
//!   on the wire, as adjacently tagged `{"type", "data"}` JSON.
//! - **Value types** ([`PlayerId`], [`RoomCode`], [`Cell`], [`Verdict`],
//!   …) — the shared vocabulary of both game modes.
//! - **Codec** ([`Codec`], [`JsonCodec`]) — how frames become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about connections or rooms — it
//! only describes shapes.

mod codec;
mod error;
mod message;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use message::{
    AgentState, ArenaPlayerEntry, ArenaResult, ArenaRoomStatus, ArenaWinner,
    ClientMessage, Food, PowerUp, ServerMessage, WordPlayerEntry, WordResult,
    WordRoomStatus,
};
pub use types::{
    Cell, Direction, PlayerId, PowerUpKind, RoomCode, RoomPhase, RoundEndReason,
    Verdict, WordMode,
};

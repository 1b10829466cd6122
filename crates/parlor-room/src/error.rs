use parlor_protocol::RoomCode;
use thiserror::Error;

/// Errors from room operations.
#[derive(Debug, Error)]
pub enum RoomError {
    #[error("room {0} not found")]
    NotFound(RoomCode),

    #[error("match already in progress")]
    MatchInProgress,

    #[error("room {0} is full")]
    RoomFull(RoomCode),

    #[error("not all players are ready")]
    NotAllReady,

    #[error("not enough players to start")]
    NotEnoughPlayers,

    #[error("only the host can do that")]
    NotHost,

    /// The room actor went away mid-request (shutdown race).
    #[error("room {0} is no longer available")]
    Unavailable(RoomCode),
}

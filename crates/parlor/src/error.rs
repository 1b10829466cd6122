use parlor_protocol::ProtocolError;
use parlor_room::RoomError;
use parlor_transport::TransportError;
use thiserror::Error;

/// Top-level error: a transparent union of the layer errors, so `?`
/// works across crate boundaries without losing the message.
#[derive(Debug, Error)]
pub enum ParlorError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Room(#[from] RoomError),
}

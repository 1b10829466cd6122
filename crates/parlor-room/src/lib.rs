//! Generic room machinery: one actor task per room, a [`GameMode`]
//! strategy for the game being played in it, and a per-mode
//! [`RoomRegistry`] mapping codes to live handles.

mod actor;
mod core;
mod error;
mod mode;
mod registry;

pub use actor::{JoinGrant, RoomCommand, RoomHandle, RoomInfo, spawn_room};
pub use core::{Member, MemberSender, Outbox, Recipient, RoomCore};
pub use error::RoomError;
pub use mode::GameMode;
pub use registry::RoomRegistry;

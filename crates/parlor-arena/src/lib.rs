//! The snake arena: up to four players on a shared grid, one snake
//! each, last one moving wins. The simulation runs inside the room
//! actor on a tick that quickens as the round drags on.

mod agent;
mod config;
mod engine;

pub use agent::Agent;
pub use config::ArenaConfig;
pub use engine::{ArenaInput, ArenaMatch};

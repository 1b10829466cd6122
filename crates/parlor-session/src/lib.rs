//! Connection identity and admission control.
//!
//! This crate owns everything about a connection that exists outside
//! any particular room: the [`Session`] record and its id allocator,
//! the reconnection tokens rooms hand out, and the per-IP connection
//! [`Throttle`] the accept loop consults.

mod session;
mod throttle;
mod token;

pub use session::{RoomSlot, Session, Sessions};
pub use throttle::{Admission, Throttle, ThrottleConfig};
pub use token::reconnect_token;

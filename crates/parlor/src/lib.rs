//! Parlor: a WebSocket game-room server.
//!
//! Two games share one room system — a word-guessing race and a
//! real-time snake arena. Clients speak the JSON protocol from
//! `parlor-protocol`; each room runs as its own actor task.
//!
//! ```no_run
//! use parlor::ParlorServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), parlor::ParlorError> {
//!     let server = ParlorServer::builder().bind("127.0.0.1:8081").build().await?;
//!     server.run().await
//! }
//! ```

mod error;
mod handler;
mod server;

pub use error::ParlorError;
pub use server::{DEFAULT_ADDR, ParlorServer, ParlorServerBuilder};

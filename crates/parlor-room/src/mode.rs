//! The seam between the generic room machinery and a concrete game.
//!
//! A room actor owns a [`RoomCore`] plus at most one live `M: GameMode`
//! value. The actor handles joining, leaving, readiness, and start
//! gating; the mode decides everything that happens between launch and
//! the room returning to the waiting phase. Modes are plain state
//! machines driven by three entry points — [`input`](GameMode::input)
//! for player messages, [`wake`](GameMode::wake) for timer fires, and
//! [`member_left`](GameMode::member_left) — and communicate only
//! through the [`Outbox`] and the phase field on the core.

use parlor_protocol::{PlayerId, ServerMessage};
use tokio::time::Instant;

use crate::core::{Outbox, RoomCore};

pub trait GameMode: Send + Sized + 'static {
    /// Room-construction parameters (dictionary, rule set, ...).
    type Config: Clone + Send + 'static;

    /// Player messages routed to a live game.
    type Input: Send + 'static;

    /// State that survives across rounds in the same room (e.g. the
    /// word mode's recently-used-words list).
    type Carry: Default + Send + 'static;

    /// Short name for logging.
    const KIND: &'static str;

    const MIN_PLAYERS: usize;
    const MAX_PLAYERS: usize;

    /// The status snapshot broadcast after every membership or
    /// readiness change. `game` is `Some` while a round is live.
    fn status(core: &RoomCore, game: Option<&Self>) -> ServerMessage;

    /// Starts a round. The actor has already verified the start gates
    /// (host, phase, readiness, player count); the mode sets the phase
    /// and queues its opening messages.
    fn launch(
        config: &Self::Config,
        core: &mut RoomCore,
        carry: &mut Self::Carry,
        now: Instant,
        out: &mut Outbox,
    ) -> Self;

    /// Handles a player message during a live game.
    fn input(
        &mut self,
        core: &mut RoomCore,
        sender: PlayerId,
        input: Self::Input,
        now: Instant,
        out: &mut Outbox,
    );

    /// The next instant this mode needs waking, if any. The actor
    /// sleeps until the earliest deadline or the next command.
    fn deadline(&self) -> Option<Instant>;

    /// Called when the actor wakes at (or after) [`deadline`](Self::deadline).
    /// The mode checks its own clocks — a wake is a hint, not a claim
    /// that any particular timer fired.
    fn wake(&mut self, core: &mut RoomCore, now: Instant, out: &mut Outbox);

    /// Called after a member was removed mid-game.
    fn member_left(&mut self, core: &mut RoomCore, id: PlayerId, now: Instant, out: &mut Outbox);

    /// Called after a reconnection rebound a member slot, so the mode
    /// can replay whatever the new connection missed.
    fn rejoined(&mut self, core: &RoomCore, id: PlayerId, out: &mut Outbox) {
        let _ = (core, id, out);
    }

    /// Queues the mode-flavored join announcement (new member already
    /// inserted into `core`).
    fn announce_join(core: &RoomCore, id: PlayerId, out: &mut Outbox);

    /// Queues the mode-flavored leave announcement (member already
    /// removed from `core`).
    fn announce_leave(core: &RoomCore, id: PlayerId, username: &str, out: &mut Outbox);
}

//! Room membership state shared by every game mode.
//!
//! [`RoomCore`] is the part of a room that exists regardless of what is
//! being played: who is in it, who hosts, what phase it is in, and how
//! to reach each member's connection. Members live in a `Vec` because
//! join order matters — host re-election picks the first remaining
//! member, and the arena assigns spawn slots by join order.

use parlor_protocol::{PlayerId, RoomCode, RoomPhase, ServerMessage};
use tokio::sync::mpsc;

/// Outbound channel to one member's connection writer.
pub type MemberSender = mpsc::UnboundedSender<ServerMessage>;

/// One player's slot in a room.
#[derive(Debug)]
pub struct Member {
    pub id: PlayerId,
    pub username: String,
    pub ready: bool,
    /// Reconnection token issued at join; presenting it reclaims this
    /// slot after a dropped connection.
    pub token: String,
    pub sender: MemberSender,
}

/// Who a queued message goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    All,
    Player(PlayerId),
    AllExcept(PlayerId),
}

/// Messages a mode wants delivered, accumulated during one actor step.
///
/// Modes never touch member senders directly; they queue into an outbox
/// and the actor flushes it after the step completes, so a mode that
/// returns early can't leave the room half-notified.
#[derive(Debug, Default)]
pub struct Outbox {
    queue: Vec<(Recipient, ServerMessage)>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&mut self, to: Recipient, msg: ServerMessage) {
        self.queue.push((to, msg));
    }

    pub fn broadcast(&mut self, msg: ServerMessage) {
        self.send(Recipient::All, msg);
    }

    pub fn to(&mut self, player: PlayerId, msg: ServerMessage) {
        self.send(Recipient::Player(player), msg);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = (Recipient, ServerMessage)> + '_ {
        self.queue.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Mode-independent room state.
#[derive(Debug)]
pub struct RoomCore {
    pub code: RoomCode,
    pub host: PlayerId,
    pub phase: RoomPhase,
    members: Vec<Member>,
}

impl RoomCore {
    pub fn new(code: RoomCode) -> Self {
        Self {
            code,
            host: PlayerId(0),
            phase: RoomPhase::Waiting,
            members: Vec::new(),
        }
    }

    /// Adds a member. The first member becomes host.
    pub fn insert(&mut self, member: Member) {
        if self.members.is_empty() {
            self.host = member.id;
        }
        self.members.push(member);
    }

    /// Removes a member. If the host left, the first remaining member
    /// (oldest by join order) becomes host.
    pub fn remove(&mut self, id: PlayerId) -> Option<Member> {
        let idx = self.members.iter().position(|m| m.id == id)?;
        let member = self.members.remove(idx);
        if self.host == id {
            if let Some(next) = self.members.first() {
                self.host = next.id;
                tracing::debug!(room_id = %self.code, host = %next.id, "host re-elected");
            }
        }
        Some(member)
    }

    pub fn get(&self, id: PlayerId) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| m.id == id)
    }

    pub fn member_by_token(&self, token: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.token == token)
    }

    pub fn member_by_username(&self, username: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.username == username)
    }

    /// Points an existing member slot at a new connection and returns
    /// the slot's token. Used on reconnection.
    pub fn rebind(&mut self, id: PlayerId, sender: MemberSender) -> Option<String> {
        let member = self.get_mut(id)?;
        member.sender = sender;
        Some(member.token.clone())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Member> {
        self.members.iter()
    }

    pub fn is_host(&self, id: PlayerId) -> bool {
        self.host == id
    }

    pub fn all_ready(&self) -> bool {
        self.members.iter().all(|m| m.ready)
    }

    pub fn toggle_ready(&mut self, id: PlayerId) -> Option<bool> {
        let member = self.get_mut(id)?;
        member.ready = !member.ready;
        Some(member.ready)
    }

    pub fn clear_ready(&mut self) {
        for m in &mut self.members {
            m.ready = false;
        }
    }

    /// Delivers to one member. Send failures are ignored: a dead
    /// receiver means the connection is tearing down and will leave
    /// the room through its own path.
    pub fn send_to(&self, id: PlayerId, msg: ServerMessage) {
        if let Some(member) = self.get(id) {
            let _ = member.sender.send(msg);
        }
    }

    pub fn broadcast(&self, msg: &ServerMessage) {
        for m in &self.members {
            let _ = m.sender.send(msg.clone());
        }
    }

    pub fn broadcast_except(&self, except: PlayerId, msg: &ServerMessage) {
        for m in self.members.iter().filter(|m| m.id != except) {
            let _ = m.sender.send(msg.clone());
        }
    }

    /// Removes every member whose connection channel has closed and
    /// returns them. Called when the room returns to the waiting
    /// phase, so slots held through a round for reconnection don't
    /// linger forever.
    pub fn prune_disconnected(&mut self) -> Vec<Member> {
        let gone: Vec<PlayerId> = self
            .members
            .iter()
            .filter(|m| m.sender.is_closed())
            .map(|m| m.id)
            .collect();
        gone.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Flushes a drained outbox through the member senders.
    pub fn deliver(&self, outbox: &mut Outbox) {
        for (recipient, msg) in outbox.drain() {
            match recipient {
                Recipient::All => self.broadcast(&msg),
                Recipient::Player(id) => self.send_to(id, msg),
                Recipient::AllExcept(id) => self.broadcast_except(id, &msg),
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn code() -> RoomCode {
        RoomCode::from_str("TEST").expect("valid code")
    }

    fn member(id: u64) -> (Member, UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let member = Member {
            id: PlayerId(id),
            username: format!("player-{id}"),
            ready: false,
            token: parlor_session::reconnect_token(),
            sender: tx,
        };
        (member, rx)
    }

    #[test]
    fn test_insert_first_member_becomes_host() {
        let mut core = RoomCore::new(code());
        let (a, _rx_a) = member(1);
        let (b, _rx_b) = member(2);
        core.insert(a);
        core.insert(b);
        assert!(core.is_host(PlayerId(1)));
        assert!(!core.is_host(PlayerId(2)));
    }

    #[test]
    fn test_remove_host_elects_oldest_remaining() {
        let mut core = RoomCore::new(code());
        let (a, _rx_a) = member(1);
        let (b, _rx_b) = member(2);
        let (c, _rx_c) = member(3);
        core.insert(a);
        core.insert(b);
        core.insert(c);

        core.remove(PlayerId(1));
        assert!(core.is_host(PlayerId(2)));

        // Removing a non-host leaves the host alone.
        core.remove(PlayerId(3));
        assert!(core.is_host(PlayerId(2)));
    }

    #[test]
    fn test_all_ready_and_toggle() {
        let mut core = RoomCore::new(code());
        let (a, _rx_a) = member(1);
        let (b, _rx_b) = member(2);
        core.insert(a);
        core.insert(b);

        assert!(!core.all_ready());
        assert_eq!(core.toggle_ready(PlayerId(1)), Some(true));
        assert_eq!(core.toggle_ready(PlayerId(2)), Some(true));
        assert!(core.all_ready());
        assert_eq!(core.toggle_ready(PlayerId(2)), Some(false));
        assert!(!core.all_ready());
    }

    #[test]
    fn test_rebind_keeps_token_and_swaps_sender() {
        let mut core = RoomCore::new(code());
        let (a, _rx_old) = member(1);
        let original_token = a.token.clone();
        core.insert(a);

        let (tx_new, mut rx_new) = mpsc::unbounded_channel();
        let token = core.rebind(PlayerId(1), tx_new).expect("member exists");
        assert_eq!(token, original_token);

        core.send_to(PlayerId(1), ServerMessage::RoomLeft);
        assert!(rx_new.try_recv().is_ok(), "new sender receives");
    }

    #[test]
    fn test_outbox_delivery_routes_recipients() {
        let mut core = RoomCore::new(code());
        let (a, mut rx_a) = member(1);
        let (b, mut rx_b) = member(2);
        core.insert(a);
        core.insert(b);

        let mut out = Outbox::new();
        out.to(PlayerId(1), ServerMessage::RoomLeft);
        out.send(
            Recipient::AllExcept(PlayerId(1)),
            ServerMessage::ArenaGameStarted,
        );
        core.deliver(&mut out);

        assert!(matches!(rx_a.try_recv(), Ok(ServerMessage::RoomLeft)));
        assert!(rx_a.try_recv().is_err(), "excluded from second message");
        assert!(matches!(rx_b.try_recv(), Ok(ServerMessage::ArenaGameStarted)));
    }
}

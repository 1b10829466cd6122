//! One snake on the field.

use std::collections::VecDeque;

use parlor_protocol::{Cell, Direction, PlayerId};
use tokio::time::Instant;

/// Spawn anchors by join order: one per field edge, inset by a margin
/// so nobody starts a tick from a wall, each heading away from its
/// corner.
fn spawn_anchor(slot: usize, grid: i32) -> (Cell, Direction) {
    let margin = 4;
    match slot % 4 {
        0 => (Cell::new(margin, grid / 4), Direction::Right),
        1 => (Cell::new(grid - 1 - margin, 3 * grid / 4), Direction::Left),
        2 => (Cell::new(grid / 4, grid - 1 - margin), Direction::Up),
        _ => (Cell::new(3 * grid / 4, margin), Direction::Down),
    }
}

#[derive(Debug)]
pub struct Agent {
    pub id: PlayerId,
    /// Head at the front.
    pub body: VecDeque<Cell>,
    pub heading: Direction,
    /// Next heading, applied at the start of the next tick.
    pub queued: Option<Direction>,
    /// Fractional score; floored for the wire.
    pub score: f64,
    pub alive: bool,
    pub boost_until: Option<Instant>,
    pub shield_until: Option<Instant>,
    /// Consecutive foods eaten within the combo window.
    pub combo: u32,
    pub last_ate: Option<Instant>,
}

impl Agent {
    /// A fresh agent at the spawn anchor for `slot`, body trailing
    /// opposite its heading.
    pub fn spawn(id: PlayerId, slot: usize, grid: i32, length: usize) -> Self {
        let (head, heading) = spawn_anchor(slot, grid);
        let mut body = VecDeque::with_capacity(length);
        let mut cell = head;
        for _ in 0..length {
            body.push_back(cell);
            cell = cell.step(heading.reverse());
        }
        Self {
            id,
            body,
            heading,
            queued: None,
            score: 0.0,
            alive: true,
            boost_until: None,
            shield_until: None,
            combo: 0,
            last_ate: None,
        }
    }

    pub fn head(&self) -> Cell {
        *self.body.front().expect("living agent has a body")
    }

    /// Queues a heading change; reversing into the own neck is ignored.
    pub fn queue_heading(&mut self, dir: Direction) {
        if dir == self.heading.reverse() {
            return;
        }
        self.queued = Some(dir);
    }

    pub fn boost_active(&self, now: Instant) -> bool {
        self.boost_until.is_some_and(|until| now < until)
    }

    pub fn shield_active(&self, now: Instant) -> bool {
        self.shield_until.is_some_and(|until| now < until)
    }

    /// Drops expired effect timers.
    pub fn expire_effects(&mut self, now: Instant) {
        if self.boost_until.is_some_and(|until| now >= until) {
            self.boost_until = None;
        }
        if self.shield_until.is_some_and(|until| now >= until) {
            self.shield_until = None;
        }
    }
}

//! The arena simulation: countdown, tick loop, collisions, scoring.

use parlor_protocol::{
    AgentState, ArenaPlayerEntry, ArenaResult, ArenaRoomStatus, ArenaWinner, Cell, Direction,
    Food, PlayerId, PowerUp, PowerUpKind, RoomPhase, ServerMessage,
};
use parlor_room::{GameMode, Outbox, Recipient, RoomCore};
use parlor_tick::{TickClock, earliest};
use tokio::time::Instant;

use crate::agent::Agent;
use crate::config::ArenaConfig;

use std::time::Duration;

/// Player messages routed to a live arena match.
#[derive(Debug, Clone)]
pub enum ArenaInput {
    Direction(Direction),
    /// Back to the waiting room after a finished round.
    Restart,
    /// Host only: everyone re-readied and a new countdown immediately.
    QuickRestart,
}

/// One arena round, from countdown to game end.
pub struct ArenaMatch {
    cfg: ArenaConfig,
    /// Join order; index is the spawn slot.
    agents: Vec<Agent>,
    food: Option<Food>,
    power_ups: Vec<PowerUp>,
    countdown: Option<u32>,
    started_at: Option<Instant>,
    countdown_clock: TickClock,
    tick_clock: TickClock,
    super_food_clock: TickClock,
    power_up_clock: TickClock,
}

/// The simulation tick for a round that has run `elapsed`: shrinks by
/// one step per speedup period, down to the floor.
fn paced_interval(cfg: &ArenaConfig, elapsed: Duration) -> Duration {
    let steps = (elapsed.as_secs() / cfg.speedup_period.as_secs().max(1)) as u32;
    cfg.base_tick
        .saturating_sub(cfg.tick_step * steps)
        .max(cfg.min_tick)
}

impl ArenaMatch {
    fn agent(&self, id: PlayerId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    fn agent_mut(&mut self, id: PlayerId) -> Option<&mut Agent> {
        self.agents.iter_mut().find(|a| a.id == id)
    }

    fn living(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter().filter(|a| a.alive)
    }

    fn username(core: &RoomCore, id: PlayerId) -> String {
        core.get(id).map(|m| m.username.clone()).unwrap_or_default()
    }

    fn snapshot(&self, core: &RoomCore, now: Instant) -> ServerMessage {
        ServerMessage::ArenaGameState {
            agents: self
                .agents
                .iter()
                .map(|a| AgentState {
                    id: a.id,
                    username: Self::username(core, a.id),
                    body: a.body.iter().copied().collect(),
                    score: a.score as u64,
                    alive: a.alive,
                    speed_boost: a.boost_active(now),
                    shield: a.shield_active(now),
                })
                .collect(),
            food: self.food,
            power_ups: self.power_ups.clone(),
            tick_ms: self.tick_clock.interval().as_millis() as u64,
        }
    }

    /// A random cell not covered by a body, the food, or a power-up.
    /// Bounded sampling: on a field this sparse a miss streak that
    /// long means the field is essentially full, and overlapping is
    /// preferable to spinning.
    fn free_cell(&self) -> Cell {
        use rand::Rng;
        let mut rng = rand::rng();
        let grid = self.cfg.grid_size;
        for _ in 0..1_000 {
            let cell = Cell::new(rng.random_range(0..grid), rng.random_range(0..grid));
            let on_body = self.living().any(|a| a.body.contains(&cell));
            let on_food = self.food.is_some_and(|f| f.cell == cell);
            let on_power_up = self.power_ups.iter().any(|p| p.cell == cell);
            if !on_body && !on_food && !on_power_up {
                return cell;
            }
        }
        Cell::new(rng.random_range(0..grid), rng.random_range(0..grid))
    }

    fn spawn_food(&mut self) {
        self.food = Some(Food {
            cell: self.free_cell(),
            is_super: false,
        });
    }

    /// Countdown finished: place the snakes and start the clocks.
    fn begin(&mut self, core: &mut RoomCore, now: Instant, out: &mut Outbox) {
        core.phase = RoomPhase::Playing;
        self.countdown = None;
        self.countdown_clock.stop();
        self.started_at = Some(now);

        self.agents = core
            .iter()
            .enumerate()
            .map(|(slot, m)| Agent::spawn(m.id, slot, self.cfg.grid_size, self.cfg.initial_length))
            .collect();
        self.spawn_food();

        self.tick_clock.start(now);
        self.super_food_clock.start(now);
        self.power_up_clock.start(now);

        tracing::info!(room_id = %core.code, agents = self.agents.len(), "arena round started");
        out.broadcast(ServerMessage::ArenaGameStarted);
        out.broadcast(self.snapshot(core, now));
    }

    /// One simulation tick, in two phases: every move is resolved
    /// against a frozen copy of the field, then all outcomes are
    /// committed at once. No agent sees a half-updated tick.
    fn step(&mut self, core: &mut RoomCore, now: Instant, out: &mut Outbox) {
        for agent in self.agents.iter_mut().filter(|a| a.alive) {
            agent.expire_effects(now);
            if let Some(dir) = agent.queued.take() {
                if dir != agent.heading.reverse() {
                    agent.heading = dir;
                }
            }
        }

        // Phase one: resolve against the frozen field.
        let frozen: Vec<Option<Vec<Cell>>> = self
            .agents
            .iter()
            .map(|a| a.alive.then(|| a.body.iter().copied().collect()))
            .collect();

        struct Move {
            idx: usize,
            head: Cell,
            eats: bool,
            drops_tail: bool,
        }

        let mut deaths: Vec<usize> = Vec::new();
        let mut kill_credits: Vec<usize> = Vec::new();
        let mut moves: Vec<Move> = Vec::new();

        for (idx, agent) in self.agents.iter().enumerate() {
            if !agent.alive {
                continue;
            }
            let head = agent.head().step(agent.heading);
            let eats = self.food.is_some_and(|f| f.cell == head);
            let drops_tail = !eats && !agent.shield_active(now);

            if !head.in_bounds(self.cfg.grid_size) {
                deaths.push(idx);
                continue;
            }

            // Own body; the tail cell doesn't count if it moves away
            // this same tick.
            let own = frozen[idx].as_deref().expect("living agent was frozen");
            let own_check = if drops_tail {
                &own[..own.len() - 1]
            } else {
                own
            };
            if own_check.contains(&head) {
                deaths.push(idx);
                continue;
            }

            let hit = frozen.iter().enumerate().find(|(j, body)| {
                *j != idx && body.as_deref().is_some_and(|b| b.contains(&head))
            });
            if let Some((defender, _)) = hit {
                deaths.push(idx);
                kill_credits.push(defender);
                continue;
            }

            moves.push(Move {
                idx,
                head,
                eats,
                drops_tail,
            });
        }

        // Two surviving heads proposing the same cell is a head-on:
        // both die, nobody gets the kill bonus.
        let clashed: Vec<usize> = moves
            .iter()
            .filter(|m| moves.iter().any(|o| o.idx != m.idx && o.head == m.head))
            .map(|m| m.idx)
            .collect();
        moves.retain(|m| !clashed.contains(&m.idx));
        deaths.extend(clashed);

        // Phase two: commit.
        for &idx in &deaths {
            let agent = &mut self.agents[idx];
            agent.alive = false;
            agent.body.clear();
            out.broadcast(ServerMessage::ArenaPlayerDied {
                player_id: agent.id,
                username: Self::username(core, agent.id),
            });
        }
        for &idx in &kill_credits {
            if self.agents[idx].alive {
                self.agents[idx].score += self.cfg.kill_bonus;
            }
        }

        let mut ate_food = false;
        for m in &moves {
            let agent = &mut self.agents[m.idx];
            agent.body.push_front(m.head);

            if m.eats {
                let food = self.food.take().expect("eats implies food present");
                let (points, growth) = if food.is_super {
                    (self.cfg.super_points, self.cfg.super_growth)
                } else {
                    (self.cfg.food_points, self.cfg.food_growth)
                };
                agent.combo = match agent.last_ate {
                    Some(t) if now.duration_since(t) <= self.cfg.combo_window => agent.combo + 1,
                    _ => 1,
                };
                agent.last_ate = Some(now);
                agent.score += points + self.cfg.combo_bonus * (agent.combo - 1) as f64;
                // The kept tail accounts for one growth; the rest
                // extends in place.
                for _ in 1..growth {
                    if let Some(&tail) = agent.body.back() {
                        agent.body.push_back(tail);
                    }
                }
                ate_food = true;
            } else if m.drops_tail {
                agent.body.pop_back();
            }

            if let Some(pos) = self.power_ups.iter().position(|p| p.cell == m.head) {
                let power_up = self.power_ups.remove(pos);
                let agent = &mut self.agents[m.idx];
                match power_up.kind {
                    PowerUpKind::Speed => {
                        agent.boost_until = Some(now + self.cfg.effect_duration);
                    }
                    PowerUpKind::Shield => {
                        agent.shield_until = Some(now + self.cfg.effect_duration);
                    }
                    PowerUpKind::Mega => {
                        agent.score += self.cfg.mega_points;
                        for _ in 0..self.cfg.mega_growth {
                            if let Some(&tail) = agent.body.back() {
                                agent.body.push_back(tail);
                            }
                        }
                    }
                }
            }
        }
        if ate_food {
            self.spawn_food();
        }

        for agent in self.agents.iter_mut().filter(|a| a.alive) {
            agent.score += self.cfg.survival_per_tick;
        }

        if let Some(started) = self.started_at {
            let interval = paced_interval(&self.cfg, now.duration_since(started));
            self.tick_clock.set_interval(now, interval);
        }

        out.broadcast(self.snapshot(core, now));

        if self.living().count() <= 1 {
            self.finish(core, out);
        }
    }

    /// Closes the round: the sole survivor wins, or on a simultaneous
    /// wipeout the top score does.
    fn finish(&mut self, core: &mut RoomCore, out: &mut Outbox) {
        core.phase = RoomPhase::Finished;
        self.tick_clock.stop();
        self.super_food_clock.stop();
        self.power_up_clock.stop();

        // Sole survivor wins; on a wipeout the top score does, with
        // join order breaking ties.
        let winner_id = self.living().next().map(|a| a.id).or_else(|| {
            self.agents
                .iter()
                .enumerate()
                .max_by(|(i, a), (j, b)| a.score.total_cmp(&b.score).then(j.cmp(i)))
                .map(|(_, a)| a.id)
        });
        if let Some(id) = winner_id {
            let victory_bonus = self.cfg.victory_bonus;
            if let Some(agent) = self.agent_mut(id) {
                agent.score += victory_bonus;
            }
        }

        let mut results: Vec<ArenaResult> = self
            .agents
            .iter()
            .map(|a| ArenaResult {
                id: a.id,
                username: Self::username(core, a.id),
                score: a.score as u64,
                length: a.body.len(),
                alive: a.alive,
            })
            .collect();
        results.sort_by(|a, b| b.score.cmp(&a.score));

        let winner = winner_id.map(|id| ArenaWinner {
            id,
            username: Self::username(core, id),
        });
        tracing::info!(
            room_id = %core.code,
            winner = winner.as_ref().map(|w| w.id.0),
            "arena round over"
        );
        out.broadcast(ServerMessage::ArenaGameEnd { winner, results });
    }
}

impl GameMode for ArenaMatch {
    type Config = ArenaConfig;
    type Input = ArenaInput;
    type Carry = ();

    const KIND: &'static str = "arena";
    const MIN_PLAYERS: usize = 2;
    const MAX_PLAYERS: usize = 4;

    fn status(core: &RoomCore, game: Option<&Self>) -> ServerMessage {
        let players = core
            .iter()
            .map(|m| {
                let agent = game.and_then(|g| g.agent(m.id));
                ArenaPlayerEntry {
                    id: m.id,
                    username: m.username.clone(),
                    is_ready: m.ready,
                    is_host: core.is_host(m.id),
                    alive: agent.is_none_or(|a| a.alive),
                    score: agent.map_or(0, |a| a.score as u64),
                }
            })
            .collect();
        ServerMessage::ArenaRoomStatus(ArenaRoomStatus {
            code: core.code,
            phase: core.phase,
            host_id: core.host,
            players,
        })
    }

    fn launch(
        config: &ArenaConfig,
        core: &mut RoomCore,
        _carry: &mut (),
        now: Instant,
        out: &mut Outbox,
    ) -> Self {
        core.phase = RoomPhase::Countdown;
        for member in core.iter() {
            out.to(member.id, ServerMessage::ArenaYourId { id: member.id });
        }
        out.broadcast(ServerMessage::ArenaCountdown {
            count: config.countdown_from,
        });

        let mut countdown_clock = TickClock::stopped(Duration::from_secs(1));
        countdown_clock.start(now);

        Self {
            cfg: config.clone(),
            agents: Vec::new(),
            food: None,
            power_ups: Vec::new(),
            countdown: Some(config.countdown_from),
            started_at: None,
            countdown_clock,
            tick_clock: TickClock::stopped(config.base_tick),
            super_food_clock: TickClock::stopped(config.super_food_period),
            power_up_clock: TickClock::stopped(config.power_up_period),
        }
    }

    fn input(
        &mut self,
        core: &mut RoomCore,
        sender: PlayerId,
        input: ArenaInput,
        now: Instant,
        out: &mut Outbox,
    ) {
        match input {
            ArenaInput::Direction(dir) => {
                if core.phase == RoomPhase::Playing {
                    if let Some(agent) = self.agent_mut(sender) {
                        if agent.alive {
                            agent.queue_heading(dir);
                        }
                    }
                }
            }
            ArenaInput::Restart => {
                if core.phase == RoomPhase::Finished {
                    core.phase = RoomPhase::Waiting;
                    core.clear_ready();
                    out.broadcast(Self::status(core, None));
                }
            }
            ArenaInput::QuickRestart => {
                if core.phase == RoomPhase::Finished && core.is_host(sender) {
                    for id in core.iter().map(|m| m.id).collect::<Vec<_>>() {
                        if let Some(member) = core.get_mut(id) {
                            member.ready = true;
                        }
                    }
                    let cfg = self.cfg.clone();
                    *self = Self::launch(&cfg, core, &mut (), now, out);
                }
            }
        }
    }

    fn deadline(&self) -> Option<Instant> {
        earliest([
            self.countdown_clock.deadline(),
            self.tick_clock.deadline(),
            self.super_food_clock.deadline(),
            self.power_up_clock.deadline(),
        ])
    }

    fn wake(&mut self, core: &mut RoomCore, now: Instant, out: &mut Outbox) {
        if core.phase == RoomPhase::Countdown && self.countdown_clock.fire(now) {
            if let Some(count) = self.countdown {
                let count = count.saturating_sub(1);
                self.countdown = Some(count);
                out.broadcast(ServerMessage::ArenaCountdown { count });
                if count == 0 {
                    self.begin(core, now, out);
                }
            }
            return;
        }

        if core.phase != RoomPhase::Playing {
            return;
        }
        if self.tick_clock.fire(now) {
            self.step(core, now, out);
        }
        // The step may have ended the round.
        if core.phase != RoomPhase::Playing {
            return;
        }

        if self.super_food_clock.fire(now) {
            use rand::Rng;
            if rand::rng().random_bool(0.5) {
                if let Some(food) = self.food.as_mut() {
                    food.is_super = true;
                }
            }
        }
        if self.power_up_clock.fire(now) && self.power_ups.len() < self.cfg.max_power_ups {
            use rand::Rng;
            let kind = match rand::rng().random_range(0..3) {
                0 => PowerUpKind::Speed,
                1 => PowerUpKind::Shield,
                _ => PowerUpKind::Mega,
            };
            let power_up = PowerUp {
                cell: self.free_cell(),
                kind,
                spawned_at: self
                    .started_at
                    .map_or(0, |s| now.duration_since(s).as_millis() as u64),
            };
            self.power_ups.push(power_up);
        }
    }

    fn member_left(&mut self, core: &mut RoomCore, id: PlayerId, _now: Instant, out: &mut Outbox) {
        self.agents.retain(|a| a.id != id);
        match core.phase {
            RoomPhase::Playing => {
                if self.living().count() <= 1 {
                    self.finish(core, out);
                }
            }
            RoomPhase::Countdown => {
                if core.len() < Self::MIN_PLAYERS {
                    core.phase = RoomPhase::Waiting;
                    core.clear_ready();
                    self.countdown_clock.stop();
                }
            }
            _ => {}
        }
    }

    /// A reconnected client needs its id and, mid-round, a full state
    /// snapshot to redraw from.
    fn rejoined(&mut self, core: &RoomCore, id: PlayerId, out: &mut Outbox) {
        out.to(id, ServerMessage::ArenaYourId { id });
        if core.phase == RoomPhase::Playing {
            out.to(id, ServerMessage::ArenaGameStarted);
            out.to(id, self.snapshot(core, Instant::now()));
        }
    }

    fn announce_join(core: &RoomCore, id: PlayerId, out: &mut Outbox) {
        let username = core.get(id).map(|m| m.username.clone()).unwrap_or_default();
        out.send(
            Recipient::AllExcept(id),
            ServerMessage::ArenaPlayerJoined {
                player_id: id,
                username,
            },
        );
    }

    fn announce_leave(_core: &RoomCore, id: PlayerId, username: &str, out: &mut Outbox) {
        out.broadcast(ServerMessage::ArenaPlayerLeft {
            player_id: id,
            username: username.to_string(),
        });
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_room::{Member, MemberSender};
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn room(players: u64) -> (RoomCore, Vec<UnboundedReceiver<ServerMessage>>) {
        let mut core = RoomCore::new("TEST".parse().unwrap());
        let mut rxs = Vec::new();
        for id in 1..=players {
            let (tx, rx): (MemberSender, _) = mpsc::unbounded_channel();
            core.insert(Member {
                id: PlayerId(id),
                username: format!("player-{id}"),
                ready: true,
                token: String::new(),
                sender: tx,
            });
            rxs.push(rx);
        }
        (core, rxs)
    }

    /// A playing match with the given agents and no food or power-ups
    /// (so nothing spawns under a snake mid-test).
    fn playing(core: &mut RoomCore, now: Instant, agents: Vec<Agent>) -> ArenaMatch {
        core.phase = RoomPhase::Playing;
        let cfg = ArenaConfig::default();
        let mut tick_clock = TickClock::stopped(cfg.base_tick);
        tick_clock.start(now);
        ArenaMatch {
            cfg,
            agents,
            food: None,
            power_ups: Vec::new(),
            countdown: None,
            started_at: Some(now),
            countdown_clock: TickClock::stopped(Duration::from_secs(1)),
            tick_clock,
            super_food_clock: TickClock::stopped(Duration::from_secs(30)),
            power_up_clock: TickClock::stopped(Duration::from_secs(15)),
        }
    }

    /// A straight snake with its head at `head`, trailing opposite
    /// `heading`.
    fn snake(id: u64, head: Cell, heading: Direction, len: usize) -> Agent {
        let mut agent = Agent::spawn(PlayerId(id), 0, 25, len);
        agent.body.clear();
        let mut cell = head;
        for _ in 0..len {
            agent.body.push_back(cell);
            cell = cell.step(heading.reverse());
        }
        agent.heading = heading;
        agent
    }

    fn messages(out: &mut Outbox) -> Vec<ServerMessage> {
        out.drain().map(|(_, m)| m).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_paced_interval_shrinks_to_floor() {
        let cfg = ArenaConfig::default();
        assert_eq!(paced_interval(&cfg, Duration::ZERO), Duration::from_millis(80));
        assert_eq!(
            paced_interval(&cfg, Duration::from_secs(31)),
            Duration::from_millis(75)
        );
        assert_eq!(
            paced_interval(&cfg, Duration::from_secs(200)),
            Duration::from_millis(50)
        );
        assert_eq!(
            paced_interval(&cfg, Duration::from_secs(3_000)),
            Duration::from_millis(50)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_counts_down_then_begins() {
        let (mut core, _rxs) = room(2);
        let now = Instant::now();
        let mut out = Outbox::new();
        let mut game = ArenaMatch::launch(
            &ArenaConfig::default(),
            &mut core,
            &mut (),
            now,
            &mut out,
        );

        assert_eq!(core.phase, RoomPhase::Countdown);
        let msgs = messages(&mut out);
        assert!(msgs
            .iter()
            .any(|m| matches!(m, ServerMessage::ArenaYourId { id } if *id == PlayerId(1))));
        assert!(msgs
            .iter()
            .any(|m| matches!(m, ServerMessage::ArenaCountdown { count: 3 })));

        // Three one-second wakes: 2, 1, then 0 and the round begins.
        for second in 1..=3u64 {
            game.wake(&mut core, now + Duration::from_secs(second) + Duration::from_millis(5), &mut out);
        }
        let msgs = messages(&mut out);
        assert!(msgs
            .iter()
            .any(|m| matches!(m, ServerMessage::ArenaCountdown { count: 0 })));
        assert!(msgs
            .iter()
            .any(|m| matches!(m, ServerMessage::ArenaGameStarted)));
        assert_eq!(core.phase, RoomPhase::Playing);
        assert_eq!(game.agents.len(), 2);
        assert!(game.food.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_wall_collision_kills_and_clears_body() {
        let (mut core, _rxs) = room(2);
        let now = Instant::now();
        let mut game = playing(
            &mut core,
            now,
            vec![
                snake(1, Cell::new(24, 10), Direction::Right, 3),
                snake(2, Cell::new(5, 20), Direction::Left, 3),
            ],
        );

        let mut out = Outbox::new();
        game.step(&mut core, now, &mut out);

        let agent = game.agent(PlayerId(1)).unwrap();
        assert!(!agent.alive);
        assert!(agent.body.is_empty());
        let msgs = messages(&mut out);
        assert!(msgs.iter().any(|m| matches!(
            m,
            ServerMessage::ArenaPlayerDied { player_id, .. } if *player_id == PlayerId(1)
        )));
        // One living agent left, so the round is over.
        assert_eq!(core.phase, RoomPhase::Finished);
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_eating_scores_and_grows() {
        let (mut core, _rxs) = room(2);
        let now = Instant::now();
        let mut game = playing(
            &mut core,
            now,
            vec![
                snake(1, Cell::new(10, 10), Direction::Right, 3),
                snake(2, Cell::new(5, 20), Direction::Left, 3),
            ],
        );
        game.food = Some(Food {
            cell: Cell::new(11, 10),
            is_super: false,
        });

        let mut out = Outbox::new();
        game.step(&mut core, now, &mut out);

        let agent = game.agent(PlayerId(1)).unwrap();
        assert_eq!(agent.body.len(), 4);
        assert!((agent.score - 10.1).abs() < 1e-9, "food plus survival");
        assert!(game.food.is_some(), "food respawned");
        assert_ne!(game.food.unwrap().cell, Cell::new(11, 10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_super_food_scores_and_grows_more() {
        let (mut core, _rxs) = room(2);
        let now = Instant::now();
        let mut game = playing(
            &mut core,
            now,
            vec![
                snake(1, Cell::new(10, 10), Direction::Right, 3),
                snake(2, Cell::new(5, 20), Direction::Left, 3),
            ],
        );
        game.food = Some(Food {
            cell: Cell::new(11, 10),
            is_super: true,
        });

        let mut out = Outbox::new();
        game.step(&mut core, now, &mut out);

        let agent = game.agent(PlayerId(1)).unwrap();
        assert_eq!(agent.body.len(), 6);
        assert!((agent.score - 50.1).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_combo_pays_extra_within_window() {
        let (mut core, _rxs) = room(2);
        let now = Instant::now();
        let mut game = playing(
            &mut core,
            now,
            vec![
                snake(1, Cell::new(10, 10), Direction::Right, 3),
                snake(2, Cell::new(5, 20), Direction::Left, 3),
            ],
        );

        let mut out = Outbox::new();
        game.food = Some(Food {
            cell: Cell::new(11, 10),
            is_super: false,
        });
        game.step(&mut core, now, &mut out);

        // Second food one tick later, well inside the combo window.
        let later = now + Duration::from_millis(80);
        game.food = Some(Food {
            cell: Cell::new(12, 10),
            is_super: false,
        });
        game.step(&mut core, later, &mut out);

        let agent = game.agent(PlayerId(1)).unwrap();
        assert_eq!(agent.combo, 2);
        // 10 + (10 + 5 combo bonus) + two survival ticks.
        assert!((agent.score - 25.2).abs() < 1e-9);

        // Past the window the combo starts over.
        let much_later = later + Duration::from_secs(4);
        game.food = Some(Food {
            cell: Cell::new(13, 10),
            is_super: false,
        });
        game.step(&mut core, much_later, &mut out);
        assert_eq!(game.agent(PlayerId(1)).unwrap().combo, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_crashing_into_other_pays_defender() {
        let (mut core, _rxs) = room(3);
        let now = Instant::now();
        let mut game = playing(
            &mut core,
            now,
            vec![
                // Agent 1 drives straight into agent 2's flank.
                snake(1, Cell::new(9, 10), Direction::Right, 3),
                snake(2, Cell::new(10, 12), Direction::Down, 3),
                snake(3, Cell::new(20, 20), Direction::Up, 3),
            ],
        );

        let mut out = Outbox::new();
        game.step(&mut core, now, &mut out);

        assert!(!game.agent(PlayerId(1)).unwrap().alive);
        let defender = game.agent(PlayerId(2)).unwrap();
        assert!(defender.alive);
        assert!((defender.score - 100.1).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_mutual_head_on_kills_both_without_bonus() {
        let (mut core, _rxs) = room(3);
        let now = Instant::now();
        let mut game = playing(
            &mut core,
            now,
            vec![
                snake(1, Cell::new(9, 10), Direction::Right, 3),
                snake(2, Cell::new(11, 10), Direction::Left, 3),
                snake(3, Cell::new(20, 20), Direction::Up, 3),
            ],
        );

        let mut out = Outbox::new();
        game.step(&mut core, now, &mut out);

        let a = game.agent(PlayerId(1)).unwrap();
        let b = game.agent(PlayerId(2)).unwrap();
        assert!(!a.alive && !b.alive);
        assert_eq!(a.score as u64, 0);
        assert_eq!(b.score as u64, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_shield_keeps_tail() {
        let (mut core, _rxs) = room(2);
        let now = Instant::now();
        let mut game = playing(
            &mut core,
            now,
            vec![
                snake(1, Cell::new(10, 10), Direction::Right, 3),
                snake(2, Cell::new(5, 20), Direction::Left, 3),
            ],
        );
        game.agent_mut(PlayerId(1)).unwrap().shield_until = Some(now + Duration::from_secs(5));

        let mut out = Outbox::new();
        game.step(&mut core, now, &mut out);

        assert_eq!(game.agent(PlayerId(1)).unwrap().body.len(), 4);
        assert_eq!(game.agent(PlayerId(2)).unwrap().body.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_power_up_pickup_applies_effect() {
        let (mut core, _rxs) = room(2);
        let now = Instant::now();
        let mut game = playing(
            &mut core,
            now,
            vec![
                snake(1, Cell::new(10, 10), Direction::Right, 3),
                snake(2, Cell::new(5, 20), Direction::Left, 3),
            ],
        );
        game.power_ups.push(PowerUp {
            cell: Cell::new(11, 10),
            kind: PowerUpKind::Speed,
            spawned_at: 0,
        });

        let mut out = Outbox::new();
        game.step(&mut core, now, &mut out);

        let agent = game.agent(PlayerId(1)).unwrap();
        assert!(agent.boost_active(now + Duration::from_secs(1)));
        assert!(game.power_ups.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_power_up_spawn_records_round_elapsed_ms() {
        let (mut core, _rxs) = room(2);
        let now = Instant::now();
        let mut game = playing(
            &mut core,
            now,
            vec![
                snake(1, Cell::new(10, 10), Direction::Right, 3),
                snake(2, Cell::new(5, 20), Direction::Left, 3),
            ],
        );
        game.power_up_clock.start(now);

        let mut out = Outbox::new();
        let later = now + Duration::from_secs(15) + Duration::from_millis(10);
        game.wake(&mut core, later, &mut out);

        let spawned = game.power_ups.first().expect("power-up spawned");
        assert!(spawned.spawned_at >= 15_000);
        assert!(spawned.spawned_at <= 15_100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finish_awards_victory_bonus_to_survivor() {
        let (mut core, _rxs) = room(2);
        let now = Instant::now();
        let mut game = playing(
            &mut core,
            now,
            vec![
                snake(1, Cell::new(24, 10), Direction::Right, 3),
                snake(2, Cell::new(5, 20), Direction::Left, 3),
            ],
        );

        let mut out = Outbox::new();
        game.step(&mut core, now, &mut out);
        assert_eq!(core.phase, RoomPhase::Finished);

        let msgs = messages(&mut out);
        let (winner, results) = msgs
            .iter()
            .rev()
            .find_map(|m| match m {
                ServerMessage::ArenaGameEnd { winner, results } => Some((winner, results)),
                _ => None,
            })
            .expect("game end broadcast");
        let winner = winner.as_ref().expect("sole survivor wins");
        assert_eq!(winner.id, PlayerId(2));
        // Victory bonus plus one survival tick, floored on the wire.
        assert_eq!(results[0].score, 200);
        assert_eq!(results[0].id, PlayerId(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_returns_finished_room_to_waiting() {
        let (mut core, _rxs) = room(2);
        let now = Instant::now();
        let mut game = playing(&mut core, now, vec![]);
        core.phase = RoomPhase::Finished;

        let mut out = Outbox::new();
        game.input(&mut core, PlayerId(2), ArenaInput::Restart, now, &mut out);

        assert_eq!(core.phase, RoomPhase::Waiting);
        assert!(!core.iter().any(|m| m.ready));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quick_restart_is_host_only_and_relaunches() {
        let (mut core, _rxs) = room(2);
        let now = Instant::now();
        let mut game = playing(&mut core, now, vec![]);
        core.phase = RoomPhase::Finished;

        let mut out = Outbox::new();
        game.input(&mut core, PlayerId(2), ArenaInput::QuickRestart, now, &mut out);
        assert_eq!(core.phase, RoomPhase::Finished, "non-host is ignored");

        game.input(&mut core, PlayerId(1), ArenaInput::QuickRestart, now, &mut out);
        assert_eq!(core.phase, RoomPhase::Countdown);
        assert!(core.iter().all(|m| m.ready));
    }

    #[tokio::test(start_paused = true)]
    async fn test_member_left_mid_round_can_end_it() {
        let (mut core, _rxs) = room(2);
        let now = Instant::now();
        let mut game = playing(
            &mut core,
            now,
            vec![
                snake(1, Cell::new(10, 10), Direction::Right, 3),
                snake(2, Cell::new(5, 20), Direction::Left, 3),
            ],
        );

        let mut out = Outbox::new();
        core.remove(PlayerId(2));
        game.member_left(&mut core, PlayerId(2), now, &mut out);

        assert_eq!(core.phase, RoomPhase::Finished);
        let msgs = messages(&mut out);
        assert!(msgs
            .iter()
            .any(|m| matches!(m, ServerMessage::ArenaGameEnd { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_member_left_mid_countdown_aborts_below_minimum() {
        let (mut core, _rxs) = room(2);
        let now = Instant::now();
        let mut out = Outbox::new();
        let mut game = ArenaMatch::launch(
            &ArenaConfig::default(),
            &mut core,
            &mut (),
            now,
            &mut out,
        );
        assert_eq!(core.phase, RoomPhase::Countdown);

        core.remove(PlayerId(2));
        game.member_left(&mut core, PlayerId(2), now, &mut out);
        assert_eq!(core.phase, RoomPhase::Waiting);
    }
}

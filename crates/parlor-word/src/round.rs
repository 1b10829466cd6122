//! The word round state machine.

use std::collections::HashMap;
use std::time::Duration;

use parlor_protocol::{
    PlayerId, RoomPhase, RoundEndReason, ServerMessage, Verdict, WordMode, WordPlayerEntry,
    WordResult, WordRoomStatus,
};
use parlor_room::{GameMode, Outbox, Recipient, RoomCore};
use parlor_tick::{Deadline, TickClock, earliest};
use tokio::time::Instant;

use crate::dict::{Dictionary, RecentWords};
use crate::score::{FIRST_FINISHER_BONUS, attempt_score, timed_rank_score};

/// Wall-clock limit on a timed round.
const ROUND_TIME_LIMIT: Duration = Duration::from_secs(300);

/// Cadence of `timer-update` broadcasts in timed mode.
const TIMER_PERIOD: Duration = Duration::from_secs(1);

/// Pause between the round results and the room reopening.
const RESET_DELAY: Duration = Duration::from_secs(2);

/// Room-construction parameters for word rooms.
#[derive(Debug, Clone, Default)]
pub struct WordConfig {
    pub mode: WordMode,
    pub dictionary: Dictionary,
}

/// A player's guess, already routed to their room.
#[derive(Debug, Clone)]
pub struct Guess(pub String);

#[derive(Debug, Default)]
struct Progress {
    attempts: u32,
    history: Vec<(String, Vec<Verdict>)>,
    finished: bool,
    /// Full-resolution finish time; ms on the wire are too coarse to
    /// order two fast finishers.
    finished_at: Option<Instant>,
    /// Elapsed ms from round start to the winning guess.
    finish_ms: Option<u64>,
    score: u32,
    winner: bool,
}

/// One live round of the guessing game.
pub struct WordRound {
    mode: WordMode,
    target: String,
    started: Instant,
    progress: HashMap<PlayerId, Progress>,
    /// Drives `timer-update` broadcasts; runs only in timed mode.
    timer: TickClock,
    /// Hard stop for timed rounds.
    ends_at: Option<Instant>,
    /// Armed once the round finishes; firing reopens the room.
    reset_at: Deadline,
}

impl WordRound {
    fn word_len(&self) -> usize {
        self.target.chars().count()
    }

    fn remaining_ms(&self, now: Instant) -> u64 {
        self.ends_at
            .map(|at| at.saturating_duration_since(now).as_millis() as u64)
            .unwrap_or(0)
    }

    fn handle_guess(
        &mut self,
        core: &mut RoomCore,
        sender: PlayerId,
        guess: String,
        now: Instant,
        out: &mut Outbox,
    ) {
        if core.phase != RoomPhase::Playing {
            return;
        }
        let Some(progress) = self.progress.get_mut(&sender) else {
            return;
        };
        if progress.finished {
            return;
        }

        let guess = guess.trim().to_uppercase();
        let expected = self.target.chars().count();
        if guess.chars().count() != expected {
            // Not an attempt: the counter stays put.
            out.to(
                sender,
                ServerMessage::Error {
                    message: format!("guess must be {expected} letters"),
                },
            );
            return;
        }

        progress.attempts += 1;
        let evaluation = crate::eval::evaluate(&guess, &self.target);
        let solved = evaluation.iter().all(|v| *v == Verdict::Correct);
        progress.history.push((guess.clone(), evaluation.clone()));
        if solved {
            progress.finished = true;
            progress.finished_at = Some(now);
            progress.finish_ms = Some(now.duration_since(self.started).as_millis() as u64);
        }

        out.to(
            sender,
            ServerMessage::GuessResult {
                guess,
                evaluation,
                attempt_number: progress.attempts,
            },
        );

        let username = core
            .get(sender)
            .map(|m| m.username.clone())
            .unwrap_or_default();
        out.send(
            Recipient::AllExcept(sender),
            ServerMessage::PlayerProgress {
                player_id: sender,
                username,
                attempt_count: self.progress[&sender].attempts,
                finished: solved,
            },
        );

        let all_done = core
            .iter()
            .all(|m| self.progress.get(&m.id).is_some_and(|p| p.finished));
        if all_done {
            self.end(RoundEndReason::Completed, core, now, out);
        }
    }

    /// Closes the round: assigns scores, broadcasts results, and arms
    /// the reset delay.
    fn end(&mut self, reason: RoundEndReason, core: &mut RoomCore, now: Instant, out: &mut Outbox) {
        core.phase = RoomPhase::Finished;
        self.timer.stop();
        self.ends_at = None;

        match self.mode {
            WordMode::Attempts => self.score_attempts(core),
            WordMode::Timed => self.score_timed(core),
        }

        let mut results: Vec<WordResult> = core
            .iter()
            .filter_map(|m| {
                let p = self.progress.get(&m.id)?;
                Some(WordResult {
                    id: m.id,
                    username: m.username.clone(),
                    finished: p.finished,
                    attempt_count: p.attempts,
                    finish_ms: p.finish_ms,
                    score: p.score,
                    is_winner: p.winner,
                })
            })
            .collect();
        results.sort_by(|a, b| b.score.cmp(&a.score));

        tracing::info!(room_id = %core.code, word = %self.target, ?reason, "round over");
        out.broadcast(ServerMessage::GameEnd {
            reason,
            word: self.target.clone(),
            results,
        });
        self.reset_at.arm_in(now, RESET_DELAY);
    }

    /// Attempts mode: points by attempt count, a bonus for the first
    /// to finish, and the win to whoever needed the fewest attempts
    /// (join order breaks ties).
    fn score_attempts(&mut self, core: &RoomCore) {
        for p in self.progress.values_mut() {
            p.score = if p.finished {
                attempt_score(p.attempts)
            } else {
                0
            };
        }

        // Join order breaks exact ties (min_by_key keeps the first
        // minimal element).
        let first = core
            .iter()
            .filter_map(|m| {
                let p = self.progress.get(&m.id)?;
                Some((m.id, p.finished_at?))
            })
            .min_by_key(|&(_, at)| at)
            .map(|(id, _)| id);
        if let Some(id) = first {
            if let Some(p) = self.progress.get_mut(&id) {
                p.score += FIRST_FINISHER_BONUS;
            }
        }

        let winner = core
            .iter()
            .filter_map(|m| {
                let p = self.progress.get(&m.id)?;
                p.finished.then_some((m.id, p.attempts))
            })
            .min_by_key(|&(_, attempts)| attempts)
            .map(|(id, _)| id);
        if let Some(id) = winner {
            if let Some(p) = self.progress.get_mut(&id) {
                p.winner = true;
            }
        }
    }

    /// Timed mode: points by finish order; first finisher wins. The
    /// sort is stable, so exact ties fall back to join order.
    fn score_timed(&mut self, core: &RoomCore) {
        let mut finishers: Vec<(PlayerId, Instant)> = core
            .iter()
            .filter_map(|m| {
                let p = self.progress.get(&m.id)?;
                Some((m.id, p.finished_at?))
            })
            .collect();
        finishers.sort_by_key(|&(_, at)| at);

        for (rank, (id, _)) in finishers.iter().enumerate() {
            let p = self.progress.get_mut(id).expect("finisher has progress");
            p.score = timed_rank_score(rank);
            p.winner = rank == 0;
        }
        for p in self.progress.values_mut() {
            if !p.finished {
                p.score = 0;
            }
        }
    }
}

impl GameMode for WordRound {
    type Config = WordConfig;
    type Input = Guess;
    type Carry = RecentWords;

    const KIND: &'static str = "word";
    const MIN_PLAYERS: usize = 1;
    const MAX_PLAYERS: usize = 8;

    fn status(core: &RoomCore, game: Option<&Self>) -> ServerMessage {
        let players = core
            .iter()
            .map(|m| {
                let progress = game.and_then(|g| g.progress.get(&m.id));
                WordPlayerEntry {
                    id: m.id,
                    username: m.username.clone(),
                    is_ready: m.ready,
                    is_host: core.is_host(m.id),
                    finished: progress.is_some_and(|p| p.finished),
                    attempt_count: progress.map_or(0, |p| p.attempts),
                    score: progress.map_or(0, |p| p.score),
                }
            })
            .collect();
        ServerMessage::RoomStatus(WordRoomStatus {
            code: core.code,
            mode: game.map_or(WordMode::Attempts, |g| g.mode),
            phase: core.phase,
            host_id: core.host,
            word_length: game.map_or(0, WordRound::word_len),
            players,
        })
    }

    fn launch(
        config: &WordConfig,
        core: &mut RoomCore,
        carry: &mut RecentWords,
        now: Instant,
        out: &mut Outbox,
    ) -> Self {
        let target = config.dictionary.draw(carry);
        carry.push(target.clone());

        core.phase = RoomPhase::Playing;
        let progress = core.iter().map(|m| (m.id, Progress::default())).collect();

        let mut timer = TickClock::stopped(TIMER_PERIOD);
        let ends_at = match config.mode {
            WordMode::Timed => {
                timer.start(now);
                Some(now + ROUND_TIME_LIMIT)
            }
            WordMode::Attempts => None,
        };

        let round = Self {
            mode: config.mode,
            target,
            started: now,
            progress,
            timer,
            ends_at,
            reset_at: Deadline::idle(),
        };

        tracing::info!(
            room_id = %core.code,
            mode = ?round.mode,
            word_length = round.word_len(),
            "round started"
        );
        out.broadcast(ServerMessage::GameStart {
            word_length: round.word_len(),
            first_letter: round.target.chars().next().unwrap_or('?'),
            mode: round.mode,
        });
        round
    }

    fn input(
        &mut self,
        core: &mut RoomCore,
        sender: PlayerId,
        Guess(guess): Guess,
        now: Instant,
        out: &mut Outbox,
    ) {
        self.handle_guess(core, sender, guess, now, out);
    }

    fn deadline(&self) -> Option<Instant> {
        earliest([self.timer.deadline(), self.ends_at, self.reset_at.get()])
    }

    fn wake(&mut self, core: &mut RoomCore, now: Instant, out: &mut Outbox) {
        if self.reset_at.fire(now) {
            core.phase = RoomPhase::Waiting;
            core.clear_ready();
            return;
        }
        if core.phase != RoomPhase::Playing {
            return;
        }
        if self.ends_at.is_some_and(|at| now >= at) {
            self.end(RoundEndReason::Timeout, core, now, out);
            return;
        }
        if self.timer.fire(now) {
            out.broadcast(ServerMessage::TimerUpdate {
                remaining_ms: self.remaining_ms(now),
            });
        }
    }

    fn member_left(&mut self, core: &mut RoomCore, id: PlayerId, now: Instant, out: &mut Outbox) {
        self.progress.remove(&id);
        if core.phase == RoomPhase::Playing && !core.is_empty() {
            let all_done = core
                .iter()
                .all(|m| self.progress.get(&m.id).is_some_and(|p| p.finished));
            if all_done {
                self.end(RoundEndReason::Completed, core, now, out);
            }
        }
    }

    /// Replays the round opening and the member's own guesses so a
    /// reconnected client can redraw its board.
    fn rejoined(&mut self, core: &RoomCore, id: PlayerId, out: &mut Outbox) {
        let _ = core;
        out.to(
            id,
            ServerMessage::GameStart {
                word_length: self.word_len(),
                first_letter: self.target.chars().next().unwrap_or('?'),
                mode: self.mode,
            },
        );
        if let Some(progress) = self.progress.get(&id) {
            for (n, (guess, evaluation)) in progress.history.iter().enumerate() {
                out.to(
                    id,
                    ServerMessage::GuessResult {
                        guess: guess.clone(),
                        evaluation: evaluation.clone(),
                        attempt_number: n as u32 + 1,
                    },
                );
            }
        }
    }

    fn announce_join(core: &RoomCore, id: PlayerId, out: &mut Outbox) {
        let username = core.get(id).map(|m| m.username.clone()).unwrap_or_default();
        out.send(
            Recipient::AllExcept(id),
            ServerMessage::PlayerJoined {
                player_id: id,
                username,
            },
        );
    }

    fn announce_leave(_core: &RoomCore, id: PlayerId, username: &str, out: &mut Outbox) {
        out.broadcast(ServerMessage::PlayerLeft {
            player_id: id,
            username: username.to_string(),
        });
    }
}

// =========================================================================
// Tests
// =========================================================================

//! Timing primitives for room actors.
//!
//! Every timer in Parlor is owned by a room actor and expressed as a
//! deadline: the actor computes the earliest pending deadline before
//! each `tokio::select!`, sleeps until it (or until a command arrives),
//! then asks each timer whether it fired. Nothing here spawns tasks —
//! when the actor drops, so do its timers.
//!
//! Two shapes cover everything the game modes need:
//!
//! - [`TickClock`] — a repeating interval (simulation ticks, countdown
//!   seconds, timer-update broadcasts, consumable spawn checks). The
//!   interval can be retargeted mid-flight for pacing.
//! - [`Deadline`] — a one-shot (round time limit, post-round reset).
//!
//! Both work on [`tokio::time::Instant`] so tests under
//! `tokio::time::pause` stay deterministic, and both take `now` as an
//! argument rather than reading the clock themselves.

use std::time::Duration;

use tokio::time::Instant;

// ---------------------------------------------------------------------------
// TickClock
// ---------------------------------------------------------------------------

/// A repeating timer with a retargetable interval.
///
/// Created stopped; [`start`](Self::start) arms it. When a fire is
/// observed late (the actor was busy), the next fire is scheduled from
/// now rather than from the missed deadline — skipping ahead instead of
/// bursting to catch up.
#[derive(Debug, Clone)]
pub struct TickClock {
    interval: Duration,
    next: Option<Instant>,
}

impl TickClock {
    /// A stopped clock with the given interval.
    pub fn stopped(interval: Duration) -> Self {
        Self {
            interval,
            next: None,
        }
    }

    /// Arms the clock; first fire one interval from `now`, plus up to
    /// 2 ms of jitter so rooms created together don't tick in lockstep.
    pub fn start(&mut self, now: Instant) {
        use rand::Rng;
        let jitter = Duration::from_micros(rand::rng().random_range(0..2_000));
        self.next = Some(now + self.interval + jitter);
    }

    /// Disarms the clock.
    pub fn stop(&mut self) {
        self.next = None;
    }

    pub fn is_running(&self) -> bool {
        self.next.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Changes the interval. A running clock re-arms from `now` — the
    /// arena uses this for pacing, where the new cadence should apply
    /// immediately.
    pub fn set_interval(&mut self, now: Instant, interval: Duration) {
        if interval == self.interval {
            return;
        }
        tracing::debug!(
            old_ms = self.interval.as_millis() as u64,
            new_ms = interval.as_millis() as u64,
            "tick interval retargeted"
        );
        self.interval = interval;
        if self.next.is_some() {
            self.next = Some(now + interval);
        }
    }

    /// The next fire instant, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.next
    }

    /// Observes the clock at `now`. Returns `true` at most once per
    /// interval; on overrun the schedule skips forward from `now`.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.next {
            Some(next) if now >= next => {
                self.next = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Deadline
// ---------------------------------------------------------------------------

/// A one-shot timer. Fires once, then disarms itself.
#[derive(Debug, Clone, Default)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// An unarmed deadline.
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, at: Instant) {
        self.at = Some(at);
    }

    pub fn arm_in(&mut self, now: Instant, after: Duration) {
        self.at = Some(now + after);
    }

    pub fn clear(&mut self) {
        self.at = None;
    }

    pub fn is_armed(&self) -> bool {
        self.at.is_some()
    }

    pub fn get(&self) -> Option<Instant> {
        self.at
    }

    /// Observes the deadline at `now`; firing clears it.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.at {
            Some(at) if now >= at => {
                self.at = None;
                true
            }
            _ => false,
        }
    }
}

/// The earliest of a set of optional deadlines.
///
/// Modes combine their clocks with this to answer "when do I next need
/// waking?" — `None` means the actor can sleep until the next command.
pub fn earliest<I>(deadlines: I) -> Option<Instant>
where
    I: IntoIterator<Item = Option<Instant>>,
{
    deadlines.into_iter().flatten().min()
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(80);

    #[tokio::test(start_paused = true)]
    async fn test_tick_clock_stopped_never_fires() {
        let mut clock = TickClock::stopped(TICK);
        assert!(!clock.is_running());
        assert_eq!(clock.deadline(), None);
        assert!(!clock.fire(Instant::now() + Duration::from_secs(10)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_clock_fires_after_interval() {
        let now = Instant::now();
        let mut clock = TickClock::stopped(TICK);
        clock.start(now);

        assert!(!clock.fire(now), "must not fire immediately");
        // Jitter is at most 2 ms, so one interval + 2 ms is always due.
        assert!(clock.fire(now + TICK + Duration::from_millis(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_clock_fires_once_per_interval() {
        let now = Instant::now();
        let mut clock = TickClock::stopped(TICK);
        clock.start(now);

        let t = now + TICK + Duration::from_millis(2);
        assert!(clock.fire(t));
        assert!(!clock.fire(t), "second observation at same instant");
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_clock_overrun_reschedules_from_now() {
        let now = Instant::now();
        let mut clock = TickClock::stopped(TICK);
        clock.start(now);

        // Observe very late: 5 intervals behind.
        let late = now + TICK * 6;
        assert!(clock.fire(late));
        // No burst: the next fire is a full interval after the late one.
        assert!(!clock.fire(late + TICK / 2));
        assert!(clock.fire(late + TICK));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_clock_set_interval_rearms_running_clock() {
        let now = Instant::now();
        let mut clock = TickClock::stopped(TICK);
        clock.start(now);

        let retarget_at = now + Duration::from_millis(10);
        clock.set_interval(retarget_at, Duration::from_millis(50));

        assert_eq!(clock.interval(), Duration::from_millis(50));
        // Old 80 ms deadline is gone; new one is 50 ms from retarget.
        assert!(!clock.fire(retarget_at + Duration::from_millis(40)));
        assert!(clock.fire(retarget_at + Duration::from_millis(50)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_clock_set_interval_keeps_stopped_clock_stopped() {
        let mut clock = TickClock::stopped(TICK);
        clock.set_interval(Instant::now(), Duration::from_millis(50));
        assert!(!clock.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires_once_then_disarms() {
        let now = Instant::now();
        let mut d = Deadline::idle();
        d.arm_in(now, Duration::from_secs(2));

        assert!(!d.fire(now + Duration::from_secs(1)));
        assert!(d.fire(now + Duration::from_secs(2)));
        assert!(!d.is_armed());
        assert!(!d.fire(now + Duration::from_secs(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_clear_disarms() {
        let now = Instant::now();
        let mut d = Deadline::idle();
        d.arm_in(now, Duration::from_secs(1));
        d.clear();
        assert!(!d.fire(now + Duration::from_secs(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_earliest_picks_minimum_and_skips_none() {
        let now = Instant::now();
        let a = Some(now + Duration::from_secs(3));
        let b = Some(now + Duration::from_secs(1));
        assert_eq!(earliest([a, None, b]), b);
        assert_eq!(earliest([None, None]), None);
    }
}

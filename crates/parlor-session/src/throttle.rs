//! Per-source connection throttle.
//!
//! Counts connection attempts per IP over a rolling window; a source
//! that exceeds the cap is banned for a fixed duration and its sockets
//! are closed with a policy status code by the accept loop.
//!
//! Not thread-safe on its own — the server owns one behind a mutex,
//! checked once per accepted connection (cheap enough that a plain
//! `HashMap` + `VecDeque` is fine).

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::time::Duration;

use tokio::time::Instant;

/// Throttle limits.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Attempts allowed per source within `window`.
    pub max_attempts: usize,
    /// Rolling window length.
    pub window: Duration,
    /// How long an offending source stays banned.
    pub ban: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            window: Duration::from_secs(60),
            ban: Duration::from_secs(120),
        }
    }
}

/// Outcome of a throttle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Granted,
    /// The source is banned until the given instant.
    Banned { until: Instant },
}

/// Rolling-window attempt counter with temporary bans.
#[derive(Debug)]
pub struct Throttle {
    config: ThrottleConfig,
    attempts: HashMap<IpAddr, VecDeque<Instant>>,
    bans: HashMap<IpAddr, Instant>,
}

impl Throttle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            attempts: HashMap::new(),
            bans: HashMap::new(),
        }
    }

    /// Records a connection attempt from `ip` at `now` and decides
    /// whether to admit it.
    pub fn check(&mut self, ip: IpAddr, now: Instant) -> Admission {
        if let Some(&until) = self.bans.get(&ip) {
            if now < until {
                return Admission::Banned { until };
            }
            self.bans.remove(&ip);
            self.attempts.remove(&ip);
        }

        let window = self.config.window;
        let hits = self.attempts.entry(ip).or_default();
        hits.push_back(now);
        while hits
            .front()
            .is_some_and(|&t| now.duration_since(t) > window)
        {
            hits.pop_front();
        }

        if hits.len() > self.config.max_attempts {
            let until = now + self.config.ban;
            self.bans.insert(ip, until);
            self.attempts.remove(&ip);
            tracing::warn!(%ip, ban_secs = self.config.ban.as_secs(), "source banned");
            return Admission::Banned { until };
        }

        Admission::Granted
    }

    /// Drops stale per-source state. Called opportunistically by the
    /// accept loop; correctness doesn't depend on it.
    pub fn prune(&mut self, now: Instant) {
        self.bans.retain(|_, &mut until| now < until);
        let window = self.config.window;
        self.attempts.retain(|_, hits| {
            while hits
                .front()
                .is_some_and(|&t| now.duration_since(t) > window)
            {
                hits.pop_front();
            }
            !hits.is_empty()
        });
    }
}

// =========================================================================
// Tests
// =========================================================================

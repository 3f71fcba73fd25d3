//! # Adaptive Rate Limiter
//!
//! Tracks two exponentially decaying intensities per client identity:
//! requests and client-attributable errors. An event adds 1 to its
//! counter; between events the counter decays with a configurable
//! half-life, so a client's score is always
//! `sum over events of exp(-lambda * age)` with `lambda = ln 2 / H`.
//!
//! The decision table, with error intensity `e` and threshold `T`:
//!
//! | Condition           | Action            |
//! |---------------------|-------------------|
//! | ban still active    | `Ban`             |
//! | `e > T`             | start ban, `Ban`  |
//! | `e > T/2`           | `RaiseDifficulty` |
//! | otherwise           | `Allow`           |
//!
//! Decay is computed lazily from the stored timestamps on every read and
//! update, all under one lock, so there is exactly one decay formula and
//! no background pass can double-decay a counter. The janitor's only job
//! is evicting records that are idle past a deadline and no longer banned.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::info;

/// What the server should do with an incoming connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAction {
    /// Serve normally.
    Allow,
    /// Serve, but with one extra difficulty level.
    RaiseDifficulty,
    /// Refuse and tell the client it is banned.
    Ban,
}

/// Limiter tuning.
#[derive(Debug, Clone)]
pub struct LimiterConfig {
    /// Half-life of both intensity counters.
    pub half_life: Duration,
    /// Error intensity above which a client is banned.
    pub ban_threshold: f64,
    /// How long a ban lasts once issued.
    pub ban_duration: Duration,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            half_life: Duration::from_secs(60),
            ban_threshold: 10.0,
            ban_duration: Duration::from_secs(60),
        }
    }
}

/// Per-client record.
///
/// `last_seen` and `last_error` only move forward; counters are
/// non-negative by construction.
#[derive(Debug, Clone)]
struct ClientInfo {
    request_count: f64,
    error_count: f64,
    last_seen: Instant,
    last_error: Instant,
    banned_until: Option<Instant>,
}

impl ClientInfo {
    fn new(now: Instant) -> Self {
        Self {
            request_count: 0.0,
            error_count: 0.0,
            last_seen: now,
            last_error: now,
            banned_until: None,
        }
    }
}

/// Tracks request and error intensities per client and decides how each
/// new connection is treated.
///
/// All operations share one lock and none performs I/O under it. The
/// clock is injectable so decay arithmetic can be tested without
/// sleeping.
pub struct RateLimiter {
    clients: Mutex<HashMap<String, ClientInfo>>,
    decay_rate: f64,
    config: LimiterConfig,
    clock: Box<dyn Fn() -> Instant + Send + Sync>,
}

impl RateLimiter {
    /// Create a limiter on the system clock.
    pub fn new(config: LimiterConfig) -> Self {
        Self::with_clock(config, Instant::now)
    }

    /// Create with a custom time source (for testing).
    pub fn with_clock<F>(config: LimiterConfig, clock: F) -> Self
    where
        F: Fn() -> Instant + Send + Sync + 'static,
    {
        let decay_rate = std::f64::consts::LN_2 / config.half_life.as_secs_f64();
        Self {
            clients: Mutex::new(HashMap::new()),
            decay_rate,
            config,
            clock: Box::new(clock),
        }
    }

    /// Decide how to treat a client before serving it.
    ///
    /// May start a ban; an already active ban is never shortened or
    /// extended here.
    pub fn classify(&self, client_id: &str) -> ClientAction {
        let now = (self.clock)();
        let mut clients = self.clients.lock();
        let Some(info) = clients.get_mut(client_id) else {
            return ClientAction::Allow;
        };

        if info.banned_until.is_some_and(|until| until > now) {
            return ClientAction::Ban;
        }

        let error_count = self.decayed(info.error_count, info.last_error, now);
        if error_count > self.config.ban_threshold {
            let until = now + self.config.ban_duration;
            info.banned_until = Some(until);
            info!(client = %client_id, error_count, "client banned for sustained errors");
            ClientAction::Ban
        } else if error_count > self.config.ban_threshold / 2.0 {
            ClientAction::RaiseDifficulty
        } else {
            ClientAction::Allow
        }
    }

    /// Record a new connection; returns the updated request intensity.
    pub fn on_request(&self, client_id: &str) -> f64 {
        let now = (self.clock)();
        let mut clients = self.clients.lock();
        let info = clients
            .entry(client_id.to_string())
            .or_insert_with(|| ClientInfo::new(now));

        info.request_count = self.decayed(info.request_count, info.last_seen, now) + 1.0;
        info.last_seen = now;
        info.request_count
    }

    /// Record a client-attributable failure; returns the updated error
    /// intensity.
    pub fn on_error(&self, client_id: &str) -> f64 {
        let now = (self.clock)();
        let mut clients = self.clients.lock();
        let info = clients
            .entry(client_id.to_string())
            .or_insert_with(|| ClientInfo::new(now));

        info.error_count = self.decayed(info.error_count, info.last_error, now) + 1.0;
        info.last_error = now;
        info.error_count
    }

    /// Evict records idle for longer than `inactive_for` whose bans have
    /// expired. Returns how many records were removed.
    pub fn cleanup(&self, inactive_for: Duration) -> usize {
        let now = (self.clock)();
        let mut clients = self.clients.lock();
        let before = clients.len();
        clients.retain(|_, info| {
            let idle = now.saturating_duration_since(info.last_seen) > inactive_for;
            let ban_active = info.banned_until.is_some_and(|until| until > now);
            !idle || ban_active
        });
        before - clients.len()
    }

    /// Number of client records currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.clients.lock().len()
    }

    fn decayed(&self, value: f64, since: Instant, now: Instant) -> f64 {
        let dt = now.saturating_duration_since(since).as_secs_f64();
        value * (-self.decay_rate * dt).exp()
    }
}

//! Server configuration.
//!
//! Defaults carry the reference deployment constants; every field can be
//! overridden, which is what the integration tests do to compress
//! timelines.

use std::time::Duration;

use quotegate_limiter::LimiterConfig;

/// Complete server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP bind address. A bare `":8000"` form binds all interfaces.
    pub addr: String,
    /// Rate limiter tuning (half-life, ban threshold, ban duration).
    pub limiter: LimiterConfig,
    /// Deadline for the challenge/solution exchange on one connection.
    pub exchange_timeout: Duration,
    /// Cooperative delay before closing a banned client's connection,
    /// intended to slow down retry loops.
    pub ban_delay: Duration,
    /// How often the janitor evicts stale limiter records.
    pub cleanup_interval: Duration,
    /// Idle age beyond which an unbanned client record is evicted.
    pub inactive_eviction: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: ":8000".to_string(),
            limiter: LimiterConfig::default(),
            exchange_timeout: Duration::from_secs(10),
            ban_delay: Duration::from_secs(5),
            cleanup_interval: Duration::from_secs(5 * 60),
            inactive_eviction: Duration::from_secs(10 * 60),
        }
    }
}

/// Normalize a bind address: a leading `:` means "all interfaces".
pub(crate) fn normalize_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}

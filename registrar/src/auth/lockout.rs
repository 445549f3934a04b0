//! Failed-login lockout
//!
//! Counts wrong passwords per account in process memory. Reaching
//! `max_attempts` failures inside `window_secs` locks the account for
//! `lockout_duration_secs`, during which even the right password is
//! rejected. A successful login clears the counter.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::auth::config::LockoutConfig;
use crate::error::{Error, Result};

/// Lockout state of one identity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockoutStatus {
    pub locked: bool,
    /// Failures in the current window
    pub attempt_count: u32,
    /// Seconds until the lock lifts (0 if not locked)
    pub lockout_remaining_secs: u64,
}

#[derive(Debug, Clone, Copy)]
struct Attempts {
    count: u32,
    window_start: Instant,
    locked_until: Option<Instant>,
}

impl Attempts {
    /// `None` once the lock or the counting window has run out
    fn live(self, now: Instant, window: Duration) -> Option<Self> {
        match self.locked_until {
            Some(until) => (until > now).then_some(self),
            None => (now.duration_since(self.window_start) < window).then_some(self),
        }
    }

    fn status(self, now: Instant) -> LockoutStatus {
        let remaining = self
            .locked_until
            .map_or(Duration::ZERO, |until| until.saturating_duration_since(now));
        LockoutStatus {
            locked: !remaining.is_zero(),
            attempt_count: self.count,
            lockout_remaining_secs: remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0),
        }
    }
}

/// Per-identity failure counter shared by every clone
#[derive(Debug, Clone)]
pub struct LoginLockout {
    config: LockoutConfig,
    attempts: Arc<Mutex<HashMap<String, Attempts>>>,
}

impl LoginLockout {
    /// # Errors
    ///
    /// [`Error::Config`] when the settings fail [`LockoutConfig::validate`].
    pub fn new(config: LockoutConfig) -> Result<Self> {
        config.validate().map_err(|message| {
            Error::Config(Box::new(figment::Error::from(format!(
                "Invalid lockout configuration: {}",
                message
            ))))
        })?;
        Ok(Self {
            config,
            attempts: Arc::default(),
        })
    }

    /// A lockout that never locks
    pub fn disabled() -> Self {
        Self {
            config: LockoutConfig {
                enabled: false,
                ..LockoutConfig::default()
            },
            attempts: Arc::default(),
        }
    }

    /// Current state of `identity` without recording anything
    pub async fn check(&self, identity: &str) -> LockoutStatus {
        if !self.config.enabled {
            return LockoutStatus::default();
        }

        let now = Instant::now();
        let mut attempts = self.attempts.lock().await;
        match attempts
            .get(identity)
            .copied()
            .and_then(|entry| entry.live(now, self.window()))
        {
            Some(entry) => entry.status(now),
            None => {
                attempts.remove(identity);
                LockoutStatus::default()
            }
        }
    }

    /// Count one wrong password, locking the identity at the threshold
    pub async fn record_failure(&self, identity: &str) -> LockoutStatus {
        if !self.config.enabled {
            return LockoutStatus::default();
        }

        let now = Instant::now();
        let mut attempts = self.attempts.lock().await;
        let mut entry = attempts
            .get(identity)
            .copied()
            .and_then(|entry| entry.live(now, self.window()))
            .unwrap_or(Attempts {
                count: 0,
                window_start: now,
                locked_until: None,
            });

        entry.count = entry.count.saturating_add(1);
        debug!(
            identity,
            attempt_count = entry.count,
            max_attempts = self.config.max_attempts,
            "Login failure recorded"
        );

        if entry.count >= self.config.max_attempts && entry.locked_until.is_none() {
            entry.locked_until = Some(now + Duration::from_secs(self.config.lockout_duration_secs));
            warn!(
                identity,
                attempt_count = entry.count,
                lockout_duration_secs = self.config.lockout_duration_secs,
                "Account locked due to repeated login failures"
            );
        }

        attempts.insert(identity.to_string(), entry);
        entry.status(now)
    }

    /// Clear all state for `identity` after a successful login
    pub async fn record_success(&self, identity: &str) {
        if !self.config.enabled {
            return;
        }
        if self.attempts.lock().await.remove(identity).is_some() {
            info!(identity, "Login failures cleared");
        }
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.config.window_secs)
    }
}

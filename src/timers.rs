//! Three cooperative one-shot timers (§4.4): tick, Powerlink watchdog, and
//! download-retry backoff.
//!
//! No timer wheel or async runtime: each timer is a plain deadline the
//! caller compares against its own clock on every tick, per §9's design
//! note that three independent one-shot timers are the simplest faithful
//! model. There is no background thread.

use std::time::{Duration, Instant};

/// ~100 ms tick interval (§4.4).
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);
/// Idle period before a keep-alive + status poll is enqueued (§4.4, §5).
pub const KEEPALIVE_IDLE: Duration = Duration::from_secs(20);
/// Default Powerlink watchdog period (§4.4, configurable).
pub const DEFAULT_WATCHDOG_PERIOD: Duration = Duration::from_secs(60);

/// A resettable one-shot deadline.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    period: Duration,
    expires_at: Option<Instant>,
}

impl Deadline {
    pub fn new(period: Duration) -> Self {
        Deadline { period, expires_at: None }
    }

    /// Arm (or re-arm) the timer starting from `now`.
    pub fn reset(&mut self, now: Instant) {
        self.expires_at = Some(now + self.period);
    }

    /// Disarm the timer.
    pub fn cancel(&mut self) {
        self.expires_at = None;
    }

    pub fn is_armed(&self) -> bool {
        self.expires_at.is_some()
    }

    /// Has the deadline passed? Does not consume/reset it — the caller
    /// decides what "expiry" means (restart with the same period, or a
    /// caller-supplied one for backoff).
    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(at) if now >= at)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn set_period(&mut self, period: Duration) {
        self.period = period;
    }
}

/// The tick counter driving keep-alive/status polling (§4.4).
#[derive(Debug, Clone)]
pub struct Tick {
    deadline: Deadline,
    elapsed_since_keepalive: Duration,
}

impl Tick {
    pub fn new() -> Self {
        Tick { deadline: Deadline::new(TICK_INTERVAL), elapsed_since_keepalive: Duration::ZERO }
    }

    pub fn start(&mut self, now: Instant) {
        self.deadline.reset(now);
    }

    /// Call on every scheduler tick. Returns `true` once the idle threshold
    /// has been crossed (caller should enqueue keep-alive + status and this
    /// resets the counter), then re-arms.
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.deadline.is_expired(now) {
            return false;
        }
        self.elapsed_since_keepalive += self.deadline.period();
        self.deadline.reset(now);
        if self.elapsed_since_keepalive >= KEEPALIVE_IDLE {
            self.elapsed_since_keepalive = Duration::ZERO;
            return true;
        }
        false
    }
}

impl Default for Tick {
    fn default() -> Self {
        Self::new()
    }
}

/// Powerlink watchdog (§4.4): reset by any received keep-alive, expiry
/// means "panel has gone quiet" and the caller should clear the queue and
/// enqueue a Restore.
#[derive(Debug, Clone)]
pub struct Watchdog {
    deadline: Deadline,
}

impl Watchdog {
    pub fn new(period: Duration) -> Self {
        Watchdog { deadline: Deadline::new(period) }
    }

    pub fn arm(&mut self, now: Instant) {
        self.deadline.reset(now);
    }

    pub fn poll_expired(&mut self, now: Instant) -> bool {
        if self.deadline.is_expired(now) {
            self.deadline.reset(now);
            true
        } else {
            false
        }
    }
}

/// Download-retry backoff (§4.4): armed with the panel-supplied delay when
/// a Download-Retry (0x25) message is received.
#[derive(Debug, Clone, Default)]
pub struct DownloadBackoff {
    deadline: Option<Deadline>,
}

impl DownloadBackoff {
    pub fn new() -> Self {
        DownloadBackoff { deadline: None }
    }

    pub fn arm(&mut self, now: Instant, delay: Duration) {
        let mut d = Deadline::new(delay);
        d.reset(now);
        self.deadline = Some(d);
    }

    pub fn poll_expired(&mut self, now: Instant) -> bool {
        match &self.deadline {
            Some(d) if d.is_expired(now) => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_expires_only_after_its_period() {
        let mut d = Deadline::new(Duration::from_millis(100));
        let t0 = Instant::now();
        d.reset(t0);
        assert!(!d.is_expired(t0));
        assert!(!d.is_expired(t0 + Duration::from_millis(50)));
        assert!(d.is_expired(t0 + Duration::from_millis(150)));
    }

    #[test]
    fn tick_fires_keepalive_after_idle_threshold() {
        let mut tick = Tick::new();
        let t0 = Instant::now();
        tick.start(t0);
        let mut fired = false;
        let mut now = t0;
        for _ in 0..250 {
            now += TICK_INTERVAL;
            if tick.poll(now) {
                fired = true;
                break;
            }
        }
        assert!(fired);
    }

    #[test]
    fn watchdog_reports_exactly_one_expiry_per_period() {
        let mut wd = Watchdog::new(Duration::from_secs(60));
        let t0 = Instant::now();
        wd.arm(t0);
        assert!(!wd.poll_expired(t0 + Duration::from_secs(30)));
        assert!(wd.poll_expired(t0 + Duration::from_secs(61)));
        assert!(!wd.poll_expired(t0 + Duration::from_secs(61)));
    }

    #[test]
    fn backoff_uses_panel_supplied_delay() {
        let mut backoff = DownloadBackoff::new();
        let t0 = Instant::now();
        backoff.arm(t0, Duration::from_secs(5));
        assert!(!backoff.poll_expired(t0 + Duration::from_secs(3)));
        assert!(backoff.poll_expired(t0 + Duration::from_secs(6)));
        assert!(!backoff.is_armed());
    }
}

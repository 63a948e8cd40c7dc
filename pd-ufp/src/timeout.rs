use crate::{Duration, Instant};

/// One-shot deadline against a caller-supplied monotonic clock.
pub struct Timeout {
    expiry: Option<Instant>,
}

impl Timeout {
    /// Create a new unarmed timeout
    pub const fn new() -> Self {
        Self { expiry: None }
    }

    /// Create a timeout armed some duration in the future
    pub fn new_start(now: Instant, duration: Duration) -> Self {
        let mut timeout = Self::new();
        timeout.start(now, duration);
        timeout
    }

    /// Arm a timeout some duration in the future
    pub fn start(&mut self, now: Instant, duration: Duration) {
        self.expiry = now.checked_add_duration(duration);
    }

    /// Cancel a timeout
    pub fn cancel(&mut self) {
        self.expiry = None;
    }

    /// Whether the timeout is armed and has not yet fired
    pub fn is_armed(&self) -> bool {
        self.expiry.is_some()
    }

    /// Test whether the timeout has expired, disarming it if so
    pub fn is_expired(&mut self, now: Instant) -> bool {
        let Some(expiry) = self.expiry else {
            return false;
        };

        let expired = expiry <= now;

        if expired {
            self.cancel();
        }

        expired
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fugit::ExtU64;

    #[test]
    fn expiry_disarms() {
        let t0 = Instant::from_ticks(0);
        let mut timeout = Timeout::new_start(t0, 100.millis());

        assert!(timeout.is_armed());
        assert!(!timeout.is_expired(t0 + 99.millis()));
        assert!(timeout.is_expired(t0 + 100.millis()));

        // fired once, stays quiet until re-armed
        assert!(!timeout.is_armed());
        assert!(!timeout.is_expired(t0 + 500.millis()));
    }

    #[test]
    fn unarmed_never_expires() {
        let mut timeout = Timeout::new();
        assert!(!timeout.is_expired(Instant::from_ticks(u64::MAX)));
    }
}

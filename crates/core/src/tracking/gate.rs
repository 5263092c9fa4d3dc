//! Capture trigger gate
//!
//! The UI timer ticks much faster than the sampling policy allows; the gate
//! decides whether enough time has elapsed since the last capture.

use chrono::{DateTime, Duration, Utc};

/// Elapsed-time gate for the capture trigger.
#[derive(Debug, Default)]
pub struct CaptureGate {
    last_fire: Option<DateTime<Utc>>,
}

impl CaptureGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true (and records the firing) when `interval` has elapsed
    /// since the previous firing. The first call always fires.
    pub fn should_fire(&mut self, now: DateTime<Utc>, interval: Duration) -> bool {
        let due = match self.last_fire {
            None => true,
            Some(last) => now - last >= interval,
        };
        if due {
            self.last_fire = Some(now);
        }
        due
    }

    /// Forget the last firing so the next tick captures immediately.
    pub fn reset(&mut self) {
        self.last_fire = None;
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn first_tick_always_fires() {
        let mut gate = CaptureGate::new();
        assert!(gate.should_fire(at(0), Duration::minutes(1)));
    }

    #[test]
    fn fires_only_after_interval_elapses() {
        let mut gate = CaptureGate::new();
        let interval = Duration::minutes(1);

        assert!(gate.should_fire(at(0), interval));
        assert!(!gate.should_fire(at(30), interval));
        assert!(!gate.should_fire(at(59), interval));
        assert!(gate.should_fire(at(60), interval));
        assert!(!gate.should_fire(at(61), interval));
    }

    #[test]
    fn reset_rearms_the_gate() {
        let mut gate = CaptureGate::new();
        assert!(gate.should_fire(at(0), Duration::minutes(5)));
        gate.reset();
        assert!(gate.should_fire(at(1), Duration::minutes(5)));
    }
}

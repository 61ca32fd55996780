use std::fmt;
use std::time::{Duration, Instant};

/// Monotonic time source. Injected so the estimator is deterministic in tests.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Process clock, used everywhere outside tests.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Running-average ETA for a bounded sequential batch.
///
/// Construction starts the clock. Call `update()` exactly once per completed
/// step; the remaining time is the observed average cost per step projected
/// across the steps not yet completed. One estimator serves one phase of a
/// job and exactly one sequential caller.
pub struct EtaEstimator {
    cumulative: Duration,
    remaining: Duration,
    done: u64,
    total: u64,
    tick: Instant,
    clock: Box<dyn Clock>,
}

impl EtaEstimator {
    pub fn new(total: u64) -> Result<Self, EtaError> {
        Self::with_clock(total, Box::new(SystemClock))
    }

    pub fn with_clock(total: u64, clock: Box<dyn Clock>) -> Result<Self, EtaError> {
        if total == 0 {
            return Err(EtaError::ZeroTotal);
        }
        let tick = clock.now();
        Ok(Self {
            cumulative: Duration::ZERO,
            remaining: Duration::ZERO,
            done: 0,
            total,
            tick,
            clock,
        })
    }

    /// Record one completed step and recompute the projection.
    ///
    /// Updating past the configured total would drive the projection negative;
    /// that is a caller logic error, not a clamp.
    pub fn update(&mut self) -> Result<(), EtaError> {
        if self.done >= self.total {
            return Err(EtaError::Overrun { total: self.total });
        }
        let now = self.clock.now();
        self.cumulative += now.duration_since(self.tick);
        self.tick = now;
        self.done += 1;
        let per_step = self.cumulative.as_secs_f64() / self.done as f64;
        self.remaining = Duration::from_secs_f64(per_step * (self.total - self.done) as f64);
        Ok(())
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn completed(&self) -> u64 {
        self.done
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

impl fmt::Display for EtaEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_duration(self.remaining))
    }
}

/// Render a duration as `[D ]H:MM:SS` by floor division at each level.
/// The days component is omitted when zero; hours are never zero-padded.
pub fn format_duration(duration: Duration) -> String {
    let mut secs = duration.as_secs();
    let days = secs / 86_400;
    secs %= 86_400;
    let hours = secs / 3_600;
    secs %= 3_600;
    let minutes = secs / 60;
    let seconds = secs % 60;
    if days > 0 {
        format!("{days} {hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours}:{minutes:02}:{seconds:02}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EtaError {
    #[error("estimator total must be at least 1")]
    ZeroTotal,
    #[error("estimator updated more than its configured total of {total} steps")]
    Overrun { total: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Clock that returns a fixed base instant plus a manually advanced offset.
    struct ManualClock {
        base: Instant,
        offset: Rc<Cell<Duration>>,
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.base + self.offset.get()
        }
    }

    fn manual_estimator(total: u64) -> (EtaEstimator, Rc<Cell<Duration>>) {
        let offset = Rc::new(Cell::new(Duration::ZERO));
        let clock = ManualClock {
            base: Instant::now(),
            offset: Rc::clone(&offset),
        };
        let eta = EtaEstimator::with_clock(total, Box::new(clock)).unwrap();
        (eta, offset)
    }

    #[test]
    fn zero_total_rejected() {
        assert!(matches!(EtaEstimator::new(0), Err(EtaError::ZeroTotal)));
    }

    #[test]
    fn projects_average_cost_across_remaining_steps() {
        let (mut eta, offset) = manual_estimator(4);

        // First step takes 2s: remaining = 2s * 3
        offset.set(Duration::from_secs(2));
        eta.update().unwrap();
        assert_eq!(eta.completed(), 1);
        assert_eq!(eta.remaining(), Duration::from_secs(6));

        // Second step takes 4s: average 3s, remaining = 3s * 2
        offset.set(Duration::from_secs(6));
        eta.update().unwrap();
        assert_eq!(eta.remaining(), Duration::from_secs(6));
    }

    #[test]
    fn remaining_is_zero_after_all_steps() {
        let (mut eta, offset) = manual_estimator(3);
        for step in 1..=3u64 {
            offset.set(Duration::from_secs(step * 5));
            eta.update().unwrap();
        }
        assert_eq!(eta.completed(), 3);
        assert!(eta.remaining().as_secs_f64().abs() < 1e-9);
    }

    #[test]
    fn update_past_total_is_an_error() {
        let (mut eta, offset) = manual_estimator(1);
        offset.set(Duration::from_secs(1));
        eta.update().unwrap();
        assert!(matches!(eta.update(), Err(EtaError::Overrun { total: 1 })));
        // The overrun must not have advanced the counter.
        assert_eq!(eta.completed(), 1);
    }

    #[test]
    fn estimate_can_rise_between_updates() {
        let (mut eta, offset) = manual_estimator(10);
        offset.set(Duration::from_secs(1));
        eta.update().unwrap();
        let first = eta.remaining();
        // A much slower second step raises the projection.
        offset.set(Duration::from_secs(20));
        eta.update().unwrap();
        assert!(eta.remaining() > first);
    }

    #[test]
    fn display_uses_duration_formatting() {
        let (mut eta, offset) = manual_estimator(2);
        offset.set(Duration::from_secs(45));
        eta.update().unwrap();
        assert_eq!(eta.to_string(), "0:00:45");
    }

    #[test]
    fn format_with_days() {
        assert_eq!(
            format_duration(Duration::from_secs(90_061)),
            "1 1:01:01"
        );
    }

    #[test]
    fn format_without_days() {
        assert_eq!(format_duration(Duration::from_secs(3_661)), "1:01:01");
    }

    #[test]
    fn format_seconds_only() {
        assert_eq!(format_duration(Duration::from_secs(45)), "0:00:45");
    }

    #[test]
    fn format_truncates_fractional_seconds() {
        assert_eq!(
            format_duration(Duration::from_millis(45_900)),
            "0:00:45"
        );
    }
}

use web_time::{Duration, Instant};

/// Smoothed cost of the per-frame box and symmetry work.
pub struct TickTimer {
    /// Budget above which a tick counts as slow (zero = no budget).
    budget: Duration,
    /// Start of the tick in progress.
    started: Option<Instant>,
    /// Cost of the last finished tick.
    last: Duration,
    /// Smoothed tick cost in milliseconds.
    smoothed_ms: f64,
    /// Smoothing factor (lower = smoother, 0.0-1.0)
    smoothing: f64,
    /// Ticks that went over budget.
    slow_ticks: u64,
}

impl TickTimer {
    /// Timer flagging ticks slower than `budget_ms` (0 = never).
    #[must_use]
    pub fn new(budget_ms: f64) -> Self {
        Self {
            budget: Duration::from_secs_f64(budget_ms.max(0.0) / 1000.0),
            started: None,
            last: Duration::ZERO,
            smoothed_ms: 0.0,
            smoothing: 0.1,
            slow_ticks: 0,
        }
    }

    /// Call before the tick's work.
    pub fn begin(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Call after the tick's work. Returns the tick's cost, or zero if
    /// [`Self::begin`] was not called.
    pub fn end(&mut self) -> Duration {
        let Some(start) = self.started.take() else {
            return Duration::ZERO;
        };
        let elapsed = start.elapsed();
        self.last = elapsed;
        let ms = elapsed.as_secs_f64() * 1000.0;
        self.smoothed_ms = self.smoothed_ms * (1.0 - self.smoothing) + ms * self.smoothing;
        if !self.budget.is_zero() && elapsed > self.budget {
            self.slow_ticks += 1;
            log::debug!("slow tick: {ms:.2} ms");
        }
        elapsed
    }

    /// Cost of the last finished tick.
    #[must_use]
    pub fn last(&self) -> Duration {
        self.last
    }

    /// Smoothed tick cost in milliseconds.
    #[must_use]
    pub fn smoothed_ms(&self) -> f64 {
        self.smoothed_ms
    }

    /// Ticks that exceeded the budget.
    #[must_use]
    pub fn slow_ticks(&self) -> u64 {
        self.slow_ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_without_begin_is_free() {
        let mut t = TickTimer::new(0.0);
        assert_eq!(t.end(), Duration::ZERO);
        assert_eq!(t.smoothed_ms(), 0.0);
    }

    #[test]
    fn tiny_budget_counts_slow_ticks() {
        let mut t = TickTimer::new(1e-9);
        t.begin();
        std::thread::sleep(Duration::from_millis(2));
        let cost = t.end();
        assert!(cost >= Duration::from_millis(2));
        assert_eq!(t.last(), cost);
        assert_eq!(t.slow_ticks(), 1);
        assert!(t.smoothed_ms() > 0.0);
    }
}

//! Round clock, counted in ticks.

/// 3 minutes at 30 ticks per second.
pub const ROUND_TICKS: u32 = 5400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundTimer {
    remaining: u32,
    start: u32,
}

impl Default for RoundTimer {
    fn default() -> Self {
        Self::new(ROUND_TICKS)
    }
}

impl RoundTimer {
    pub fn new(start: u32) -> Self {
        Self {
            remaining: start,
            start,
        }
    }

    pub fn reset(&mut self) {
        self.remaining = self.start;
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_up(&self) -> bool {
        self.remaining == 0
    }

    /// Count down one tick and return what is left.
    pub fn tick(&mut self) -> u32 {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining
    }

    /// Time-extend bonus.
    pub fn extend(&mut self, ticks: u32) {
        self.remaining = self.remaining.saturating_add(ticks);
    }

    /// Remaining time as (minutes, seconds) at the given tick rate.
    pub fn clock(&self, ticks_per_sec: u32) -> (u32, u32) {
        let secs = self.remaining.div_ceil(ticks_per_sec.max(1));
        (secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_round_runs_out_at_zero() {
        let mut t = RoundTimer::default();
        let mut last = t.remaining();
        for _ in 0..ROUND_TICKS {
            let now = t.tick();
            assert_eq!(now + 1, last);
            last = now;
        }
        assert_eq!(t.remaining(), 0);
        assert!(t.is_up());
        // Stays at zero.
        assert_eq!(t.tick(), 0);
    }

    #[test]
    fn extend_adds_time() {
        let mut t = RoundTimer::new(10);
        t.extend(300);
        assert_eq!(t.remaining(), 310);
        t.reset();
        assert_eq!(t.remaining(), 10);
    }

    #[test]
    fn clock_rounds_up_partial_seconds() {
        assert_eq!(RoundTimer::new(5400).clock(30), (3, 0));
        assert_eq!(RoundTimer::new(5399).clock(30), (3, 0));
        assert_eq!(RoundTimer::new(31).clock(30), (0, 2));
        assert_eq!(RoundTimer::new(0).clock(30), (0, 0));
    }
}

//! Scoring and difficulty: clear awards, chain multiplier, time bonus, drop speed
//! and the kind pool.
//!
//! award = 50 × cleared blocks × chain. A clear whose size is a multiple of 5 adds
//! 300 ticks to the round clock. The first clear after each lock shortens the drop
//! interval by one tick, down to 5.

pub const POINTS_PER_BLOCK: u32 = 50;
pub const TIME_BONUS_TICKS: u32 = 300;
/// A clear of a multiple of this many blocks earns the time bonus.
pub const TIME_BONUS_EVERY: usize = 5;

pub const START_DROP_INTERVAL: u32 = 90;
pub const MIN_DROP_INTERVAL: u32 = 5;

/// Score thresholds for widening the kind pool.
const POOL_FIVE_ABOVE: u32 = 10_000;
const POOL_SIX_ABOVE: u32 = 20_000;

/// Everything a clear changes, computed from the values before the clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearOutcome {
    pub award: u32,
    pub score: u32,
    pub high_score: u32,
    pub high_score_updated: bool,
    pub time_bonus: u32,
    pub drop_interval: u32,
    pub chain: u32,
}

/// Apply one clear of `cleared` blocks at chain multiplier `chain`.
pub fn score_clear(
    cleared: usize,
    chain: u32,
    score: u32,
    high_score: u32,
    drop_interval: u32,
) -> ClearOutcome {
    let award = POINTS_PER_BLOCK
        .saturating_mul(cleared as u32)
        .saturating_mul(chain);
    let score = score.saturating_add(award);
    let high_score_updated = score > high_score;
    let time_bonus = if cleared > 0 && cleared % TIME_BONUS_EVERY == 0 {
        TIME_BONUS_TICKS
    } else {
        0
    };
    // Only the opening clear of a cascade speeds the game up.
    let drop_interval = if chain == 1 && drop_interval > MIN_DROP_INTERVAL {
        drop_interval - 1
    } else {
        drop_interval
    };
    ClearOutcome {
        award,
        score,
        high_score: high_score.max(score),
        high_score_updated,
        time_bonus,
        drop_interval,
        chain: chain.saturating_mul(2),
    }
}

/// Number of block kinds new pieces are drawn from.
pub fn kind_pool(score: u32) -> u8 {
    if score <= POOL_FIVE_ABOVE {
        4
    } else if score <= POOL_SIX_ABOVE {
        5
    } else {
        6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_blocks_at_chain_one() {
        let out = score_clear(3, 1, 0, 0, START_DROP_INTERVAL);
        assert_eq!(out.award, 150);
        assert_eq!(out.score, 150);
        assert_eq!(out.high_score, 150);
        assert!(out.high_score_updated);
        assert_eq!(out.time_bonus, 0);
        assert_eq!(out.chain, 2);
    }

    #[test]
    fn award_scales_with_size_and_chain() {
        for n in 1..=20 {
            for chain in [1, 2, 4, 8, 16] {
                let out = score_clear(n, chain, 1000, 0, 40);
                assert_eq!(out.award, 50 * n as u32 * chain);
                assert_eq!(out.score, 1000 + out.award);
            }
        }
    }

    #[test]
    fn time_bonus_only_on_multiples_of_five() {
        for n in 1..=25 {
            let bonus = score_clear(n, 1, 0, 0, 90).time_bonus;
            if n % 5 == 0 {
                assert_eq!(bonus, 300, "n = {n}");
            } else {
                assert_eq!(bonus, 0, "n = {n}");
            }
        }
    }

    #[test]
    fn high_score_kept_when_not_beaten() {
        let out = score_clear(3, 1, 0, 5000, 90);
        assert_eq!(out.high_score, 5000);
        assert!(!out.high_score_updated);
    }

    #[test]
    fn speedup_only_on_first_clear_after_lock() {
        assert_eq!(score_clear(3, 1, 0, 0, 90).drop_interval, 89);
        assert_eq!(score_clear(3, 2, 0, 0, 90).drop_interval, 90);
        assert_eq!(score_clear(3, 8, 0, 0, 90).drop_interval, 90);
    }

    #[test]
    fn drop_interval_floors_at_five() {
        let mut interval = START_DROP_INTERVAL;
        for _ in 0..200 {
            let next = score_clear(3, 1, 0, 0, interval).drop_interval;
            assert!(next <= interval);
            assert!(next >= MIN_DROP_INTERVAL);
            interval = next;
        }
        assert_eq!(interval, MIN_DROP_INTERVAL);
    }

    #[test]
    fn pool_widens_with_score() {
        assert_eq!(kind_pool(0), 4);
        assert_eq!(kind_pool(10_000), 4);
        assert_eq!(kind_pool(10_001), 5);
        assert_eq!(kind_pool(20_000), 5);
        assert_eq!(kind_pool(20_001), 6);
    }
}

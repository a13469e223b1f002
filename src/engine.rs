//! Puzzle state machine: falling piece, gravity settle, matching, clear animation,
//! round clock. One `tick` per frame; nothing here touches the terminal.

use crate::grid::Grid;
use crate::input::{InputSnapshot, Key, TapZone, fires};
use crate::piece::{ActivePiece, Direction, Fall};
use crate::scoring::{self, START_DROP_INTERVAL};
use crate::timer::RoundTimer;
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Falling ignores input for this many ticks so a key held from the previous
/// piece does not carry over.
pub const INPUT_DELAY_TICKS: u32 = 10;
/// Length of the clear animation.
pub const CLEAR_TICKS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Falling,
    Settling,
    Matching,
    Clearing,
    RoundOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundId {
    Match,
}

/// Requests for the front end, drained once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    Sound(SoundId),
    /// One per cleared cell.
    Effect { row: usize, col: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEnd {
    TimeUp,
    /// No room for the next piece.
    Blocked,
}

/// Per-round counters. `high_score` survives `Engine::start_round`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PuzzleRound {
    pub score: u32,
    pub high_score: u32,
    /// 1 after a lock, doubled by every clear of the cascade.
    pub chain: u32,
    pub drop_interval: u32,
    pub last_award: u32,
    pub last_time_bonus: u32,
    pub clear_elapsed: u32,
    pub blocks_cleared: u32,
    pub max_chain: u32,
}

impl PuzzleRound {
    fn new(high_score: u32) -> Self {
        Self {
            score: 0,
            high_score,
            chain: 1,
            drop_interval: START_DROP_INTERVAL,
            last_award: 0,
            last_time_bonus: 0,
            clear_elapsed: 0,
            blocks_cleared: 0,
            max_chain: 0,
        }
    }
}

#[derive(Debug)]
pub struct Engine {
    grid: Grid,
    piece: ActivePiece,
    round: PuzzleRound,
    timer: RoundTimer,
    phase: Phase,
    /// Ticks already spent in `phase`.
    phase_ticks: u32,
    end: Option<RoundEnd>,
    events: Vec<GameEvent>,
    rng: StdRng,
}

impl Engine {
    pub fn new(seed: u64) -> Self {
        info!("engine seeded with {seed}");
        let mut rng = StdRng::seed_from_u64(seed);
        let piece = ActivePiece::spawn(&mut rng, scoring::kind_pool(0));
        let mut engine = Self {
            grid: Grid::new(),
            piece,
            round: PuzzleRound::new(0),
            timer: RoundTimer::default(),
            phase: Phase::Falling,
            phase_ticks: 0,
            end: None,
            events: Vec::new(),
            rng,
        };
        engine.begin_round();
        engine
    }

    /// Empty grid, fresh piece, full clock. Keeps the high score.
    pub fn start_round(&mut self) {
        self.grid.reset();
        self.round = PuzzleRound::new(self.round.high_score);
        self.timer.reset();
        self.piece = ActivePiece::spawn(&mut self.rng, scoring::kind_pool(0));
        self.begin_round();
    }

    fn begin_round(&mut self) {
        self.phase = Phase::Falling;
        self.phase_ticks = 0;
        self.end = None;
        self.events.clear();
        info!(
            "round start: {} ticks, high score {}",
            self.timer.remaining(),
            self.round.high_score
        );
    }

    /// Advance one frame. Returns the remaining round ticks; 0 means the round is
    /// over and the caller should leave play.
    pub fn tick(&mut self, input: &InputSnapshot) -> u32 {
        if self.phase == Phase::RoundOver {
            return 0;
        }

        let next = match self.phase {
            Phase::Falling => self.fall(input),
            Phase::Settling => self.settle(),
            Phase::Matching => self.resolve_matches(),
            Phase::Clearing => self.animate_clear(),
            Phase::RoundOver => Phase::RoundOver,
        };
        self.enter(next);
        if next == Phase::RoundOver {
            return 0;
        }

        let left = self.timer.tick();
        if self.timer.is_up() {
            self.end = Some(RoundEnd::TimeUp);
            self.enter(Phase::RoundOver);
            info!("round over: time up, score {}", self.round.score);
        }
        left
    }

    fn enter(&mut self, next: Phase) {
        if next == self.phase {
            self.phase_ticks = self.phase_ticks.saturating_add(1);
        } else {
            self.phase = next;
            self.phase_ticks = 0;
        }
    }

    fn fall(&mut self, input: &InputSnapshot) -> Phase {
        let accepting = self.phase_ticks >= INPUT_DELAY_TICKS;
        if accepting {
            if fires(input.key(Key::Rotate)) || fires(input.zone(TapZone::Rotate)) {
                self.piece.rotate();
            }
            if fires(input.key(Key::Left)) || fires(input.zone(TapZone::MoveLeft)) {
                self.piece.shift(&self.grid, Direction::Left);
            }
            if fires(input.key(Key::Right)) || fires(input.zone(TapZone::MoveRight)) {
                self.piece.shift(&self.grid, Direction::Right);
            }
        }

        let forced = self.timer.remaining() % self.round.drop_interval == 0;
        let soft = accepting && (input.key(Key::Down) > 0 || input.zone(TapZone::SoftDrop) > 1);
        if !(forced || soft) {
            return Phase::Falling;
        }

        match self.piece.drop_or_lock(&mut self.grid) {
            Fall::Moved => Phase::Falling,
            Fall::Locked => {
                self.round.chain = 1;
                debug!(
                    "locked {:?} at row {} col {}",
                    self.piece.current, self.piece.anchor_row, self.piece.anchor_col
                );
                Phase::Settling
            }
        }
    }

    fn settle(&mut self) -> Phase {
        if self.grid.settle_step() {
            Phase::Settling
        } else {
            Phase::Matching
        }
    }

    fn resolve_matches(&mut self) -> Phase {
        let cleared = self.grid.mark_matches();
        if cleared > 0 {
            self.events.push(GameEvent::Sound(SoundId::Match));
            self.events.extend(
                self.grid
                    .marked_cells()
                    .map(|(row, col)| GameEvent::Effect { row, col }),
            );

            let round = &mut self.round;
            let outcome = scoring::score_clear(
                cleared,
                round.chain,
                round.score,
                round.high_score,
                round.drop_interval,
            );
            debug!(
                "cleared {cleared} at chain x{}: +{} (+{} ticks), drop every {}",
                round.chain, outcome.award, outcome.time_bonus, outcome.drop_interval
            );
            if outcome.high_score_updated {
                debug!("new high score {}", outcome.high_score);
            }
            round.max_chain = round.max_chain.max(round.chain);
            round.blocks_cleared = round.blocks_cleared.saturating_add(cleared as u32);
            round.score = outcome.score;
            round.high_score = outcome.high_score;
            round.last_award = outcome.award;
            round.last_time_bonus = outcome.time_bonus;
            round.drop_interval = outcome.drop_interval;
            round.chain = outcome.chain;
            round.clear_elapsed = 0;
            self.timer.extend(outcome.time_bonus);
            return Phase::Clearing;
        }

        self.piece.reset_anchor();
        if ActivePiece::spawn_blocked(&self.grid) {
            self.end = Some(RoundEnd::Blocked);
            info!("round over: stack reached the top, score {}", self.round.score);
            return Phase::RoundOver;
        }
        let pool = scoring::kind_pool(self.round.score);
        self.piece.advance(&mut self.rng, pool);
        Phase::Falling
    }

    fn animate_clear(&mut self) -> Phase {
        self.round.clear_elapsed += 1;
        if self.round.clear_elapsed < CLEAR_TICKS {
            return Phase::Clearing;
        }
        self.grid.clear_marked();
        Phase::Settling
    }

    /// Pending front-end requests, oldest first.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn piece(&self) -> &ActivePiece {
        &self.piece
    }

    /// The piece is only on the board while falling.
    pub fn piece_in_play(&self) -> bool {
        self.phase == Phase::Falling
    }

    pub fn round(&self) -> &PuzzleRound {
        &self.round
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn countdown(&self) -> u32 {
        self.timer.remaining()
    }

    pub fn clock(&self, ticks_per_sec: u32) -> (u32, u32) {
        self.timer.clock(ticks_per_sec)
    }

    pub fn round_end(&self) -> Option<RoundEnd> {
        self.end
    }

    #[cfg(test)]
    pub fn is_over(&self) -> bool {
        self.phase == Phase::RoundOver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Cell, COLS, EMPTY, MAX_KIND, ROWS, WALL};
    use crate::piece::{SPAWN_COL, SPAWN_ROW};
    use crate::scoring::MIN_DROP_INTERVAL;
    use crate::timer::ROUND_TICKS;

    const IDLE: InputSnapshot = InputSnapshot::new();

    fn engine() -> Engine {
        Engine::new(42)
    }

    fn force_phase(e: &mut Engine, phase: Phase) {
        e.phase = phase;
        e.phase_ticks = 0;
    }

    fn run_until(e: &mut Engine, input: &InputSnapshot, done: impl Fn(&Engine) -> bool) -> u32 {
        for n in 1..=500 {
            e.tick(input);
            if done(e) {
                return n;
            }
        }
        panic!("condition not reached, phase {:?}", e.phase);
    }

    /// Kinds laid out so that no three in a line are ever equal.
    fn no_match_kind(row: usize, col: usize) -> Cell {
        ((col + 2 * row) % 4) as Cell + 1
    }

    #[test]
    fn new_round_starts_falling_at_spawn() {
        let e = engine();
        assert_eq!(e.phase(), Phase::Falling);
        assert_eq!(e.countdown(), ROUND_TICKS);
        assert_eq!(e.round().chain, 1);
        assert_eq!(e.round().drop_interval, 90);
        assert_eq!((e.piece().anchor_row, e.piece().anchor_col), (SPAWN_ROW, SPAWN_COL));
        assert!(e.piece().current.iter().all(|&k| (1..=4).contains(&k)));
    }

    #[test]
    fn first_piece_is_the_first_draw_of_the_seed() {
        let mut rng = StdRng::seed_from_u64(42);
        let expected = ActivePiece::spawn(&mut rng, scoring::kind_pool(0));
        assert_eq!(engine().piece(), &expected);
    }

    #[test]
    fn horizontal_run_scores_150() {
        let mut e = engine();
        for col in 3..=5 {
            e.grid.set(5, col, 2);
        }
        e.round.chain = 1;
        force_phase(&mut e, Phase::Matching);

        e.tick(&IDLE);

        assert_eq!(e.phase(), Phase::Clearing);
        assert_eq!(e.round().last_award, 150);
        assert_eq!(e.round().score, 150);
        assert_eq!(e.round().high_score, 150);
        assert_eq!(e.round().chain, 2);
        assert_eq!(
            e.drain_events(),
            vec![
                GameEvent::Sound(SoundId::Match),
                GameEvent::Effect { row: 5, col: 3 },
                GameEvent::Effect { row: 5, col: 4 },
                GameEvent::Effect { row: 5, col: 5 },
            ]
        );
        assert!(e.drain_events().is_empty());
    }

    #[test]
    fn clear_animation_runs_twenty_ticks() {
        let mut e = engine();
        for row in 9..=11 {
            e.grid.set(row, 2, 3);
        }
        force_phase(&mut e, Phase::Matching);
        e.tick(&IDLE);
        for _ in 1..CLEAR_TICKS {
            e.tick(&IDLE);
            assert_eq!(e.phase(), Phase::Clearing);
            assert_eq!(e.grid().get(10, 2), 3);
        }
        e.tick(&IDLE);
        assert_eq!(e.phase(), Phase::Settling);
        assert!((9..=11).all(|r| e.grid().is_empty(r, 2)));
        assert_eq!(e.grid().marked_count(), 0);
    }

    #[test]
    fn five_block_clear_extends_the_clock() {
        let mut e = engine();
        for col in 1..=5 {
            e.grid.set(11, col, 1);
        }
        force_phase(&mut e, Phase::Matching);
        let before = e.countdown();
        e.tick(&IDLE);
        assert_eq!(e.round().last_time_bonus, 300);
        assert_eq!(e.countdown(), before + 300 - 1);
        assert_eq!(e.round().last_award, 250);
    }

    #[test]
    fn cascade_doubles_chain_and_lock_resets_it() {
        let mut e = engine();
        // Clearing the 2s drops the 1 at (10, 3) next to the two 1s on the floor.
        e.grid.set(11, 1, 1);
        e.grid.set(11, 2, 1);
        for col in 3..=5 {
            e.grid.set(11, col, 2);
        }
        e.grid.set(10, 3, 1);
        e.round.chain = 1;
        force_phase(&mut e, Phase::Matching);

        e.tick(&IDLE);
        assert_eq!(e.round().last_award, 150);
        assert_eq!(e.round().chain, 2);
        assert_eq!(e.round().drop_interval, 89);

        run_until(&mut e, &IDLE, |e| e.phase() == Phase::Settling);
        run_until(&mut e, &IDLE, |e| e.phase() == Phase::Clearing);
        assert_eq!(e.grid().get(11, 3), 1);
        assert_eq!(e.round().last_award, 300);
        assert_eq!(e.round().chain, 4);
        assert_eq!(e.round().drop_interval, 89);
        assert_eq!(e.round().max_chain, 2);

        run_until(&mut e, &IDLE, |e| e.phase() == Phase::Falling);
        assert_eq!(e.round().chain, 4);
        assert_eq!(e.round().score, 450);

        let down = IDLE.with_key(Key::Down, 1);
        run_until(&mut e, &down, |e| e.phase() != Phase::Falling);
        assert_eq!(e.phase(), Phase::Settling);
        assert_eq!(e.round().chain, 1);
    }

    #[test]
    fn blocked_spawn_ends_the_round_without_touching_the_grid() {
        let mut e = engine();
        for (col, kind) in (3..=5).zip([1, 2, 3]) {
            e.grid.set(1, col, kind);
        }
        force_phase(&mut e, Phase::Matching);
        let countdown = e.countdown();

        assert_eq!(e.tick(&IDLE), 0);
        assert_eq!(e.phase(), Phase::RoundOver);
        assert_eq!(e.round_end(), Some(RoundEnd::Blocked));

        let grid = e.grid().clone();
        for _ in 0..50 {
            assert_eq!(e.tick(&IDLE.with_key(Key::Down, 1)), 0);
        }
        assert_eq!(e.grid(), &grid);
        assert_eq!(e.countdown(), countdown);
    }

    #[test]
    fn full_round_without_clears_ends_at_zero() {
        let mut e = engine();
        let mut last = u32::MAX;
        for n in 1..=ROUND_TICKS {
            if e.phase() == Phase::Falling {
                let landing = (1..ROWS - 1)
                    .rev()
                    .find(|&row| e.grid().is_empty(row, SPAWN_COL))
                    .expect("column has room");
                e.piece.current = [3, 4, 5].map(|col| no_match_kind(landing, col));
            }
            last = e.tick(&IDLE);
            if n < ROUND_TICKS {
                assert!(last > 0, "round ended early at tick {n}");
            }
        }
        assert_eq!(last, 0);
        assert_eq!(e.countdown(), 0);
        assert_eq!(e.phase(), Phase::RoundOver);
        assert_eq!(e.round_end(), Some(RoundEnd::TimeUp));
        assert_eq!(e.round().score, 0);
        assert!(e.drain_events().is_empty());
        assert!(!e.grid().is_empty(11, SPAWN_COL));
    }

    #[test]
    fn input_waits_for_the_phase_to_settle_in() {
        let mut e = engine();
        let left = IDLE.with_key(Key::Left, 1);
        for _ in 0..INPUT_DELAY_TICKS {
            e.tick(&left);
            assert_eq!(e.piece().anchor_col, SPAWN_COL);
        }
        e.tick(&left);
        assert_eq!(e.piece().anchor_col, SPAWN_COL - 1);
    }

    #[test]
    fn held_rotate_repeats_after_four_ticks() {
        let mut e = engine();
        e.phase_ticks = INPUT_DELAY_TICKS;
        let mut expected = e.piece().current;
        for hold in 1..=6 {
            e.tick(&IDLE.with_key(Key::Rotate, hold));
        }
        // Holds 1, 5 and 6 fire.
        expected.rotate_right(3);
        assert_eq!(e.piece().current, expected);
    }

    #[test]
    fn soft_drop_zone_needs_more_than_one_tick() {
        let mut e = engine();
        e.phase_ticks = INPUT_DELAY_TICKS;
        e.timer = RoundTimer::new(ROUND_TICKS + 2);
        e.tick(&IDLE.with_zone(TapZone::SoftDrop, 1));
        assert_eq!(e.piece().anchor_row, SPAWN_ROW);
        e.tick(&IDLE.with_zone(TapZone::SoftDrop, 2));
        assert_eq!(e.piece().anchor_row, SPAWN_ROW + 1);
    }

    #[test]
    fn forced_drop_follows_the_drop_interval() {
        let mut e = engine();
        e.round.drop_interval = 10;
        e.timer = RoundTimer::new(101);
        e.tick(&IDLE);
        assert_eq!(e.piece().anchor_row, SPAWN_ROW);
        e.tick(&IDLE);
        assert_eq!(e.piece().anchor_row, SPAWN_ROW + 1);
        for _ in 0..9 {
            e.tick(&IDLE);
        }
        assert_eq!(e.piece().anchor_row, SPAWN_ROW + 1);
        e.tick(&IDLE);
        assert_eq!(e.piece().anchor_row, SPAWN_ROW + 2);
    }

    #[test]
    fn pool_follows_score_at_generation_time() {
        let mut e = engine();
        for (score, pool) in [(0, 4), (10_000, 4), (10_001, 5), (20_000, 5), (20_001, 6)] {
            let mut seen_top = false;
            for _ in 0..200 {
                e.grid.reset();
                e.round.score = score;
                force_phase(&mut e, Phase::Matching);
                e.tick(&IDLE);
                assert_eq!(e.phase(), Phase::Falling);
                let next = e.piece().next;
                assert!(next.iter().all(|&k| (1..=pool).contains(&k)), "{next:?}");
                seen_top |= next.contains(&pool);
            }
            assert!(seen_top, "kind {pool} never drawn at score {score}");
        }
    }

    #[test]
    fn start_round_keeps_only_the_high_score() {
        let mut e = engine();
        for col in 3..=5 {
            e.grid.set(11, col, 2);
        }
        force_phase(&mut e, Phase::Matching);
        e.tick(&IDLE);
        assert_eq!(e.round().high_score, 150);

        e.start_round();
        assert_eq!(e.round().high_score, 150);
        assert_eq!(e.round().score, 0);
        assert_eq!(e.round().chain, 1);
        assert_eq!(e.countdown(), ROUND_TICKS);
        assert_eq!(e.phase(), Phase::Falling);
        assert_eq!(e.grid(), &Grid::new());
        assert!(e.drain_events().is_empty());
    }

    #[test]
    fn invariants_hold_over_long_play() {
        let mut e = Engine::new(7);
        let mut interval = e.round().drop_interval;
        let mut prev_phase = e.phase();
        let mut prev_countdown = e.countdown();
        let keys = [Key::Left, Key::Right, Key::Rotate, Key::Down];
        for n in 0u32..30_000 {
            let key = keys[(n / 7 % 4) as usize];
            let input = IDLE.with_key(key, n % 9);
            e.tick(&input);

            for row in 0..ROWS {
                for col in 0..COLS {
                    let v = e.grid().get(row, col);
                    let edge = row == 0 || row == ROWS - 1 || col == 0 || col == COLS - 1;
                    assert_eq!(v == WALL, edge);
                    assert!((WALL..=MAX_KIND).contains(&v));
                    if e.grid().is_marked(row, col) {
                        assert!(v > EMPTY);
                    }
                }
            }

            let round = e.round();
            assert!(round.drop_interval <= interval);
            assert!(round.drop_interval >= MIN_DROP_INTERVAL);
            interval = round.drop_interval;
            if prev_phase == Phase::Falling && e.phase() == Phase::Settling {
                assert_eq!(round.chain, 1);
            }
            if e.phase() != Phase::RoundOver && prev_phase != Phase::Matching {
                assert_eq!(e.countdown() + 1, prev_countdown);
            }

            if e.is_over() {
                e.start_round();
                interval = e.round().drop_interval;
            }
            prev_phase = e.phase();
            prev_countdown = e.countdown();
            e.drain_events();
        }
    }
}

//! App: terminal init, main loop, fixed-rate ticks and screen flow.

use crate::GameConfig;
use crate::engine::{Engine, GameEvent, SoundId};
use crate::input::{Action, InputTracker, key_to_action};
use crate::theme::Theme;
use crate::ui::{self, CellEffect, View};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use log::{debug, info};
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use std::io::Write;
use std::time::{Duration, Instant};
use tachyonfx::Duration as TfxDuration;

/// Redraw at least this often while waiting for input.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Title,
    Playing,
    GameOver,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    engine: Engine,
    input: InputTracker,
    screen: Screen,
    paused: bool,
    /// Clear effects still running.
    effects: Vec<CellEffect>,
    last_tick: Instant,
    last_frame: Instant,
    title_shown_at: Instant,
    /// High score when the current round started.
    best_before_round: u32,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Self {
        let now = Instant::now();
        let mut app = Self {
            engine: Engine::new(config.seed),
            input: InputTracker::new(false),
            screen: Screen::Title,
            paused: false,
            effects: Vec::new(),
            last_tick: now,
            last_frame: now,
            title_shown_at: now,
            best_before_round: 0,
            config,
            theme,
        };
        if app.config.no_menu {
            app.start_game();
        }
        app
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{
                DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
                PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
            },
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
                supports_keyboard_enhancement,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        // Release events make held keys and tap zones count up properly.
        let enhanced = supports_keyboard_enhancement().unwrap_or(false);
        if enhanced {
            let _ = execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            );
        }
        self.input = InputTracker::new(enhanced);
        info!("terminal ready, release events: {enhanced}");

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        if enhanced {
            let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        }
        execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let tick_interval = Duration::from_secs_f64(1.0 / self.config.tick_rate.max(1.0));
        loop {
            let now = Instant::now();
            let delta_ms = now.duration_since(self.last_frame).as_millis() as u32;
            self.last_frame = now;

            let view = View {
                screen: self.screen,
                theme: &self.theme,
                paused: self.paused,
                no_animation: !self.config.animations,
                ticks_per_sec: self.ticks_per_sec(),
                title_shown_at: self.title_shown_at,
                new_record: self.engine.round().score > self.best_before_round,
            };
            let mut strip = Rect::default();
            terminal.draw(|f| {
                strip = ui::game_areas(f.area()).strip;
                ui::draw(
                    f,
                    &view,
                    &self.engine,
                    &mut self.effects,
                    TfxDuration::from_millis(delta_ms),
                    now,
                );
            })?;
            self.input.set_strip(strip);
            self.effects.retain(|e| !e.effect.done());

            if self.screen == Screen::Playing
                && !self.paused
                && self.last_tick.elapsed() >= tick_interval
            {
                self.last_tick = Instant::now();
                self.step()?;
            }

            let until_tick = tick_interval.saturating_sub(self.last_tick.elapsed());
            let timeout = FRAME_INTERVAL
                .min(until_tick)
                .saturating_sub(now.elapsed());

            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    let quit = match event::read()? {
                        Event::Key(key) => self.on_key(key),
                        Event::Mouse(mouse) => {
                            self.on_mouse(mouse);
                            false
                        }
                        _ => false,
                    };
                    if quit {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn ticks_per_sec(&self) -> u32 {
        (self.config.tick_rate.round() as u32).max(1)
    }

    /// One engine tick plus its outbound events.
    fn step(&mut self) -> Result<()> {
        let snapshot = self.input.sample();
        let remaining = self.engine.tick(&snapshot);
        for event in self.engine.drain_events() {
            match event {
                GameEvent::Sound(SoundId::Match) => {
                    if self.config.sound {
                        let mut out = std::io::stdout();
                        out.write_all(b"\x07")?;
                        out.flush()?;
                    }
                }
                GameEvent::Effect { row, col } => {
                    if self.config.animations {
                        self.effects.push(CellEffect::clear(row, col, &self.theme));
                    }
                }
            }
        }
        if remaining == 0 {
            let round = self.engine.round();
            info!(
                "round over ({:?}): score {}, {} blocks, best chain x{}",
                self.engine.round_end(),
                round.score,
                round.blocks_cleared,
                round.max_chain
            );
            self.set_screen(Screen::GameOver);
        }
        Ok(())
    }

    fn set_screen(&mut self, screen: Screen) {
        debug!("screen {:?} -> {:?}", self.screen, screen);
        self.screen = screen;
        self.paused = false;
        self.input.clear();
        if screen == Screen::Title {
            self.title_shown_at = Instant::now();
            self.effects.clear();
        }
    }

    fn start_game(&mut self) {
        self.best_before_round = self.engine.round().high_score;
        self.engine.start_round();
        self.effects.clear();
        self.last_tick = Instant::now();
        self.set_screen(Screen::Playing);
    }

    /// Handle a key. Returns true to quit.
    fn on_key(&mut self, key: KeyEvent) -> bool {
        let action = key_to_action(key);
        if key.kind != KeyEventKind::Release {
            match (self.screen, action) {
                (_, Action::Quit) => return true,
                (Screen::Title, Action::Start) => self.start_game(),
                (Screen::GameOver, Action::Start) => self.set_screen(Screen::Title),
                (Screen::Playing, Action::Pause) if key.kind == KeyEventKind::Press => {
                    self.paused = !self.paused;
                    self.input.clear();
                    self.last_tick = Instant::now();
                    debug!("paused: {}", self.paused);
                }
                _ => {}
            }
        }
        if self.screen == Screen::Playing && !self.paused {
            if let Some(held) = action.held_key() {
                self.input.on_key(held, key.kind);
            }
        }
        false
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        let click = mouse.kind == MouseEventKind::Down(MouseButton::Left);
        match self.screen {
            Screen::Title if click => self.start_game(),
            Screen::GameOver if click => self.set_screen(Screen::Title),
            Screen::Playing if !self.paused => self.input.on_mouse(mouse),
            _ => {}
        }
    }
}

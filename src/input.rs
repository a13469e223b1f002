//! Key bindings and the per-tick input sampler (hold counters for keys and tap zones).

use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::layout::{Position, Rect};

/// Holds longer than this many ticks auto-repeat.
pub const REPEAT_AFTER: u32 = 4;

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    Rotate,
    SoftDrop,
    Start,
    Pause,
    Quit,
    None,
}

impl Action {
    /// The logical key an action holds down while playing.
    pub fn held_key(self) -> Option<Key> {
        match self {
            Self::MoveLeft => Some(Key::Left),
            Self::MoveRight => Some(Key::Right),
            Self::SoftDrop => Some(Key::Down),
            Self::Rotate => Some(Key::Rotate),
            _ => None,
        }
    }
}

/// Map key event to action. Arrows and vim keys both work.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    match code {
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p' | 'P') => Action::Pause,
        KeyCode::Left | KeyCode::Char('h') => Action::MoveLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::MoveRight,
        KeyCode::Up | KeyCode::Char('k' | 'z' | 'x' | ' ') => Action::Rotate,
        KeyCode::Down | KeyCode::Char('j') => Action::SoftDrop,
        KeyCode::Enter => Action::Start,
        _ => Action::None,
    }
}

/// Logical keys with their own hold counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
    Down,
    Rotate,
}

impl Key {
    const fn index(self) -> usize {
        self as usize
    }
}

/// The four equal-width bands of the control strip, left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapZone {
    MoveLeft,
    SoftDrop,
    MoveRight,
    Rotate,
}

impl TapZone {
    pub const ALL: [Self; 4] = [Self::MoveLeft, Self::SoftDrop, Self::MoveRight, Self::Rotate];

    const fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::MoveLeft => "◀",
            Self::SoftDrop => "▼",
            Self::MoveRight => "▶",
            Self::Rotate => "⟳",
        }
    }

    /// Zone under `pos`, if `pos` is inside `strip`.
    pub fn at(strip: Rect, pos: Position) -> Option<Self> {
        if strip.width == 0 || !strip.contains(pos) {
            return None;
        }
        let band = usize::from(pos.x - strip.x) * Self::ALL.len() / usize::from(strip.width);
        Self::ALL.get(band).copied()
    }
}

/// True on the first held tick and on every tick of the auto-repeat window.
#[inline]
pub fn fires(hold_ticks: u32) -> bool {
    hold_ticks == 1 || hold_ticks > REPEAT_AFTER
}

/// Hold counters frozen at the start of a tick. 0 = released, 1 = just pressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    keys: [u32; 4],
    zones: [u32; 4],
}

impl InputSnapshot {
    pub const fn new() -> Self {
        Self {
            keys: [0; 4],
            zones: [0; 4],
        }
    }

    #[inline]
    pub fn key(&self, key: Key) -> u32 {
        self.keys[key.index()]
    }

    #[inline]
    pub fn zone(&self, zone: TapZone) -> u32 {
        self.zones[zone.index()]
    }

    #[cfg(test)]
    pub fn with_key(mut self, key: Key, hold_ticks: u32) -> Self {
        self.keys[key.index()] = hold_ticks;
        self
    }

    #[cfg(test)]
    pub fn with_zone(mut self, zone: TapZone, hold_ticks: u32) -> Self {
        self.zones[zone.index()] = hold_ticks;
        self
    }
}

/// Accumulates terminal events between ticks and turns them into hold counters.
#[derive(Debug, Clone, Default)]
pub struct InputTracker {
    held: [bool; 4],
    /// Pressed since the last sample; a press and release between two ticks still
    /// counts as one held tick.
    pressed: [bool; 4],
    keys: [u32; 4],
    /// Without release events from the terminal a press only lasts one sample.
    release_on_sample: bool,
    pointer: Option<Position>,
    strip: Rect,
    zones: [u32; 4],
}

impl InputTracker {
    pub fn new(release_events: bool) -> Self {
        Self {
            release_on_sample: !release_events,
            ..Self::default()
        }
    }

    /// Screen area of the tap-zone control strip.
    pub fn set_strip(&mut self, strip: Rect) {
        self.strip = strip;
    }

    pub fn on_key(&mut self, key: Key, kind: KeyEventKind) {
        let i = key.index();
        match kind {
            KeyEventKind::Press | KeyEventKind::Repeat => {
                self.held[i] = true;
                self.pressed[i] = true;
            }
            KeyEventKind::Release => self.held[i] = false,
        }
    }

    pub fn on_mouse(&mut self, event: MouseEvent) {
        let pos = Position::new(event.column, event.row);
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) | MouseEventKind::Drag(MouseButton::Left) => {
                self.pointer = Some(pos);
            }
            MouseEventKind::Up(MouseButton::Left) => self.pointer = None,
            _ => {}
        }
    }

    /// Drop all held state (screen change, pause).
    pub fn clear(&mut self) {
        let release_on_sample = self.release_on_sample;
        let strip = self.strip;
        *self = Self {
            release_on_sample,
            strip,
            ..Self::default()
        };
    }

    /// Advance every counter by one tick and freeze the result.
    pub fn sample(&mut self) -> InputSnapshot {
        for i in 0..self.keys.len() {
            let down = self.held[i] || self.pressed[i];
            self.keys[i] = if down { self.keys[i].saturating_add(1) } else { 0 };
            self.pressed[i] = false;
            if self.release_on_sample {
                self.held[i] = false;
            }
        }

        let zone = self.pointer.and_then(|pos| TapZone::at(self.strip, pos));
        for z in TapZone::ALL {
            let i = z.index();
            self.zones[i] = if zone == Some(z) {
                self.zones[i].saturating_add(1)
            } else {
                0
            };
        }

        InputSnapshot {
            keys: self.keys,
            zones: self.zones,
        }
    }
}

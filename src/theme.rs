//! Colours: block kinds, walls and text, optionally read from a btop-style theme
//! file (`theme[key]="#rrggbb"`).

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Theme {
    /// Block colours for kinds 1..=6.
    pub blocks: [Color; 6],
    pub bg: Color,
    pub wall: Color,
    pub text: Color,
    pub title: Color,
    /// Cleared cells blink in this colour.
    pub flash: Color,
    pub dim: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid colour {0:?}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark()
    }
}

const ONEDARK_BLOCKS: [Color; 6] = [
    Color::Rgb(0xE0, 0x6C, 0x75),
    Color::Rgb(0x61, 0xAF, 0xEF),
    Color::Rgb(0xE5, 0xC0, 0x7B),
    Color::Rgb(0x98, 0xC3, 0x79),
    Color::Rgb(0xC6, 0x78, 0xDD),
    Color::Rgb(0x56, 0xB6, 0xC2),
];

const HIGH_CONTRAST_BLOCKS: [Color; 6] = [
    Color::Rgb(0xFF, 0x00, 0x00),
    Color::Rgb(0x00, 0x88, 0xFF),
    Color::Rgb(0xFF, 0xFF, 0x00),
    Color::Rgb(0x00, 0xFF, 0x00),
    Color::Rgb(0xFF, 0x00, 0xFF),
    Color::Rgb(0x00, 0xFF, 0xFF),
];

/// Tol "bright" qualitative scheme.
const COLORBLIND_BLOCKS: [Color; 6] = [
    Color::Rgb(0xEE, 0x66, 0x77),
    Color::Rgb(0x44, 0x77, 0xAA),
    Color::Rgb(0xCC, 0xBB, 0x44),
    Color::Rgb(0x22, 0x88, 0x33),
    Color::Rgb(0xAA, 0x33, 0x77),
    Color::Rgb(0x66, 0xCC, 0xEE),
];

/// Theme keys read for each block kind, first match wins.
const BLOCK_KEYS: [&[&str]; 6] = [
    &["cpu_end", "temp_end"],
    &["cpu_box"],
    &["title", "cpu_mid"],
    &["mem_box", "cpu_start"],
    &["net_box"],
    &["hi_fg", "proc_misc"],
];

impl Theme {
    pub fn onedark() -> Self {
        Self {
            blocks: ONEDARK_BLOCKS,
            bg: Color::Rgb(0x28, 0x2C, 0x34),
            wall: Color::Rgb(0x5C, 0x63, 0x70),
            text: Color::Rgb(0xAB, 0xB2, 0xBF),
            title: Color::Rgb(0xE5, 0xC0, 0x7B),
            flash: Color::White,
            dim: Color::Rgb(0x3F, 0x44, 0x4F),
        }
    }

    /// Theme file when given and present, else One Dark; then the palette override.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => Self::from_entries(&parse_entries(&std::fs::read_to_string(p)?))?,
            _ => Self::onedark(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.blocks = HIGH_CONTRAST_BLOCKS;
                self.bg = Color::Black;
                self.wall = Color::Gray;
            }
            crate::Palette::Colorblind => self.blocks = COLORBLIND_BLOCKS,
        }
    }

    fn from_entries(entries: &HashMap<String, String>) -> Result<Self, ThemeError> {
        let lookup = |keys: &[&str]| -> Result<Option<Color>, ThemeError> {
            keys.iter()
                .find_map(|k| entries.get(*k))
                .map(|v| parse_hex(v))
                .transpose()
        };
        let mut theme = Self::onedark();
        for (slot, keys) in theme.blocks.iter_mut().zip(BLOCK_KEYS) {
            if let Some(c) = lookup(keys)? {
                *slot = c;
            }
        }
        let fields: [(&mut Color, &[&str]); 5] = [
            (&mut theme.bg, &["main_bg", "meter_bg"]),
            (&mut theme.wall, &["div_line"]),
            (&mut theme.text, &["main_fg"]),
            (&mut theme.title, &["title"]),
            (&mut theme.dim, &["inactive_fg"]),
        ];
        for (slot, keys) in fields {
            if let Some(c) = lookup(keys)? {
                *slot = c;
            }
        }
        Ok(theme)
    }

    /// Colour of a block kind (1..=6).
    #[inline]
    pub fn block(&self, kind: i8) -> Color {
        let i = usize::try_from(kind - 1).unwrap_or(0);
        self.blocks[i % self.blocks.len()]
    }
}

/// `theme[key]="value"` lines into a map. Comments and other lines are skipped.
fn parse_entries(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("theme[")?;
            let (key, rest) = rest.split_once(']')?;
            let (_, value) = rest.split_once('=')?;
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            (!value.is_empty()).then(|| (key.trim().to_owned(), value.to_owned()))
        })
        .collect()
}

/// "#RRGGBB" or "#RGB".
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let digits = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_owned());
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let rgb = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
    let [_, r, g, b] = match digits.len() {
        6 => rgb.to_be_bytes(),
        3 => {
            let nibble = |shift: u32| ((rgb >> shift) & 0xF) as u8 * 17;
            [0, nibble(8), nibble(4), nibble(0)]
        }
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}

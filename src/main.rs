//! tridrop: falling three-block matching puzzle with chains and a timed round.

mod app;
mod engine;
mod grid;
mod input;
mod logging;
mod piece;
mod scoring;
mod theme;
mod timer;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use log::{LevelFilter, info, warn};
use std::path::PathBuf;

/// Options derived from the CLI that the app loop needs.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Engine ticks per second; the round clock assumes 30.
    pub tick_rate: f64,
    pub seed: u64,
    pub sound: bool,
    pub animations: bool,
    pub no_menu: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = &args.log_file {
        logging::init(path, args.log_level)
            .with_context(|| format!("logging to {}", path.display()))?;
    }

    let theme = match theme::Theme::load(args.theme.as_deref(), args.palette) {
        Ok(theme) => theme,
        Err(e) => {
            warn!("theme not loaded, using default: {e}");
            let mut theme = theme::Theme::default();
            theme.apply_palette(args.palette);
            theme
        }
    };
    let config = GameConfig {
        tick_rate: args.tick_rate,
        seed: args.seed.unwrap_or_else(rand::random),
        sound: args.sound,
        animations: !args.no_animation,
        no_menu: args.no_menu,
    };
    info!("starting with {config:?}");

    let mut app = App::new(config, theme);
    app.run()?;
    Ok(())
}

/// Falling three-block matching puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "tridrop",
    version,
    about = "Falling three-block matching puzzle in the terminal. Line up three of a kind before time runs out.",
    long_about = "tridrop drops a row of three coloured blocks into a narrow well.\n\n\
        Move and rotate the row, then let it land. Three or more blocks of one colour in a \
        line (across, down or diagonally) vanish; blocks above fall and may match again for \
        a doubled chain. Clearing a multiple of five blocks at once adds ten seconds.\n\n\
        CONTROLS:\n  Left/Right or h/l   Move       Up, k, z, x, Space   Rotate\n  \
        Down or j           Drop       P                    Pause\n  \
        Enter / click       Start      Q / Esc              Quit\n\n\
        The strip under the well works with the mouse: hold a band to move, drop or rotate."
)]
pub struct Args {
    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Game logic ticks per second. The three-minute round is counted at 30.
    #[arg(long, default_value = "30.0", value_name = "RATE")]
    pub tick_rate: f64,

    /// Seed for the block sequence; random when not given.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Ring the terminal bell on every match.
    #[arg(long)]
    pub sound: bool,

    /// Blink cleared blocks instead of fading them out.
    #[arg(long)]
    pub no_animation: bool,

    /// Skip the title screen and start a round immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Write a log to this file (nothing is logged otherwise).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log level for --log-file: off, error, warn, info, debug, trace.
    #[arg(long, default_value = "info", value_name = "LEVEL")]
    pub log_level: LevelFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

//! Layout and drawing: title, playfield, control strip, sidebar, pause, game over,
//! and the per-cell clear effects.

use crate::app::Screen;
use crate::engine::{Engine, Phase, RoundEnd};
use crate::grid::{COLS, Cell, EMPTY, ROWS, WALL};
use crate::input::TapZone;
use crate::theme::Theme;
use crate::timer::ROUND_TICKS;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

/// Terminal columns per grid cell; two makes cells roughly square.
const CELL_WIDTH: u16 = 2;
/// Board including walls, plus the surrounding border.
const BOARD_WIDTH: u16 = COLS as u16 * CELL_WIDTH + 2;
const BOARD_HEIGHT: u16 = ROWS as u16 + 2;
const STRIP_HEIGHT: u16 = 3;
const SIDEBAR_WIDTH: u16 = 24;

/// Fade of a cleared cell, roughly the length of the clear phase.
const CLEAR_FADE_MS: u32 = 600;
/// Clearing cells alternate colour every this many ticks when effects are off.
const BLINK_TICKS: u32 = 3;
const TITLE_SLIDE_MS: u32 = 400;

/// A running effect on one grid cell.
pub struct CellEffect {
    pub row: usize,
    pub col: usize,
    pub effect: Effect,
}

impl CellEffect {
    pub fn clear(row: usize, col: usize, theme: &Theme) -> Self {
        let effect = fx::fade_to(theme.flash, theme.bg, (CLEAR_FADE_MS, Interpolation::QuadOut));
        Self { row, col, effect }
    }
}

/// Screen areas of the play screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameAreas {
    pub board: Rect,
    /// Inside the border: the 13×9 cells.
    pub cells: Rect,
    pub strip: Rect,
    pub sidebar: Rect,
}

/// Board and strip stacked on the left, sidebar on the right, all centred.
pub fn game_areas(area: Rect) -> GameAreas {
    let total_w = BOARD_WIDTH + SIDEBAR_WIDTH;
    let total_h = BOARD_HEIGHT + STRIP_HEIGHT;
    let x = area.x + area.width.saturating_sub(total_w) / 2;
    let y = area.y + area.height.saturating_sub(total_h) / 2;
    let board = Rect {
        x,
        y,
        width: BOARD_WIDTH.min(area.width),
        height: BOARD_HEIGHT.min(area.height),
    };
    let strip = Rect {
        x,
        y: board.bottom(),
        width: board.width,
        height: STRIP_HEIGHT.min(area.bottom().saturating_sub(board.bottom())),
    };
    let sidebar = Rect {
        x: board.right(),
        y,
        width: SIDEBAR_WIDTH.min(area.right().saturating_sub(board.right())),
        height: total_h.min(area.height),
    };
    let cells = Rect {
        x: board.x + 1,
        y: board.y + 1,
        width: board.width.saturating_sub(2),
        height: board.height.saturating_sub(2),
    };
    GameAreas {
        board,
        cells,
        strip,
        sidebar,
    }
}

/// Screen rect of grid cell (row, col), clipped to `cells`.
pub fn cell_rect(cells: Rect, row: usize, col: usize) -> Rect {
    Rect {
        x: cells.x + col as u16 * CELL_WIDTH,
        y: cells.y + row as u16,
        width: CELL_WIDTH,
        height: 1,
    }
    .intersection(cells)
}

/// Everything the frame needs beyond the engine.
pub struct View<'a> {
    pub screen: Screen,
    pub theme: &'a Theme,
    pub paused: bool,
    pub no_animation: bool,
    pub ticks_per_sec: u32,
    pub title_shown_at: Instant,
    pub new_record: bool,
}

pub fn draw(
    frame: &mut Frame,
    view: &View,
    engine: &Engine,
    effects: &mut [CellEffect],
    delta: TfxDuration,
    now: Instant,
) {
    let area = frame.area();
    Block::default()
        .style(Style::default().bg(view.theme.bg))
        .render(area, frame.buffer_mut());
    match view.screen {
        Screen::Title => draw_title(frame, view, engine, area, now),
        Screen::Playing => {
            draw_game(frame, view, engine, area);
            if !view.no_animation {
                // Fades hold still behind the pause popup.
                let delta = if view.paused { TfxDuration::ZERO } else { delta };
                let cells = game_areas(area).cells;
                for e in effects.iter_mut() {
                    let rect = cell_rect(cells, e.row, e.col);
                    frame.render_effect(&mut e.effect, rect, delta);
                }
            }
            if view.paused {
                draw_pause(frame, view.theme, area);
            }
        }
        Screen::GameOver => {
            draw_game(frame, view, engine, area);
            draw_game_over(frame, view, engine, area);
        }
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn popup_block(theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.wall).bg(theme.bg))
        .style(Style::default().bg(theme.bg))
}

fn draw_title(frame: &mut Frame, view: &View, engine: &Engine, area: Rect, now: Instant) {
    let theme = view.theme;
    let bold = Modifier::BOLD;
    let text = Style::default().fg(theme.text);
    let key = Style::default().fg(theme.block(6));

    let logo: Line = "TRIDROP"
        .chars()
        .enumerate()
        .map(|(i, c)| {
            Span::styled(
                format!("{c} "),
                Style::default().fg(theme.block(i as Cell % 6 + 1)).add_modifier(bold),
            )
        })
        .collect::<Vec<_>>()
        .into();

    let lines = vec![
        Line::from(""),
        logo,
        Line::from(""),
        Line::from(Span::styled("Line up three of a kind,", text)),
        Line::from(Span::styled("across, down or diagonally.", text)),
        Line::from(Span::styled("Cascades double the chain.", text)),
        Line::from(Span::styled("Clear 5, 10, ... at once: +10 sec", text)),
        Line::from(""),
        Line::from(vec![
            Span::styled(" ←→ ", key),
            Span::raw("MOVE  "),
            Span::styled(" ↑ ", key),
            Span::raw("ROTATE  "),
            Span::styled(" ↓ ", key),
            Span::raw("DROP"),
        ]),
        Line::from(Span::styled(
            "or hold the mouse on the strip",
            Style::default().fg(theme.dim),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("Best {}", engine.round().high_score),
            Style::default().fg(theme.title),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " [ ENTER / CLICK TO START ] ",
            Style::default().fg(Color::Black).bg(theme.title).add_modifier(bold),
        )),
        Line::from(""),
        Line::from(Span::styled(" Q  QUIT ", Style::default().fg(theme.block(1)))),
    ];

    // Slide up into place, ease-out cubic.
    let elapsed = now.saturating_duration_since(view.title_shown_at).as_millis() as u32;
    let t = (elapsed as f32 / TITLE_SLIDE_MS as f32).min(1.0);
    let offset = ((1.0 - (1.0 - (1.0 - t).powi(3))) * 8.0) as u16;

    let mut popup = centered(area, 40, lines.len() as u16 + 2);
    popup.y = popup.y.saturating_add(offset).min(area.bottom().saturating_sub(popup.height));
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(text)
        .block(popup_block(theme))
        .render(popup, frame.buffer_mut());
}

fn draw_game(frame: &mut Frame, view: &View, engine: &Engine, area: Rect) {
    let areas = game_areas(area);
    draw_board(frame, view, engine, areas);
    draw_strip(frame, view.theme, areas.strip);
    draw_sidebar(frame, view, engine, areas.sidebar);
}

fn draw_board(frame: &mut Frame, view: &View, engine: &Engine, areas: GameAreas) {
    let theme = view.theme;
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.dim).bg(theme.bg))
        .title(Span::styled(
            " tridrop ",
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        ))
        .render(areas.board, frame.buffer_mut());

    let grid = engine.grid();
    let piece = engine.piece();
    let blink = view.no_animation
        && engine.phase() == Phase::Clearing
        && (engine.round().clear_elapsed / BLINK_TICKS) % 2 == 0;
    let buf = frame.buffer_mut();

    for row in 0..ROWS {
        for col in 0..COLS {
            let mut value = grid.get(row, col);
            if engine.piece_in_play() && row == piece.anchor_row {
                if let Some(i) = piece.columns().iter().position(|&c| c == col) {
                    value = piece.current[i];
                }
            }
            let (symbol, style) = match value {
                WALL => ("▓▓", Style::default().fg(theme.wall).bg(theme.bg)),
                EMPTY => ("  ", Style::default().bg(theme.bg)),
                _ if blink && grid.is_marked(row, col) => {
                    ("██", Style::default().fg(theme.flash).bg(theme.bg))
                }
                kind => ("██", Style::default().fg(theme.block(kind)).bg(theme.bg)),
            };
            let rect = cell_rect(areas.cells, row, col);
            if rect.is_empty() {
                continue;
            }
            buf.set_stringn(rect.x, rect.y, symbol, rect.width as usize, style);
        }
    }
}

fn draw_strip(frame: &mut Frame, theme: &Theme, strip: Rect) {
    if strip.height == 0 {
        return;
    }
    let buf = frame.buffer_mut();
    let zones = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(strip);
    for (zone, rect) in TapZone::ALL.into_iter().zip(zones.iter()) {
        Paragraph::new(Line::from(zone.label()))
            .alignment(Alignment::Center)
            .style(Style::default().fg(theme.text).bg(theme.bg))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(theme.dim)),
            )
            .render(*rect, buf);
    }
}

fn sidebar_block<'a>(theme: &Theme, title: &'a str) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.dim).bg(theme.bg))
        .title(Span::styled(title, Style::default().fg(theme.title)))
}

fn draw_sidebar(frame: &mut Frame, view: &View, engine: &Engine, area: Rect) {
    let theme = view.theme;
    let round = engine.round();
    let label = Style::default().fg(theme.title);
    let value = Style::default().fg(theme.text);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Next
            Constraint::Length(4), // Time + gauge
            Constraint::Length(7), // Score, best, chain, speed, cleared
            Constraint::Min(0),
        ])
        .split(area);

    // --- Next ---
    let next_block = sidebar_block(theme, " Next ");
    let inner = next_block.inner(chunks[0]);
    next_block.render(chunks[0], frame.buffer_mut());
    let next: Vec<Span> = engine
        .piece()
        .next
        .iter()
        .map(|&k| Span::styled("██", Style::default().fg(theme.block(k))))
        .collect();
    Paragraph::new(Line::from(next))
        .alignment(Alignment::Center)
        .render(inner, frame.buffer_mut());

    // --- Time ---
    let time_block = sidebar_block(theme, " Time ");
    let inner = time_block.inner(chunks[1]);
    time_block.render(chunks[1], frame.buffer_mut());
    let (min, sec) = engine.clock(view.ticks_per_sec);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(inner);
    let mut clock = vec![Span::styled(format!("{min}:{sec:02}"), value)];
    if round.last_time_bonus > 0 && engine.phase() == Phase::Clearing {
        clock.push(Span::styled(
            format!("  +{}s", round.last_time_bonus / view.ticks_per_sec.max(1)),
            Style::default().fg(theme.block(4)),
        ));
    }
    Paragraph::new(Line::from(clock)).render(rows[0], frame.buffer_mut());
    let ratio = (f64::from(engine.countdown()) / f64::from(ROUND_TICKS)).min(1.0);
    let bar = if ratio > 0.5 {
        theme.block(4)
    } else if ratio > 0.2 {
        theme.block(3)
    } else {
        theme.block(1)
    };
    Gauge::default()
        .ratio(ratio)
        .label("")
        .gauge_style(Style::default().fg(bar).bg(theme.dim))
        .render(rows[1], frame.buffer_mut());

    // --- Stats ---
    let stats_block = sidebar_block(theme, " Stats ");
    let inner = stats_block.inner(chunks[2]);
    stats_block.render(chunks[2], frame.buffer_mut());
    let stat = |name: &'static str, v: String| {
        Line::from(vec![Span::styled(name, label), Span::styled(v, value)])
    };
    let mut award = round.last_award.to_string();
    if round.chain > 2 {
        award.push_str(&format!(" (x{})", round.chain / 2));
    }
    let lines = vec![
        stat("Score  ", round.score.to_string()),
        stat("Best   ", round.high_score.to_string()),
        stat("Last   ", award),
        stat("Blocks ", round.blocks_cleared.to_string()),
        stat("Drop   ", format!("every {} ticks", round.drop_interval)),
    ];
    Paragraph::new(lines).render(inner, frame.buffer_mut());
}

fn draw_pause(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(theme.title),
        )),
        Line::from(Span::styled(" P  Resume    Q  Quit ", Style::default().fg(theme.text))),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(popup_block(theme))
        .render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, view: &View, engine: &Engine, area: Rect) {
    let theme = view.theme;
    let round = engine.round();
    let text = Style::default().fg(theme.text);
    let title = match engine.round_end() {
        Some(RoundEnd::TimeUp) => " Time's up! ",
        _ => " Game Over ",
    };
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            title,
            Style::default().fg(Color::White).bg(theme.block(1)),
        )),
        Line::from(""),
        Line::from(Span::styled(format!("Score   {}", round.score), text)),
        Line::from(Span::styled(format!("Best    {}", round.high_score), text)),
        Line::from(Span::styled(format!("Blocks  {}", round.blocks_cleared), text)),
        Line::from(Span::styled(format!("Chain   x{}", round.max_chain), text)),
    ];
    if view.new_record {
        lines.push(Line::from(Span::styled(
            " New record! ",
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " ENTER / CLICK  Title    Q  Quit ",
        text,
    )));
    let popup = centered(area, 36, lines.len() as u16 + 2);
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(popup_block(theme))
        .render(popup, frame.buffer_mut());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_sit_inside_the_board_border() {
        let areas = game_areas(Rect::new(0, 0, 100, 40));
        assert_eq!(areas.cells.width, COLS as u16 * CELL_WIDTH);
        assert_eq!(areas.cells.height, ROWS as u16);
        assert_eq!(cell_rect(areas.cells, 0, 0).x, areas.board.x + 1);
        let last = cell_rect(areas.cells, ROWS - 1, COLS - 1);
        assert_eq!(last.right(), areas.cells.right());
        assert_eq!(last.bottom(), areas.cells.bottom());
    }

    #[test]
    fn strip_spans_the_board_below_it() {
        let areas = game_areas(Rect::new(0, 0, 100, 40));
        assert_eq!(areas.strip.y, areas.board.bottom());
        assert_eq!(areas.strip.width, areas.board.width);
        assert_eq!(areas.strip.height, STRIP_HEIGHT);
        assert_eq!(areas.sidebar.x, areas.board.right());
    }

    #[test]
    fn layout_survives_a_tiny_terminal() {
        let areas = game_areas(Rect::new(0, 0, 10, 5));
        assert!(areas.board.width <= 10);
        assert_eq!(areas.strip.height, 0);
        assert!(cell_rect(areas.cells, ROWS - 1, COLS - 1).is_empty());
    }

    fn render_with_effect(paused: bool, effects: &mut [CellEffect]) {
        let theme = Theme::default();
        let engine = Engine::new(1);
        let view = View {
            screen: Screen::Playing,
            theme: &theme,
            paused,
            no_animation: false,
            ticks_per_sec: 30,
            title_shown_at: Instant::now(),
            new_record: false,
        };
        let mut terminal = ratatui::Terminal::new(ratatui::backend::TestBackend::new(80, 30)).unwrap();
        terminal
            .draw(|f| {
                draw(
                    f,
                    &view,
                    &engine,
                    effects,
                    TfxDuration::from_millis(CLEAR_FADE_MS * 2),
                    Instant::now(),
                );
            })
            .unwrap();
    }

    #[test]
    fn clear_fade_holds_while_paused() {
        let theme = Theme::default();
        let mut effects = vec![CellEffect::clear(5, 4, &theme)];
        render_with_effect(true, &mut effects);
        assert!(!effects[0].effect.done());
        render_with_effect(false, &mut effects);
        assert!(effects[0].effect.done());
    }
}

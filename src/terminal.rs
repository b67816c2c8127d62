//! Terminal front-end: screen setup, event translation and presentation.
//!
//! Each terminal cell shows two stacked pixels using an upper half block,
//! so a `cols x rows` terminal is a `cols x 2*rows` framebuffer.

use crate::input::{InputEvent, Viewport};
use crate::render::Renderer;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
    MouseEvent, MouseEventKind,
};
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{execute, queue};
use std::io::{self, Write};

const UPPER_HALF_BLOCK: char = '\u{2580}';

/// Fallback when the terminal size cannot be queried
pub const DEFAULT_CELLS: (u16, u16) = (80, 24);

/// Keyboard commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    TogglePause,
    ToggleDebug,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Input(InputEvent),
    Command(Command),
}

/// Puts the terminal into raw, alternate-screen, mouse-reporting mode and
/// restores it when dropped.
///
/// The guard owns the output writer, so whatever is still buffered is
/// written before the alternate screen is left.
pub struct TerminalGuard<W: Write> {
    out: W,
}

impl<W: Write> TerminalGuard<W> {
    pub fn enter(out: W) -> io::Result<Self> {
        enable_raw_mode()?;
        let mut guard = Self { out };
        execute!(guard.out, EnterAlternateScreen, EnableMouseCapture, Hide)?;
        Ok(guard)
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.out
    }
}

impl<W: Write> Drop for TerminalGuard<W> {
    fn drop(&mut self) {
        let _ = execute!(self.out, ResetColor, Show, DisableMouseCapture, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

/// Current terminal size in cells
pub fn terminal_cells() -> (u16, u16) {
    let measured = termsize::get()
        .map(|size| (size.cols, size.rows))
        .filter(|&(cols, rows)| cols > 0 && rows > 0)
        .or_else(|| crossterm::terminal::size().ok());
    usable_cells(measured)
}

/// Some ptys report a zero dimension; fall back to the default then
fn usable_cells(measured: Option<(u16, u16)>) -> (u16, u16) {
    match measured {
        Some((cols, rows)) if cols > 0 && rows > 0 => (cols, rows),
        _ => DEFAULT_CELLS,
    }
}

/// Framebuffer size for a terminal of `cols x rows` cells
pub fn cells_to_viewport(cols: u16, rows: u16) -> Viewport {
    Viewport::new(cols as u32, rows as u32 * 2)
}

/// Center of a cell in framebuffer pixels
pub fn cell_to_pixel(column: u16, row: u16) -> (f64, f64) {
    (column as f64 + 0.5, row as f64 * 2.0 + 1.0)
}

/// Maps a terminal event onto an input message or a keyboard command
pub fn translate(event: &Event) -> Option<Action> {
    match event {
        Event::Mouse(MouseEvent {
            kind: MouseEventKind::Moved | MouseEventKind::Drag(_),
            column,
            row,
            ..
        }) => {
            let (x, y) = cell_to_pixel(*column, *row);
            Some(Action::Input(InputEvent::PointerMoved { x, y }))
        }
        Event::Resize(cols, rows) => {
            let viewport = cells_to_viewport(*cols, *rows);
            Some(Action::Input(InputEvent::Resized {
                width: viewport.width,
                height: viewport.height,
            }))
        }
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) => {
            let command = match code {
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Command::Quit,
                KeyCode::Char('q' | 'Q') | KeyCode::Esc => Command::Quit,
                KeyCode::Char('p' | 'P') => Command::TogglePause,
                KeyCode::Char('d' | 'D') => Command::ToggleDebug,
                KeyCode::Char('r' | 'R') => Command::Reset,
                _ => return None,
            };
            Some(Action::Command(command))
        }
        _ => None,
    }
}

fn rgb([r, g, b]: [u8; 3]) -> Color {
    Color::Rgb { r, g, b }
}

/// Writes the framebuffer and any text overlays, then flushes once
pub fn present<W: Write>(
    out: &mut W,
    renderer: &Renderer,
    overlay: &[String],
    banner: Option<&str>,
) -> io::Result<()> {
    let (width, height) = renderer.size();
    let rows = height / 2;

    let mut fg = None;
    let mut bg = None;
    for row in 0..rows {
        queue!(out, MoveTo(0, row as u16))?;
        for x in 0..width {
            let top = renderer.pixel(x, row * 2);
            let bottom = renderer.pixel(x, row * 2 + 1);
            if fg != Some(top) {
                queue!(out, SetForegroundColor(rgb(top)))?;
                fg = Some(top);
            }
            if bg != Some(bottom) {
                queue!(out, SetBackgroundColor(rgb(bottom)))?;
                bg = Some(bottom);
            }
            queue!(out, Print(UPPER_HALF_BLOCK))?;
        }
    }

    if !overlay.is_empty() || banner.is_some() {
        queue!(out, SetForegroundColor(Color::White), SetBackgroundColor(Color::Black))?;
    }
    for (i, line) in overlay.iter().enumerate().take(rows as usize) {
        let text: String = line.chars().take(width.saturating_sub(2) as usize).collect();
        queue!(out, MoveTo(1, i as u16), Print(text))?;
    }
    if let Some(text) = banner {
        let len = text.chars().count() as u32;
        let column = width.saturating_sub(len) / 2;
        queue!(out, MoveTo(column as u16, (rows / 2) as u16), Print(text))?;
    }

    queue!(out, ResetColor)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventState, MouseButton};

    fn key(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn test_translate_resize() {
        assert_eq!(
            translate(&Event::Resize(120, 40)),
            Some(Action::Input(InputEvent::Resized {
                width: 120,
                height: 80
            }))
        );
    }

    #[test]
    fn test_translate_mouse() {
        assert_eq!(
            translate(&mouse(MouseEventKind::Moved, 10, 3)),
            Some(Action::Input(InputEvent::PointerMoved { x: 10.5, y: 7.0 }))
        );
        assert!(translate(&mouse(MouseEventKind::Drag(MouseButton::Left), 0, 0)).is_some());
        assert_eq!(translate(&mouse(MouseEventKind::ScrollUp, 1, 1)), None);
    }

    #[test]
    fn test_translate_keys() {
        let none = KeyModifiers::NONE;
        assert_eq!(
            translate(&key(KeyCode::Char('q'), none)),
            Some(Action::Command(Command::Quit))
        );
        assert_eq!(
            translate(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Command(Command::Quit))
        );
        assert_eq!(
            translate(&key(KeyCode::Char('P'), KeyModifiers::SHIFT)),
            Some(Action::Command(Command::TogglePause))
        );
        assert_eq!(
            translate(&key(KeyCode::Char('d'), none)),
            Some(Action::Command(Command::ToggleDebug))
        );
        assert_eq!(translate(&key(KeyCode::Char('c'), none)), None);
    }

    #[test]
    fn test_middle_cell_is_viewport_center() {
        let viewport = cells_to_viewport(81, 25);
        let (x, y) = cell_to_pixel(40, 12);
        assert_eq!(x, viewport.width as f64 / 2.0);
        assert_eq!(y, viewport.height as f64 / 2.0);
    }

    #[test]
    fn test_present_writes_every_cell() {
        let renderer = Renderer::new(4, 4);
        let mut out = Vec::new();
        present(&mut out, &renderer, &[], None).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches(UPPER_HALF_BLOCK).count(), 8);
    }

    #[test]
    fn test_present_overlay_and_banner() {
        let renderer = Renderer::new(20, 10);
        let mut out = Vec::new();
        present(&mut out, &renderer, &["FPS: 60.00".to_string()], Some("Paused")).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("FPS: 60.00"));
        assert!(text.contains("Paused"));
    }

    #[test]
    fn test_zero_sized_terminal_uses_default() {
        assert_eq!(usable_cells(Some((0, 0))), DEFAULT_CELLS);
        assert_eq!(usable_cells(Some((120, 0))), DEFAULT_CELLS);
        assert_eq!(usable_cells(Some((0, 40))), DEFAULT_CELLS);
        assert_eq!(usable_cells(None), DEFAULT_CELLS);
        assert_eq!(usable_cells(Some((120, 40))), (120, 40));
    }

    #[test]
    fn test_guard_writes_pending_output_before_leaving() {
        let mut sink = Vec::new();
        {
            let mut guard = TerminalGuard {
                out: io::BufWriter::new(&mut sink),
            };
            let renderer = Renderer::new(2, 2);
            present(guard.writer(), &renderer, &[], None).unwrap();
            // left in the buffer, as when a frame fails halfway
            queue!(guard.writer(), Print("unflushed")).unwrap();
        }
        let text = String::from_utf8_lossy(&sink);
        let leave = text.find("\x1b[?1049l").unwrap();
        assert!(text.find("unflushed").unwrap() < leave);
        assert!(text.ends_with("\x1b[?1049l"));
    }
}

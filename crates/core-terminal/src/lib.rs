//! Terminal backend: crossterm implementation of the abstract renderer
//! plus an RAII guard restoring the terminal on every exit path.
//!
//! Raw mode also turns off XON/XOFF software flow control, so Ctrl+S/Ctrl+Q
//! reach the application as ordinary keys.

use std::io::{Stdout, Write, stdout};

use anyhow::Result;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{
        Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
    },
    terminal::{
        Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, SetTitle, disable_raw_mode,
        enable_raw_mode,
    },
};
use core_render::{PairId, RenderError, Renderer, Rgb, SharedColors};
use unicode_width::UnicodeWidthChar;

pub trait TerminalBackend {
    fn enter(&mut self) -> Result<()>;
    fn leave(&mut self) -> Result<()>;
    fn set_title(&mut self, title: &str) -> Result<()>;
}

pub struct CrosstermBackend {
    entered: bool,
}

/// RAII guard ensuring terminal state restoration even if the caller
/// early-returns or panics.
pub struct TerminalGuard<'a> {
    backend: &'a mut CrosstermBackend,
    active: bool,
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermBackend {
    pub fn new() -> Self {
        Self { entered: false }
    }

    /// Enter and return a guard that will leave on drop.
    pub fn enter_guard(&mut self) -> Result<TerminalGuard<'_>> {
        self.enter()?;
        Ok(TerminalGuard {
            backend: self,
            active: true,
        })
    }
}

impl TerminalBackend for CrosstermBackend {
    fn enter(&mut self) -> Result<()> {
        if !self.entered {
            enable_raw_mode()?;
            execute!(stdout(), EnterAlternateScreen, Hide, EnableMouseCapture)?;
            self.entered = true;
        }
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        if self.entered {
            execute!(stdout(), DisableMouseCapture, LeaveAlternateScreen, Show)?;
            disable_raw_mode()?;
            self.entered = false;
        }
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<()> {
        execute!(stdout(), SetTitle(title))?;
        Ok(())
    }
}

impl Drop for CrosstermBackend {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

impl Drop for TerminalGuard<'_> {
    fn drop(&mut self) {
        if self.active {
            let _ = self.backend.leave();
        }
    }
}

fn to_color(rgb: Option<Rgb>) -> Color {
    match rgb {
        Some(Rgb { r, g, b }) => Color::Rgb { r, g, b },
        None => Color::Reset,
    }
}

/// Crossterm-backed renderer. Output is queued and written on `flush`;
/// color pairs resolve through the shared registry.
pub struct CrosstermRenderer {
    out: Stdout,
    colors: SharedColors,
}

impl CrosstermRenderer {
    pub fn new(colors: SharedColors) -> Self {
        Self {
            out: stdout(),
            colors,
        }
    }

    fn apply_pair(&mut self, pair: PairId, bold: bool, inverse: bool) {
        let resolved = self.colors.borrow().get(pair);
        let _ = queue!(
            self.out,
            ResetColor,
            SetForegroundColor(to_color(resolved.fg)),
            SetBackgroundColor(to_color(resolved.bg)),
        );
        if bold {
            let _ = queue!(self.out, SetAttribute(Attribute::Bold));
        }
        if inverse {
            let _ = queue!(self.out, SetAttribute(Attribute::Reverse));
        }
    }
}

impl Renderer for CrosstermRenderer {
    fn size(&self) -> (i32, i32) {
        match crossterm::terminal::size() {
            Ok((cols, rows)) => (i32::from(rows), i32::from(cols)),
            Err(_) => (0, 0),
        }
    }

    fn clear(&mut self) {
        let _ = queue!(self.out, ResetColor, Clear(ClearType::All));
    }

    fn flush(&mut self) -> Result<(), RenderError> {
        self.out
            .flush()
            .map_err(|e| RenderError::Backend(e.to_string()))
    }

    fn put_text(&mut self, y: i32, x: i32, s: &str, max_w: i32, pair: PairId, bold: bool, inverse: bool) {
        if y < 0 || x < 0 {
            return;
        }
        let clipped: String = if max_w < 0 {
            s.to_string()
        } else {
            let mut out = String::new();
            let mut col = 0i32;
            for c in s.chars() {
                let w = c.width().unwrap_or(0) as i32;
                if col + w > max_w {
                    break;
                }
                out.push(c);
                col += w;
            }
            out
        };
        if clipped.is_empty() {
            return;
        }
        self.apply_pair(pair, bold, inverse);
        let _ = queue!(
            self.out,
            MoveTo(x as u16, y as u16),
            Print(clipped),
            SetAttribute(Attribute::Reset),
        );
    }

    fn put_glyph(&mut self, y: i32, x: i32, ch: char, pair: PairId) {
        if y < 0 || x < 0 {
            return;
        }
        self.apply_pair(pair, false, false);
        let _ = queue!(
            self.out,
            MoveTo(x as u16, y as u16),
            Print(ch),
            SetAttribute(Attribute::Reset),
        );
    }

    fn fill_rect(&mut self, y: i32, x: i32, h: i32, w: i32, pair: PairId) {
        if h <= 0 || w <= 0 || y < 0 || x < 0 {
            return;
        }
        self.apply_pair(pair, false, false);
        let blank = " ".repeat(w as usize);
        for row in y..y + h {
            let _ = queue!(self.out, MoveTo(x as u16, row as u16), Print(&blank));
        }
        let _ = queue!(self.out, SetAttribute(Attribute::Reset));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_maps_to_crossterm_truecolor() {
        assert_eq!(
            to_color(Some(Rgb { r: 1, g: 2, b: 3 })),
            Color::Rgb { r: 1, g: 2, b: 3 }
        );
        assert_eq!(to_color(None), Color::Reset);
    }

    #[test]
    fn backend_tracks_entered_state() {
        // Pure state check; no terminal is touched until enter().
        let b = CrosstermBackend::new();
        assert!(!b.entered);
    }
}

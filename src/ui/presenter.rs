//! Terminal presenter using crossterm
//!
//! Shows the console canvas in the host terminal. Each damaged row is read
//! back from the canvas one cell at a time: the background from the cell's
//! top-left pixel, the glyph from the baseline, and the cursor from the
//! inverted strip along the bottom. Below the grid come a status line in the
//! ownership colour and the chat pane.

use std::io::{self, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::{Attribute, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, Clear, ClearType, DisableLineWrap, EnableLineWrap, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use unicode_width::UnicodeWidthStr;

use crate::config::Color;
use crate::core::session::View;
use crate::ui::chat::{ChatKind, ChatLine};
use crate::ui::renderer::Renderer;
use crate::ui::surface::Canvas;

const STATUS_FG: Color = Color::new(0x20, 0x20, 0x20);
const CHAT_BG: Color = Color::new(0xff, 0xff, 0xff);
const CHAT_FG: Color = Color::new(0x00, 0x00, 0x00);
const ERROR_FG: Color = Color::new(0xd2, 0x00, 0x00);
const STATUS_TEXT_FG: Color = Color::new(0x60, 0x60, 0x60);

/// One cell as read back from the canvas
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextCell {
    pub text: String,
    pub fg: Color,
    pub bg: Color,
    pub cursor: bool,
}

/// Read row `row` of a `cols` wide grid back from `canvas`
pub fn sample_row(canvas: &Canvas, renderer: &Renderer, row: usize, cols: usize) -> Vec<TextCell> {
    let baseline = renderer.baseline(row);
    (0..cols)
        .map(|col| {
            let rect = renderer.cell_rect(col, row);
            let bg = canvas.pixel(rect.x, rect.y).unwrap_or(Color::new(0, 0, 0));
            let strip = canvas
                .pixel(rect.x, rect.y + rect.height.saturating_sub(1))
                .unwrap_or(bg);
            let (text, fg) = match canvas.glyph_at(rect.x, baseline) {
                Some(glyph) => (glyph.text.clone(), glyph.color),
                None => (" ".to_string(), bg),
            };
            TextCell {
                text,
                fg,
                bg,
                cursor: strip != bg,
            }
        })
        .collect()
}

/// Text for one terminal column; anything not exactly one column wide is
/// replaced so the grid stays aligned.
fn printable(text: &str) -> &str {
    if text.width() == 1 && !text.chars().any(char::is_control) {
        text
    } else {
        " "
    }
}

/// Bottom-of-screen state owned by the main loop
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Overlay {
    /// Status line text
    pub status: String,
    /// Chat message being typed, if in chat entry mode
    pub input: Option<String>,
}

pub struct Presenter {
    initialized: bool,
    last_overlay: Option<Overlay>,
    waiting_shown: bool,
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Presenter {
    pub fn new() -> Self {
        Self {
            initialized: false,
            last_overlay: None,
            waiting_shown: false,
        }
    }

    /// Initialize the terminal for rendering
    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(
            stdout,
            EnterAlternateScreen,
            DisableLineWrap,
            Hide,
            Clear(ClearType::All),
            MoveTo(0, 0)
        )?;
        self.initialized = true;
        Ok(())
    }

    /// Restore the terminal
    pub fn cleanup(&mut self) -> io::Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;

        let mut stdout = io::stdout();
        let _ = execute!(stdout, ResetColor, SetAttribute(Attribute::Reset));
        let _ = execute!(stdout, Show, EnableLineWrap, LeaveAlternateScreen);
        let _ = stdout.flush();
        terminal::disable_raw_mode()?;
        println!();
        Ok(())
    }

    /// Shown until the settings reply arrives
    pub fn render_waiting(&mut self, server: &str) -> io::Result<()> {
        if self.waiting_shown {
            return Ok(());
        }
        self.waiting_shown = true;
        let stdout = io::stdout();
        let mut stdout = io::BufWriter::new(stdout.lock());
        queue!(
            stdout,
            ResetColor,
            Clear(ClearType::All),
            MoveTo(0, 0),
            Print(format!("Connecting to {}...", server))
        )?;
        stdout.flush()
    }

    /// Present whatever changed since the last call
    pub fn render(&mut self, view: &mut View<Canvas>, overlay: &Overlay) -> io::Result<()> {
        let damage = view.console.take_damage();
        let chat_dirty = view.chat.take_dirty();
        let overlay_dirty = self.last_overlay.as_ref() != Some(overlay);
        if damage.is_empty() && !chat_dirty && !overlay_dirty {
            return Ok(());
        }

        let (term_cols, term_rows) = terminal::size()?;
        let stdout = io::stdout();
        let mut stdout = io::BufWriter::with_capacity(65536, stdout.lock());

        // Begin synchronized update (reduces flicker)
        write!(stdout, "\x1b[?2026h")?;

        let grid_rows = view.console.grid().rows;
        let cols = view.console.grid().cols.min(term_cols as usize);
        let visible = grid_rows.min(term_rows as usize);

        if damage.full {
            queue!(stdout, ResetColor, Clear(ClearType::All))?;
            for row in 0..visible {
                self.render_row(&mut stdout, view, row, cols)?;
            }
        } else {
            for &row in damage.lines.iter().filter(|&&r| r < visible) {
                self.render_row(&mut stdout, view, row, cols)?;
            }
        }

        if damage.full || chat_dirty || overlay_dirty {
            let top = visible as u16;
            self.render_bottom(&mut stdout, view, overlay, top, term_cols, term_rows)?;
            self.last_overlay = Some(overlay.clone());
        }

        queue!(stdout, ResetColor, SetAttribute(Attribute::Reset))?;
        // End synchronized update
        write!(stdout, "\x1b[?2026l")?;
        stdout.flush()
    }

    fn render_row<W: Write>(&self, stdout: &mut W, view: &View<Canvas>, row: usize, cols: usize) -> io::Result<()> {
        let cells = sample_row(view.console.surface(), view.console.renderer(), row, cols);
        queue!(stdout, MoveTo(0, row as u16))?;

        let mut last: Option<(Color, Color, bool)> = None;
        for cell in &cells {
            let style = (cell.fg, cell.bg, cell.cursor);
            if last != Some(style) {
                let underline = if cell.cursor {
                    Attribute::Underlined
                } else {
                    Attribute::NoUnderline
                };
                queue!(
                    stdout,
                    SetBackgroundColor(cell.bg.to_crossterm()),
                    SetForegroundColor(cell.fg.to_crossterm()),
                    SetAttribute(underline)
                )?;
                last = Some(style);
            }
            queue!(stdout, Print(printable(&cell.text)))?;
        }
        Ok(())
    }

    fn render_bottom<W: Write>(
        &self,
        stdout: &mut W,
        view: &View<Canvas>,
        overlay: &Overlay,
        top: u16,
        term_cols: u16,
        term_rows: u16,
    ) -> io::Result<()> {
        if top >= term_rows {
            return Ok(());
        }
        let width = term_cols as usize;

        // Status line in the ownership colour
        queue!(
            stdout,
            MoveTo(0, top),
            SetAttribute(Attribute::NoUnderline),
            SetBackgroundColor(view.console.border().to_crossterm()),
            SetForegroundColor(STATUS_FG.to_crossterm()),
            Print(fit(&overlay.status, width))
        )?;

        let pane_top = top + 1;
        if pane_top >= term_rows {
            return Ok(());
        }
        let input_row = overlay.input.as_ref().map(|_| term_rows - 1);
        let pane_rows = (term_rows - pane_top) as usize - usize::from(input_row.is_some());

        // Newest line at the bottom
        let mut shown: Vec<&ChatLine> = view.chat.lines().rev().take(pane_rows).collect();
        shown.reverse();
        let blank = pane_rows - shown.len();
        for i in 0..pane_rows {
            queue!(stdout, MoveTo(0, pane_top + i as u16))?;
            match i.checked_sub(blank).and_then(|j| shown.get(j)) {
                Some(line) => {
                    let fg = match line.kind {
                        ChatKind::Chat => CHAT_FG,
                        ChatKind::Status => STATUS_TEXT_FG,
                        ChatKind::Error => ERROR_FG,
                    };
                    queue!(
                        stdout,
                        SetBackgroundColor(CHAT_BG.to_crossterm()),
                        SetForegroundColor(fg.to_crossterm()),
                        Print(fit(&format!("{} {}", line.label, line.text), width))
                    )?;
                }
                None => queue!(
                    stdout,
                    SetBackgroundColor(CHAT_BG.to_crossterm()),
                    Print(fit("", width))
                )?,
            }
        }

        if let (Some(row), Some(input)) = (input_row, &overlay.input) {
            queue!(
                stdout,
                MoveTo(0, row),
                SetBackgroundColor(CHAT_BG.to_crossterm()),
                SetForegroundColor(CHAT_FG.to_crossterm()),
                Print(fit(&format!("> {}", input), width))
            )?;
        }
        Ok(())
    }
}

impl Drop for Presenter {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Truncate or pad `text` to exactly `width` columns
fn fit(text: &str, width: usize) -> String {
    let mut out = String::with_capacity(width);
    let mut used = 0;
    for ch in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if w == 0 {
            continue;
        }
        if used + w > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.extend(std::iter::repeat(' ').take(width - used));
    out
}

//! Grid renderer
//!
//! Paints a `TerminalGrid` onto a `Surface` cell by cell. Each cell is a
//! background rectangle with its glyph on the baseline; the cursor is shown
//! by inverting a strip along the bottom of its cell.

use crate::config::{CellConfig, Color};
use crate::core::term::TerminalGrid;
use crate::ui::surface::{invert_rect, Rect, Surface};

/// Colour the whole surface is cleared to before a full redraw
const CLEAR_COLOR: Color = Color::new(0, 0, 0);

/// Largest surface a grid may need
pub const MAX_SURFACE_PIXELS: u64 = 1 << 26;

pub struct Renderer {
    metrics: CellConfig,
}

impl Renderer {
    pub fn new(metrics: CellConfig) -> Self {
        Self { metrics }
    }

    /// Pixel size of a `cols` x `rows` grid
    ///
    /// `None` when it would exceed `MAX_SURFACE_PIXELS`.
    pub fn surface_size(&self, cols: usize, rows: usize) -> Option<(u32, u32)> {
        let width = u32::try_from(cols).ok()?.checked_mul(self.metrics.width)?;
        let height = u32::try_from(rows).ok()?.checked_mul(self.metrics.height)?;
        (u64::from(width) * u64::from(height) <= MAX_SURFACE_PIXELS).then_some((width, height))
    }

    pub fn cell_rect(&self, col: usize, row: usize) -> Rect {
        Rect::new(
            self.metrics.width * col as u32,
            self.metrics.height * row as u32,
            self.metrics.width,
            self.metrics.height,
        )
    }

    /// Baseline of glyphs in `row`
    pub fn baseline(&self, row: usize) -> u32 {
        (self.metrics.height * (row as u32 + 1)).saturating_sub(self.metrics.descent)
    }

    /// The strip inverted to show the cursor
    pub fn cursor_rect(&self, col: usize, row: usize) -> Rect {
        Rect::new(
            self.metrics.width * col as u32,
            self.baseline(row),
            self.metrics.width,
            self.metrics.descent,
        )
    }

    pub fn redraw_cell<S: Surface + ?Sized>(&self, grid: &TerminalGrid, surface: &mut S, col: usize, row: usize) {
        let Some(cell) = grid.row(row).and_then(|r| r.cells.get(col)) else {
            return;
        };
        let (bg, fg) = cell.attr.resolve(grid.theme());
        let rect = self.cell_rect(col, row);

        surface.fill_rect(rect, bg);
        surface.fill_text(
            cell.display_glyph(),
            rect.x,
            self.baseline(row),
            self.metrics.width,
            fg,
            &self.metrics.font,
        );

        if grid.is_cursor(col, row) {
            invert_rect(surface, self.cursor_rect(col, row));
        }
    }

    pub fn redraw_row<S: Surface + ?Sized>(&self, grid: &TerminalGrid, surface: &mut S, row: usize) {
        for col in 0..grid.cols {
            self.redraw_cell(grid, surface, col, row);
        }
    }

    pub fn redraw<S: Surface + ?Sized>(&self, grid: &TerminalGrid, surface: &mut S) {
        let (width, height) = surface.size();
        surface.fill_rect(Rect::new(0, 0, width, height), CLEAR_COLOR);

        for row in 0..grid.rows {
            self.redraw_row(grid, surface, row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColorTheme;
    use crate::core::term::{Cell, Row};
    use crate::ui::surface::Canvas;

    fn setup() -> (Renderer, TerminalGrid, Canvas) {
        let renderer = Renderer::new(CellConfig::default());
        let grid = TerminalGrid::new(3, 2, ColorTheme::light2());
        let (w, h) = renderer.surface_size(3, 2).unwrap();
        (renderer, grid, Canvas::new(w, h))
    }

    #[test]
    fn test_cell_colours_and_glyph() {
        let (renderer, mut grid, mut canvas) = setup();
        // bold red on blue
        let attr = 4 | (1 << 3) | (1 << 6);
        let row = Row::from(vec![Cell::new("x", attr), Cell::default(), Cell::default()]);
        grid.replace_row(1, row).unwrap();
        renderer.redraw(&grid, &mut canvas);

        let theme = ColorTheme::light2();
        let rect = renderer.cell_rect(0, 1);
        assert_eq!(rect, Rect::new(0, 14, 8, 14));
        assert_eq!(canvas.pixel(rect.x, rect.y), Some(theme.dark[4]));

        let glyph = canvas.glyph_at(0, renderer.baseline(1)).unwrap();
        assert_eq!(glyph.text, "x");
        assert_eq!(glyph.color, theme.bright[1]);

        // Default cell: palette 7 on palette 0
        assert_eq!(canvas.pixel(8, 0), Some(theme.dark[0]));
        assert_eq!(canvas.glyph_at(8, renderer.baseline(0)).unwrap().color, theme.dark[7]);
    }

    #[test]
    fn test_surface_size_limits() {
        let renderer = Renderer::new(CellConfig::default());
        assert_eq!(renderer.surface_size(80, 24), Some((640, 336)));
        assert_eq!(renderer.surface_size(10000, 1000), None);
        assert_eq!(renderer.surface_size(usize::MAX, 1), None);
    }

    #[test]
    fn test_baseline_never_underflows() {
        let renderer = Renderer::new(CellConfig {
            descent: 20,
            ..CellConfig::default()
        });
        assert_eq!(renderer.baseline(0), 0);
        assert_eq!(renderer.baseline(1), 8);
    }

    #[test]
    fn test_cursor_strip_is_inverted() {
        let (renderer, mut grid, mut canvas) = setup();
        grid.move_cursor(2, 0).unwrap();
        renderer.redraw_row(&grid, &mut canvas, 0);

        let bg = ColorTheme::light2().dark[0];
        let inverted = Color::new(255 - bg.r, 255 - bg.g, 255 - bg.b);
        let strip = renderer.cursor_rect(2, 0);
        assert_eq!(strip, Rect::new(16, 10, 8, 4));
        assert_eq!(canvas.pixel(16, 10), Some(inverted));
        assert_eq!(canvas.pixel(23, 13), Some(inverted));
        assert_eq!(canvas.pixel(16, 9), Some(bg));
        assert_eq!(canvas.pixel(8, 13), Some(bg));
    }
}

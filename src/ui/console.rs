//! Console widget
//!
//! Ties the grid model to its renderer and surface: every mutation repaints
//! the rows it invalidated before returning, and the repainted rows are
//! collected as damage for whoever presents the surface.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::config::{CellConfig, Color, ColorTheme};
use crate::core::term::{GridError, Owner, Redraw, Row, TerminalGrid};
use crate::ui::renderer::Renderer;
use crate::ui::surface::Surface;

/// Rows repainted since the last presentation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Damage {
    pub lines: BTreeSet<usize>,
    pub full: bool,
}

impl Damage {
    pub fn is_empty(&self) -> bool {
        !self.full && self.lines.is_empty()
    }
}

pub struct Console<S> {
    grid: TerminalGrid,
    renderer: Renderer,
    surface: S,
    /// Ownership cue
    border: Color,
    damage: Damage,
}

impl<S: Surface> Console<S> {
    /// Size the surface for a `cols` x `rows` grid and paint it.
    pub fn new(cols: usize, rows: usize, theme: ColorTheme, metrics: CellConfig, mut surface: S) -> Result<Self, GridError> {
        let renderer = Renderer::new(metrics);
        let (width, height) = renderer
            .surface_size(cols, rows)
            .ok_or(GridError::TooLarge { cols, rows })?;
        surface.resize(width, height);

        let border = theme.ownership[Owner::Nobody.index()];
        let mut console = Self {
            grid: TerminalGrid::new(cols, rows, theme),
            renderer,
            surface,
            border,
            damage: Damage::default(),
        };
        console.paint(Redraw::All);
        Ok(console)
    }

    pub fn grid(&self) -> &TerminalGrid {
        &self.grid
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn border(&self) -> Color {
        self.border
    }

    pub fn replace_row(&mut self, index: usize, row: Row) -> Result<(), GridError> {
        let redraw = self.grid.replace_row(index, row)?;
        self.paint(redraw);
        Ok(())
    }

    /// Replace rows from the top. Nothing is applied if any row is rejected.
    pub fn replace_screen(&mut self, rows: Vec<Row>) -> Result<(), GridError> {
        self.grid.check_screen(&rows)?;
        for (index, row) in rows.into_iter().enumerate() {
            self.replace_row(index, row)?;
        }
        Ok(())
    }

    pub fn move_cursor(&mut self, x: i64, y: i64) -> Result<(), GridError> {
        let redraw = self.grid.move_cursor(x, y)?;
        debug!(cursor = ?self.grid.cursor(), "cursor moved");
        self.paint(redraw);
        Ok(())
    }

    pub fn set_color_scheme(&mut self, theme: ColorTheme) {
        self.border = theme.ownership[self.grid.owner().index()];
        let redraw = self.grid.set_color_scheme(theme);
        self.paint(redraw);
    }

    pub fn change_owner(&mut self, owner: Owner) {
        self.grid.change_owner(owner);
        self.border = self.grid.theme().ownership[owner.index()];
        self.damage.full = true;
        info!("New owner: {}", owner.describe());
    }

    fn paint(&mut self, redraw: Redraw) {
        match redraw {
            Redraw::All => {
                self.renderer.redraw(&self.grid, &mut self.surface);
                self.damage.full = true;
            }
            Redraw::Rows(rows) => {
                for row in rows {
                    debug!(row, "redraw row");
                    self.renderer.redraw_row(&self.grid, &mut self.surface, row);
                    self.damage.lines.insert(row);
                }
            }
        }
    }

    /// Mark everything for presentation again, e.g. after the host
    /// terminal was resized
    pub fn invalidate(&mut self) {
        self.damage.full = true;
    }

    /// Take the damage collected since the last call
    pub fn take_damage(&mut self) -> Damage {
        std::mem::take(&mut self.damage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::term::Cell;
    use crate::ui::surface::{Canvas, ImageData, Rect};

    /// Canvas that counts background fills per row of cells
    struct CountingSurface {
        canvas: Canvas,
        fills: Vec<u32>,
    }

    impl CountingSurface {
        fn new() -> Self {
            Self {
                canvas: Canvas::new(0, 0),
                fills: Vec::new(),
            }
        }

        /// Rows repainted, in paint order, one entry per repaint
        fn rows_painted(&self, cols: usize) -> Vec<u32> {
            self.fills
                .chunks(cols)
                .map(|chunk| chunk[0])
                .collect()
        }
    }

    impl Surface for CountingSurface {
        fn size(&self) -> (u32, u32) {
            self.canvas.size()
        }
        fn resize(&mut self, width: u32, height: u32) {
            self.canvas.resize(width, height)
        }
        fn fill_rect(&mut self, rect: Rect, color: Color) {
            if rect.height == CellConfig::default().height {
                self.fills.push(rect.y / rect.height);
            }
            self.canvas.fill_rect(rect, color)
        }
        fn fill_text(&mut self, text: &str, x: u32, baseline: u32, max_width: u32, color: Color, font: &str) {
            self.canvas.fill_text(text, x, baseline, max_width, color, font)
        }
        fn get_image_data(&self, rect: Rect) -> ImageData {
            self.canvas.get_image_data(rect)
        }
        fn put_image_data(&mut self, image: &ImageData, x: u32, y: u32) {
            self.canvas.put_image_data(image, x, y)
        }
    }

    fn console() -> Console<CountingSurface> {
        let mut console = Console::new(
            4,
            5,
            ColorTheme::light2(),
            CellConfig::default(),
            CountingSurface::new(),
        )
        .unwrap();
        console.surface.fills.clear();
        console.take_damage();
        console
    }

    #[test]
    fn test_new_console_paints_everything() {
        let console = Console::new(2, 2, ColorTheme::light2(), CellConfig::default(), Canvas::new(0, 0)).unwrap();
        assert_eq!(console.surface().size(), (16, 28));
        assert!(console.surface().glyph_at(8, 24).is_some());
        assert_eq!(console.border(), ColorTheme::light2().ownership[0]);
    }

    #[test]
    fn test_oversize_grid_is_rejected() {
        let result = Console::new(10000, 1000, ColorTheme::light2(), CellConfig::default(), Canvas::new(0, 0));
        assert!(matches!(result, Err(GridError::TooLarge { cols: 10000, rows: 1000 })));
    }

    #[test]
    fn test_cursor_on_same_row_repaints_once() {
        let mut console = console();
        console.move_cursor(2, 3).unwrap();
        console.surface.fills.clear();

        console.move_cursor(2, 3).unwrap();
        assert_eq!(console.surface.rows_painted(4), vec![3]);
    }

    #[test]
    fn test_first_cursor_repaints_new_row_only() {
        let mut console = console();
        console.move_cursor(0, 0).unwrap();
        assert_eq!(console.surface.rows_painted(4), vec![0]);

        console.surface.fills.clear();
        console.move_cursor(1, 2).unwrap();
        assert_eq!(console.surface.rows_painted(4), vec![0, 2]);
    }

    #[test]
    fn test_rejected_screen_changes_nothing() {
        let mut console = console();
        let good = Row::from(vec![Cell::new("a", 1); 4]);
        let short = Row::from(vec![Cell::new("b", 1); 3]);

        assert!(console.replace_screen(vec![good, short]).is_err());
        assert_eq!(console.grid().row(0), Some(&Row::new(4)));
        assert!(console.surface.fills.is_empty());
        assert!(console.take_damage().is_empty());
    }

    #[test]
    fn test_damage_tracks_rows() {
        let mut console = console();
        console.replace_row(1, Row::new(4)).unwrap();
        console.replace_row(3, Row::new(4)).unwrap();
        let damage = console.take_damage();
        assert_eq!(damage.lines.into_iter().collect::<Vec<_>>(), vec![1, 3]);
        assert!(!damage.full);
        assert!(console.take_damage().is_empty());
    }

    #[test]
    fn test_owner_and_theme_update_border() {
        let mut console = console();
        console.change_owner(Owner::You);
        assert_eq!(console.border(), ColorTheme::light2().ownership[1]);
        assert_eq!(console.grid().owner(), Owner::You);

        console.set_color_scheme(ColorTheme::light1());
        assert_eq!(console.border(), ColorTheme::light1().ownership[1]);
        assert_eq!(console.surface.rows_painted(4), vec![0, 1, 2, 3, 4]);
        assert!(console.take_damage().full);
    }

    #[test]
    fn test_invalidate() {
        let mut console = console();
        console.invalidate();
        assert!(console.take_damage().full);
        assert!(console.surface.fills.is_empty());
    }
}

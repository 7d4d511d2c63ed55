//! Terminal grid model
//!
//! Holds the authoritative cell grid, cursor, colour theme and owner of the
//! shared terminal. Every mutation reports which rows it invalidated so the
//! caller can repaint exactly those.

use thiserror::Error;

use super::row::{DecodeError, Row};
use crate::config::ColorTheme;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GridError {
    #[error("row {index} is outside a {rows}-row grid")]
    RowOutOfRange { index: usize, rows: usize },

    #[error("row has {got} cells, grid is {expected} columns wide")]
    WrongWidth { expected: usize, got: usize },

    #[error("screen has {got} rows, grid has {expected}")]
    TooManyRows { expected: usize, got: usize },

    #[error("cursor row {row} is outside a {rows}-row grid")]
    CursorOutOfRange { row: usize, rows: usize },

    #[error("a {cols}x{rows} grid is too large to draw")]
    TooLarge { cols: usize, rows: usize },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl GridError {
    /// Whether screen contents were rejected, leaving the grid stale
    pub fn rejects_screen(&self) -> bool {
        matches!(
            self,
            GridError::RowOutOfRange { .. }
                | GridError::WrongWidth { .. }
                | GridError::TooManyRows { .. }
                | GridError::Decode(_)
        )
    }
}

/// Rows that must be repainted after a mutation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Redraw {
    /// These rows, in order, each exactly once
    Rows(Vec<usize>),
    /// Every row
    All,
}

impl Redraw {
    pub fn row(y: usize) -> Self {
        Redraw::Rows(vec![y])
    }
}

/// Cursor position
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    pub col: usize,
    pub row: usize,
}

/// Who holds write access to the shared terminal, as seen by this client
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Owner {
    #[default]
    Nobody,
    You,
    Other,
}

impl Owner {
    pub fn from_wire(value: u64) -> Option<Self> {
        match value {
            0 => Some(Owner::Nobody),
            1 => Some(Owner::You),
            2 => Some(Owner::Other),
            _ => None,
        }
    }

    /// Index into the ownership palette
    pub fn index(self) -> usize {
        match self {
            Owner::Nobody => 0,
            Owner::You => 1,
            Owner::Other => 2,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Owner::Nobody => "nobody",
            Owner::You => "you",
            Owner::Other => "someone else",
        }
    }
}

/// The shared terminal's screen state
pub struct TerminalGrid {
    pub cols: usize,
    pub rows: usize,
    grid: Vec<Row>,
    /// `None` until the server reports a position
    cursor: Option<Cursor>,
    theme: ColorTheme,
    owner: Owner,
}

impl TerminalGrid {
    pub fn new(cols: usize, rows: usize, theme: ColorTheme) -> Self {
        Self {
            cols,
            rows,
            grid: (0..rows).map(|_| Row::new(cols)).collect(),
            cursor: None,
            theme,
            owner: Owner::Nobody,
        }
    }

    pub fn row(&self, y: usize) -> Option<&Row> {
        self.grid.get(y)
    }

    pub fn rows(&self) -> &[Row] {
        &self.grid
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    pub fn theme(&self) -> &ColorTheme {
        &self.theme
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    /// Whether the cursor sits on the given cell
    pub fn is_cursor(&self, col: usize, row: usize) -> bool {
        self.cursor == Some(Cursor { col, row })
    }

    fn check_row(&self, index: usize, row: &Row) -> Result<(), GridError> {
        if index >= self.rows {
            return Err(GridError::RowOutOfRange {
                index,
                rows: self.rows,
            });
        }
        if row.len() != self.cols {
            return Err(GridError::WrongWidth {
                expected: self.cols,
                got: row.len(),
            });
        }
        Ok(())
    }

    /// Replace one row in place. Nothing changes if the row is rejected.
    pub fn replace_row(&mut self, index: usize, row: Row) -> Result<Redraw, GridError> {
        self.check_row(index, &row)?;
        self.grid[index] = row;
        Ok(Redraw::row(index))
    }

    /// Check a batch of rows starting at the top without applying any.
    pub fn check_screen(&self, rows: &[Row]) -> Result<(), GridError> {
        if rows.len() > self.rows {
            return Err(GridError::TooManyRows {
                expected: self.rows,
                got: rows.len(),
            });
        }
        rows.iter()
            .enumerate()
            .try_for_each(|(y, row)| self.check_row(y, row))
    }

    /// Move the cursor. A negative coordinate hides it.
    pub fn move_cursor(&mut self, x: i64, y: i64) -> Result<Redraw, GridError> {
        let new = if x < 0 || y < 0 {
            None
        } else {
            let row = y as usize;
            if row >= self.rows {
                return Err(GridError::CursorOutOfRange { row, rows: self.rows });
            }
            Some(Cursor {
                col: x as usize,
                row,
            })
        };

        let old_row = self.cursor.map(|c| c.row);
        let new_row = new.map(|c| c.row);
        self.cursor = new;

        let rows = match (old_row, new_row) {
            (Some(old), Some(new)) if old == new => vec![new],
            (old, new) => old.into_iter().chain(new).collect(),
        };
        Ok(Redraw::Rows(rows))
    }

    /// Swap the colour theme; every cell re-resolves its colours.
    pub fn set_color_scheme(&mut self, theme: ColorTheme) -> Redraw {
        self.theme = theme;
        Redraw::All
    }

    /// Record the new owner. This is a display cue only.
    pub fn change_owner(&mut self, owner: Owner) {
        self.owner = owner;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::term::row::Cell;

    fn grid(cols: usize, rows: usize) -> TerminalGrid {
        TerminalGrid::new(cols, rows, ColorTheme::light2())
    }

    #[test]
    fn test_initial_state() {
        let g = grid(3, 2);
        assert_eq!(g.rows().len(), 2);
        assert!(g.rows().iter().all(|r| r.cells == vec![Cell::default(); 3]));
        assert_eq!(g.cursor(), None);
        assert_eq!(g.owner(), Owner::Nobody);
    }

    #[test]
    fn test_replace_row() {
        let mut g = grid(2, 2);
        let row = Row::from(vec![Cell::new("a", 1), Cell::new("b", 2)]);
        assert_eq!(g.replace_row(1, row.clone()), Ok(Redraw::row(1)));
        assert_eq!(g.row(1), Some(&row));
    }

    #[test]
    fn test_replace_row_rejects_wrong_width() {
        let mut g = grid(2, 2);
        let row = Row::from(vec![Cell::new("a", 1)]);
        assert_eq!(
            g.replace_row(0, row),
            Err(GridError::WrongWidth { expected: 2, got: 1 })
        );
        assert_eq!(g.row(0), Some(&Row::new(2)));
    }

    #[test]
    fn test_replace_row_rejects_out_of_range() {
        let mut g = grid(2, 2);
        assert_eq!(
            g.replace_row(2, Row::new(2)),
            Err(GridError::RowOutOfRange { index: 2, rows: 2 })
        );
    }

    #[test]
    fn test_cursor_same_row_redraws_once() {
        let mut g = grid(5, 5);
        g.move_cursor(2, 3).unwrap();
        assert_eq!(g.move_cursor(2, 3), Ok(Redraw::Rows(vec![3])));
        assert_eq!(g.move_cursor(4, 3), Ok(Redraw::Rows(vec![3])));
    }

    #[test]
    fn test_cursor_first_move_redraws_new_row_only() {
        let mut g = grid(5, 5);
        assert_eq!(g.move_cursor(0, 0), Ok(Redraw::Rows(vec![0])));
        assert!(g.is_cursor(0, 0));
    }

    #[test]
    fn test_cursor_between_rows_redraws_both() {
        let mut g = grid(5, 5);
        g.move_cursor(1, 1).unwrap();
        assert_eq!(g.move_cursor(1, 4), Ok(Redraw::Rows(vec![1, 4])));
        assert_eq!(g.move_cursor(-1, -1), Ok(Redraw::Rows(vec![4])));
        assert_eq!(g.cursor(), None);
    }

    #[test]
    fn test_cursor_out_of_range_is_rejected() {
        let mut g = grid(5, 5);
        g.move_cursor(1, 1).unwrap();
        assert_eq!(
            g.move_cursor(0, 5),
            Err(GridError::CursorOutOfRange { row: 5, rows: 5 })
        );
        assert!(g.is_cursor(1, 1));
    }

    #[test]
    fn test_only_screen_errors_reject_screen() {
        assert!(GridError::WrongWidth { expected: 2, got: 1 }.rejects_screen());
        assert!(GridError::RowOutOfRange { index: 2, rows: 2 }.rejects_screen());
        assert!(GridError::Decode(DecodeError::RepeatWithoutPredecessor(0)).rejects_screen());
        assert!(!GridError::CursorOutOfRange { row: 5, rows: 5 }.rejects_screen());
        assert!(!GridError::TooLarge { cols: 1, rows: 1 }.rejects_screen());
    }

    #[test]
    fn test_check_screen() {
        let g = grid(2, 1);
        assert!(g.check_screen(&[Row::new(2)]).is_ok());
        assert!(g.check_screen(&[]).is_ok());
        assert_eq!(
            g.check_screen(&[Row::new(2), Row::new(2)]),
            Err(GridError::TooManyRows { expected: 1, got: 2 })
        );
    }

    #[test]
    fn test_set_scheme_and_owner() {
        let mut g = grid(2, 2);
        assert_eq!(g.set_color_scheme(ColorTheme::light1()), Redraw::All);
        assert_eq!(g.theme().name, "light1");
        g.change_owner(Owner::You);
        assert_eq!(g.owner(), Owner::You);
        assert_eq!(Owner::from_wire(2), Some(Owner::Other));
        assert_eq!(Owner::from_wire(3), None);
    }
}

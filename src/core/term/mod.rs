//! Shared terminal screen model
//!
//! - **attr**: packed attribute words and colour resolution
//! - **row**: cells, rows and the compact row encoding
//! - **grid**: the cell grid, cursor, theme and owner

pub mod attr;
pub mod grid;
pub mod row;

pub use grid::{GridError, Owner, Redraw, TerminalGrid};
pub use row::{decode_row_value, Cell, Row};

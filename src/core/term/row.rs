//! Cells, rows and the compact row encoding
//!
//! A row travels as a list whose elements are one of:
//!
//! - `"a"`: a bare glyph, shorthand for `["a", 56]`
//! - `["a", 40]`: a glyph with its attribute word
//! - `4`: repeat the previous decoded cell four more times

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::attr::{AttrWord, DEFAULT_ATTR};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("repeat count at column {0} has no preceding cell")]
    RepeatWithoutPredecessor(usize),

    #[error("row decodes to {got} cells, expected {expected}")]
    WrongCellCount { expected: usize, got: usize },

    #[error("malformed row element: {0}")]
    BadElement(String),
}

/// A single cell
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    pub glyph: String,
    pub attr: AttrWord,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            glyph: " ".to_string(),
            attr: AttrWord(DEFAULT_ATTR),
        }
    }
}

impl Cell {
    pub fn new(glyph: impl Into<String>, attr: u16) -> Self {
        Self {
            glyph: glyph.into(),
            attr: AttrWord(attr),
        }
    }

    /// Get the display glyph (space if empty)
    pub fn display_glyph(&self) -> &str {
        if self.glyph.is_empty() {
            " "
        } else {
            &self.glyph
        }
    }
}

/// A single row
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(cols: usize) -> Self {
        Self {
            cells: vec![Cell::default(); cols],
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }
}

impl From<Vec<Cell>> for Row {
    fn from(cells: Vec<Cell>) -> Self {
        Self { cells }
    }
}

/// One element of an encoded row
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawCell {
    Repeat(u64),
    Literal(String),
    Pair(String, u16),
}

/// Parse the JSON form of an encoded row.
pub fn parse_row(value: &Value) -> Result<Vec<RawCell>, DecodeError> {
    Vec::<RawCell>::deserialize(value).map_err(|e| DecodeError::BadElement(e.to_string()))
}

/// Expand an encoded row into exactly `cols` cells.
pub fn decode_row(raw: &[RawCell], cols: usize) -> Result<Row, DecodeError> {
    let mut cells: Vec<Cell> = Vec::with_capacity(cols);

    for (i, element) in raw.iter().enumerate() {
        match element {
            RawCell::Literal(glyph) => cells.push(Cell::new(glyph.as_str(), DEFAULT_ATTR)),
            RawCell::Pair(glyph, attr) => cells.push(Cell::new(glyph.as_str(), *attr)),
            RawCell::Repeat(n) => {
                let prev = cells
                    .last()
                    .cloned()
                    .ok_or(DecodeError::RepeatWithoutPredecessor(i))?;
                // Never expand past the row width
                let Some(total) = (cells.len() as u64)
                    .checked_add(*n)
                    .filter(|&total| total <= cols as u64)
                else {
                    return Err(DecodeError::WrongCellCount {
                        expected: cols,
                        got: usize::try_from((cells.len() as u64).saturating_add(*n)).unwrap_or(usize::MAX),
                    });
                };
                cells.resize(total as usize, prev);
            }
        }
    }

    if cells.len() != cols {
        return Err(DecodeError::WrongCellCount {
            expected: cols,
            got: cells.len(),
        });
    }

    Ok(Row { cells })
}

/// Parse and expand a row straight from its JSON form.
pub fn decode_row_value(value: &Value, cols: usize) -> Result<Row, DecodeError> {
    decode_row(&parse_row(value)?, cols)
}

//! Packed cell attribute words
//!
//! The server sends one integer per cell describing its colours and style:
//!
//! ```text
//! [flags:5] [fg:3] [bg:3]
//!  |         |      + background palette index (bits 0-2)
//!  |         + foreground palette index (bits 3-5)
//!  + bold, italic, underline, strike, reverse (bits 6-10)
//! ```

use bitflags::bitflags;

use crate::config::{Color, ColorTheme};

/// Attribute of a cell sent without one (white on black).
pub const DEFAULT_ATTR: u16 = 56;

bitflags! {
    /// Style flags carried above the two palette indices
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct AttrFlags: u16 {
        const BOLD      = 1 << 6;
        const ITALIC    = 1 << 7;
        const UNDERLINE = 1 << 8;
        const STRIKE    = 1 << 9;
        const REVERSE   = 1 << 10;
    }
}

/// A packed attribute word
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AttrWord(pub u16);

impl Default for AttrWord {
    fn default() -> Self {
        Self(DEFAULT_ATTR)
    }
}

impl AttrWord {
    pub fn bg(self) -> usize {
        (self.0 & 0b111) as usize
    }

    pub fn fg(self) -> usize {
        ((self.0 >> 3) & 0b111) as usize
    }

    pub fn flags(self) -> AttrFlags {
        AttrFlags::from_bits_truncate(self.0)
    }

    /// Resolve to `(background, foreground)` display colours.
    ///
    /// Bold brightens the foreground. Italic, underline and strike all
    /// brighten the background; the server does not say which of them
    /// stands in for blink, so all three are treated alike.
    pub fn resolve(self, theme: &ColorTheme) -> (Color, Color) {
        let flags = self.flags();

        let fg = if flags.contains(AttrFlags::BOLD) {
            theme.bright[self.fg()]
        } else {
            theme.dark[self.fg()]
        };

        let bright_bg = flags.intersects(AttrFlags::ITALIC | AttrFlags::UNDERLINE | AttrFlags::STRIKE);
        let bg = if bright_bg {
            theme.bright[self.bg()]
        } else {
            theme.dark[self.bg()]
        };

        if flags.contains(AttrFlags::REVERSE) {
            (fg, bg)
        } else {
            (bg, fg)
        }
    }
}

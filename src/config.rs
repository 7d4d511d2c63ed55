//! Configuration and colour theme management for webterm.
//!
//! This module provides:
//! - TOML configuration file loading from `~/.webterm/config.toml`
//! - Built-in colour themes (`light1`, `light2`)
//! - Runtime theme switching
//!
//! # Configuration File
//!
//! ```toml
//! # Session server (host:port)
//! server = "127.0.0.1:5000"
//!
//! # Colour theme: light1, light2
//! color_scheme = "light2"
//!
//! # Log filter for ~/.webterm/webterm.log
//! log_level = "info"
//!
//! [cell]
//! width = 8
//! height = 14
//! descent = 4
//! ```

use std::fs;
use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Session server address
    pub server: String,
    /// Colour theme name
    pub color_scheme: String,
    /// Log filter directive
    pub log_level: String,
    /// Cell metrics for the drawing surface
    pub cell: CellConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: "127.0.0.1:5000".to_string(),
            color_scheme: "light2".to_string(),
            log_level: "info".to_string(),
            cell: CellConfig::default(),
        }
    }
}

/// Pixel metrics of one character cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellConfig {
    /// Width of a character
    pub width: u32,
    /// Height of one
    pub height: u32,
    /// How far a glyph can reach below the baseline; also the cursor height
    pub descent: u32,
    pub font: String,
}

impl CellConfig {
    /// Non-empty cell whose descent fits inside it
    pub fn is_usable(&self) -> bool {
        self.width > 0 && self.height > 0 && self.descent <= self.height
    }
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            width: 8,
            height: 14,
            descent: 4,
            font: "12pt FixedsysExcelsior301Regular".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Self {
        match Self::get_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Self::default(),
        }
    }

    fn load_from(path: &PathBuf) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };
        Self::parse(&content).unwrap_or_default()
    }

    /// Parse configuration text. Unusable cell metrics fall back to the
    /// defaults.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(content)?;
        if !config.cell.is_usable() {
            warn!(cell = ?config.cell, "unusable cell metrics, using defaults");
            config.cell = CellConfig::default();
        }
        Ok(config)
    }

    /// Get config file path
    fn get_config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get the colour theme
    pub fn get_color_theme(&self) -> ColorTheme {
        ColorTheme::by_name(&self.color_scheme)
    }
}

/// `~/.webterm`, created on first use
pub fn config_dir() -> Option<PathBuf> {
    let dir = home_dir()?.join(".webterm");
    if !dir.exists() {
        let _ = fs::create_dir_all(&dir);
    }
    Some(dir)
}

/// Color definition (RGB)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert to crossterm Color
    pub fn to_crossterm(&self) -> crossterm::style::Color {
        crossterm::style::Color::Rgb {
            r: self.r,
            g: self.g,
            b: self.b,
        }
    }
}

/// Colour theme: two eight-entry palettes for cells plus the ownership
/// palette used for the console border.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorTheme {
    pub name: String,
    pub dark: [Color; 8],
    pub bright: [Color; 8],
    /// Nobody, you, someone else
    pub ownership: [Color; 3],
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self::light2()
    }
}

const OWNERSHIP: [Color; 3] = [
    Color::new(0xe0, 0xe0, 0xe0),
    Color::new(0x70, 0xc0, 0xff),
    Color::new(0xff, 0xa0, 0xa0),
];

impl ColorTheme {
    /// Muted light scheme
    pub fn light1() -> Self {
        Self {
            name: "light1".to_string(),
            dark: [
                Color::new(0xff, 0xff, 0xff),
                Color::new(0x6e, 0x26, 0x26),
                Color::new(0x23, 0x6b, 0x23),
                Color::new(0x61, 0x49, 0x10),
                Color::new(0x10, 0x10, 0x46),
                Color::new(0x46, 0x10, 0x46),
                Color::new(0x10, 0x46, 0x46),
                Color::new(0x00, 0x00, 0x00),
            ],
            bright: [
                Color::new(0xb0, 0xb0, 0xb0),
                Color::new(0x99, 0x1b, 0x1b),
                Color::new(0x3c, 0x9c, 0x3c),
                Color::new(0x94, 0x6e, 0x10),
                Color::new(0x21, 0x21, 0xb7),
                Color::new(0xb8, 0x2c, 0xb6),
                Color::new(0x1d, 0x9f, 0xa1),
                Color::new(0x40, 0x40, 0x40),
            ],
            ownership: OWNERSHIP,
        }
    }

    /// Saturated light scheme
    pub fn light2() -> Self {
        Self {
            name: "light2".to_string(),
            dark: [
                Color::new(0xff, 0xff, 0xff),
                Color::new(0x81, 0x43, 0x43),
                Color::new(0x38, 0x6e, 0x38),
                Color::new(0x6e, 0x61, 0x38),
                Color::new(0x38, 0x38, 0x6e),
                Color::new(0x6e, 0x38, 0x6d),
                Color::new(0x38, 0x6d, 0x6e),
                Color::new(0x00, 0x00, 0x00),
            ],
            bright: [
                Color::new(0xb0, 0xb0, 0xb0),
                Color::new(0xd2, 0x00, 0x00),
                Color::new(0x00, 0xaf, 0x00),
                Color::new(0xd2, 0x9e, 0x00),
                Color::new(0x00, 0x00, 0xd2),
                Color::new(0xd2, 0x00, 0xd0),
                Color::new(0x00, 0xae, 0xb0),
                Color::new(0x40, 0x40, 0x40),
            ],
            ownership: OWNERSHIP,
        }
    }

    /// Get theme by name
    pub fn by_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "light1" => Self::light1(),
            _ => Self::light2(),
        }
    }

    /// Name of the theme after this one, wrapping around
    pub fn next_name(&self) -> &'static str {
        let list = Self::list();
        let pos = list.iter().position(|n| *n == self.name).unwrap_or(0);
        list[(pos + 1) % list.len()]
    }

    /// List available themes
    pub fn list() -> Vec<&'static str> {
        vec!["light1", "light2"]
    }
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}

//! Style ranges and colors.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const RED: Self = Self::new(0xcd, 0x31, 0x31);
    pub const GREEN: Self = Self::new(0x0d, 0xbc, 0x79);
    pub const YELLOW: Self = Self::new(0xe5, 0xe5, 0x10);
    pub const BLUE: Self = Self::new(0x24, 0x72, 0xc8);
    pub const MAGENTA: Self = Self::new(0xbc, 0x3f, 0xbc);
    pub const CYAN: Self = Self::new(0x11, 0xa8, 0xcd);
    pub const WHITE: Self = Self::new(0xe5, 0xe5, 0xe5);
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const GRAY: Self = Self::new(0x66, 0x66, 0x66);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Perceived brightness (Rec. 709 luma).
    pub fn luma(self) -> f32 {
        (0.2126 * f32::from(self.r)) + (0.7152 * f32::from(self.g)) + (0.0722 * f32::from(self.b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color {0:?}: expected #rrggbb, #rgb or a color name")]
pub struct ColorParseError(pub String);

impl FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let named = match trimmed.to_ascii_lowercase().as_str() {
            "red" => Some(Self::RED),
            "green" => Some(Self::GREEN),
            "yellow" => Some(Self::YELLOW),
            "blue" => Some(Self::BLUE),
            "magenta" => Some(Self::MAGENTA),
            "cyan" => Some(Self::CYAN),
            "white" => Some(Self::WHITE),
            "black" => Some(Self::BLACK),
            "gray" | "grey" => Some(Self::GRAY),
            _ => None,
        };
        if let Some(color) = named {
            return Ok(color);
        }

        let err = || ColorParseError(s.to_string());
        let hex = trimmed.strip_prefix('#').ok_or_else(err)?;
        if !hex.is_ascii() {
            return Err(err());
        }
        match hex.len() {
            6 => {
                let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
                Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
            }
            3 => {
                let channel = |i: usize| {
                    u8::from_str_radix(&hex[i..=i], 16)
                        .map(|v| v * 17)
                        .map_err(|_| err())
                };
                Ok(Self::new(channel(0)?, channel(1)?, channel(2)?))
            }
            _ => Err(err()),
        }
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A `(start, length)` interval over the buffer with visual attributes.
///
/// Offsets are chars. Ranges handed out by line stylers are line-relative
/// until the dispatcher shifts them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleRange {
    pub start: usize,
    pub length: usize,
    pub foreground: Option<Rgb>,
    pub background: Option<Rgb>,
    pub bold: bool,
    pub underline: bool,
    pub strikeout: bool,
    pub hidden: bool,
}

impl StyleRange {
    /// An undecorated range; chain the builder methods to add attributes.
    pub fn new(start: usize, length: usize) -> Self {
        Self {
            start,
            length,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn fg(mut self, color: Rgb) -> Self {
        self.foreground = Some(color);
        self
    }

    #[must_use]
    pub const fn bg(mut self, color: Rgb) -> Self {
        self.background = Some(color);
        self
    }

    #[must_use]
    pub const fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    #[must_use]
    pub const fn underline(mut self) -> Self {
        self.underline = true;
        self
    }

    #[must_use]
    pub const fn strikeout(mut self) -> Self {
        self.strikeout = true;
        self
    }

    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Exclusive end offset.
    pub const fn end(&self) -> usize {
        self.start.saturating_add(self.length)
    }

    /// Same range moved right by `delta` chars.
    #[must_use]
    pub fn shifted(mut self, delta: usize) -> Self {
        self.start = self.start.saturating_add(delta);
        self
    }

    /// Whether the range carries any visible attribute at all.
    pub const fn is_plain(&self) -> bool {
        self.foreground.is_none()
            && self.background.is_none()
            && !self.bold
            && !self.underline
            && !self.strikeout
            && !self.hidden
    }

    /// Inline CSS declarations for this range, e.g. `color:#cd3131;font-weight:bold`.
    pub fn css(&self) -> String {
        let mut decls = Vec::new();
        if let Some(fg) = self.foreground {
            decls.push(format!("color:{fg}"));
        }
        if let Some(bg) = self.background {
            decls.push(format!("background-color:{bg}"));
        }
        if self.bold {
            decls.push("font-weight:bold".to_string());
        }
        match (self.underline, self.strikeout) {
            (true, true) => decls.push("text-decoration:underline line-through".to_string()),
            (true, false) => decls.push("text-decoration:underline".to_string()),
            (false, true) => decls.push("text-decoration:line-through".to_string()),
            (false, false) => {}
        }
        if self.hidden {
            decls.push("display:none".to_string());
        }
        decls.join(";")
    }
}

use std::fmt;
use std::str::FromStr;

use egui::Color32;
use image::Rgba;
use serde::{Deserialize, Serialize};

/// A straight (un-premultiplied) RGBA8 color.
///
/// Canonical text form is `#rrggbbaa`.  Parsing also accepts upper-case
/// digits, a missing `#`, and the 6-digit `#rrggbb` form (alpha = 255).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);
    pub const BLACK: Color = Color::new(0, 0, 0, 255);
    pub const WHITE: Color = Color::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Fully opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub fn from_hex(hex: &str) -> Result<Self, ColorParseError> {
        let digits = hex.trim().strip_prefix('#').unwrap_or(hex.trim());
        if digits.len() != 6 && digits.len() != 8 {
            return Err(ColorParseError::Length(digits.len()));
        }
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ColorParseError::InvalidDigit(hex.to_string()));
        }
        // All bytes are ASCII hex digits, so every 2-char slice is on a char boundary.
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| ColorParseError::InvalidDigit(hex.to_string()))
        };
        let a = if digits.len() == 8 { channel(6)? } else { 255 };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?, a))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    pub fn to_array(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Source-over blend of `top` onto `self`.  Used for overlay previews,
    /// never for buffer writes (the buffer stores exact replacement colors).
    pub fn blend_over(self, top: Color) -> Color {
        match top.a {
            0 => self,
            255 => top,
            _ => {
                let ta = top.a as u32;
                let ba = self.a as u32;
                // out_a = ta + ba * (1 - ta), all in 0..=255 fixed point
                let out_a = ta + ba * (255 - ta) / 255;
                if out_a == 0 {
                    return Color::TRANSPARENT;
                }
                let mix = |t: u8, b: u8| {
                    let num = t as u32 * ta + b as u32 * ba * (255 - ta) / 255;
                    (num / out_a).min(255) as u8
                };
                Color::new(
                    mix(top.r, self.r),
                    mix(top.g, self.g),
                    mix(top.b, self.b),
                    out_a as u8,
                )
            }
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<(u8, u8, u8, u8)> for Color {
    fn from((r, g, b, a): (u8, u8, u8, u8)) -> Self {
        Self::new(r, g, b, a)
    }
}

impl From<Color> for (u8, u8, u8, u8) {
    fn from(c: Color) -> Self {
        (c.r, c.g, c.b, c.a)
    }
}

impl From<Rgba<u8>> for Color {
    fn from(px: Rgba<u8>) -> Self {
        Self::new(px.0[0], px.0[1], px.0[2], px.0[3])
    }
}

impl From<Color> for Rgba<u8> {
    fn from(c: Color) -> Self {
        Rgba(c.to_array())
    }
}

impl From<Color> for Color32 {
    fn from(c: Color) -> Self {
        Color32::from_rgba_unmultiplied(c.r, c.g, c.b, c.a)
    }
}

/// Error returned when a hex color string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    /// Digit count (after stripping `#`) was not 6 or 8.
    Length(usize),
    InvalidDigit(String),
}

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorParseError::Length(n) => {
                write!(f, "expected 6 or 8 hex digits, got {}", n)
            }
            ColorParseError::InvalidDigit(s) => write!(f, "invalid hex color: {:?}", s),
        }
    }
}

impl std::error::Error for ColorParseError {}

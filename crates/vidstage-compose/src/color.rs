//! Hex color values.

use std::fmt;
use std::str::FromStr;

use image::Rgba;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use vidstage_common::Error;

/// 8-bit sRGB color with alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    /// Near-black used for caption text when none is given.
    pub const INK: Color = Color::rgb(0x11, 0x11, 0x11);
    pub const GREEN: Color = Color::rgb(0x16, 0xA3, 0x4A);
    pub const RED: Color = Color::rgb(0xDC, 0x26, 0x26);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xFF }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_opaque(&self) -> bool {
        self.a == 0xFF
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }

    /// Composite this color over an opaque `matte`, dropping alpha.
    pub fn flatten_onto(self, matte: Color) -> Color {
        let a = u16::from(self.a);
        let mix = |fg: u8, bg: u8| ((u16::from(fg) * a + u16::from(bg) * (255 - a) + 127) / 255) as u8;
        Color::rgb(mix(self.r, matte.r), mix(self.g, matte.g), mix(self.b, matte.b))
    }
}

impl FromStr for Color {
    type Err = Error;

    /// Accepts `#RGB`, `#RRGGBB` and `#RRGGBBAA`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::config(format!("invalid color {s:?}, expected #RGB, #RRGGBB or #RRGGBBAA"));
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        match hex.len() {
            3 => {
                let nibble = |i: usize| {
                    u8::from_str_radix(&hex[i..i + 1], 16)
                        .map(|v| v * 17)
                        .map_err(|_| invalid())
                };
                Ok(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?))
            }
            6 => Ok(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Color::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)?;
        if !self.is_opaque() {
            write!(f, "{:02X}", self.a)?;
        }
        Ok(())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

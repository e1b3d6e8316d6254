//! Caption styling and rendering.
//!
//! Captions are drawn with a built-in 5x7 block font scaled by whole pixels,
//! so output is identical on every machine and needs no font files.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use vidstage_common::{Error, Result};

use crate::color::Color;
use crate::frame::blend_pixel;
use crate::geometry::Rect;

const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;
const ADVANCE: u32 = GLYPH_W + 1;
/// Glyph height as a share of the label band.
const FONT_SCALE: f32 = 0.75;
/// Weights at or above this render bold.
const BOLD_THRESHOLD: u16 = 600;
pub const DEFAULT_FONT_WEIGHT: u16 = 800;

/// Resolved caption appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionStyle {
    pub text_color: Color,
    /// Solid bar painted across the whole band behind the text.
    pub background: Option<Color>,
    /// CSS-style weight, 100..=900.
    pub font_weight: u16,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            text_color: Color::INK,
            background: None,
            font_weight: DEFAULT_FONT_WEIGHT,
        }
    }
}

impl CaptionStyle {
    /// Colored text with no bar.
    pub fn text(color: Color) -> Self {
        Self {
            text_color: color,
            ..Self::default()
        }
    }

    pub fn is_bold(&self) -> bool {
        self.font_weight >= BOLD_THRESHOLD
    }
}

/// Caption options as written in configuration.
///
/// A bare color string is the short form: it paints a bar of that color
/// behind dark text. The table form sets each option explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CaptionOptions {
    Bar(String),
    Styled {
        #[serde(default)]
        bg_color: Option<String>,
        #[serde(default)]
        text_color: Option<String>,
        #[serde(default)]
        font_weight: Option<u16>,
    },
}

impl TryFrom<&CaptionOptions> for CaptionStyle {
    type Error = Error;

    fn try_from(options: &CaptionOptions) -> Result<Self> {
        let style = match options {
            CaptionOptions::Bar(bg) => CaptionStyle {
                background: Some(bg.parse()?),
                ..CaptionStyle::default()
            },
            CaptionOptions::Styled {
                bg_color,
                text_color,
                font_weight,
            } => CaptionStyle {
                text_color: text_color
                    .as_deref()
                    .map(str::parse)
                    .transpose()?
                    .unwrap_or(Color::INK),
                background: bg_color.as_deref().map(str::parse).transpose()?,
                font_weight: font_weight.unwrap_or(DEFAULT_FONT_WEIGHT),
            },
        };
        if !(100..=900).contains(&style.font_weight) {
            return Err(Error::config(format!(
                "font_weight must be within 100..=900, got {}",
                style.font_weight
            )));
        }
        Ok(style)
    }
}

/// Pixel size of rendered text for a band of `band_height` pixels.
pub fn text_extent(text: &str, band_height: u32, style: &CaptionStyle) -> (u32, u32) {
    let scale = glyph_scale(band_height);
    let n = text.chars().count() as u32;
    if n == 0 {
        return (0, 0);
    }
    let width = n * ADVANCE * scale - scale + bold_extra(scale, style);
    (width, GLYPH_H * scale)
}

fn glyph_scale(band_height: u32) -> u32 {
    (((band_height as f32) * FONT_SCALE) as u32 / GLYPH_H).max(1)
}

fn bold_extra(scale: u32, style: &CaptionStyle) -> u32 {
    if style.is_bold() {
        (scale / 3).max(1)
    } else {
        0
    }
}

/// Draw `text` centered in `band`, clipped to the canvas.
pub fn draw_caption(canvas: &mut RgbaImage, band: Rect, text: &str, style: &CaptionStyle) {
    if let Some(bg) = style.background {
        fill_rect(canvas, band, bg);
    }

    let scale = glyph_scale(band.height);
    let extra = bold_extra(scale, style);
    let (text_w, text_h) = text_extent(text, band.height, style);

    let origin_x = i64::from(band.x) + (i64::from(band.width) - i64::from(text_w)) / 2;
    let origin_y = i64::from(band.y) + (i64::from(band.height) - i64::from(text_h)) / 2;

    for (i, ch) in text.chars().enumerate() {
        let rows = glyph(ch);
        let gx = origin_x + (i as i64) * i64::from(ADVANCE * scale);
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_W {
                if bits & (1 << (GLYPH_W - 1 - col)) == 0 {
                    continue;
                }
                let x = gx + i64::from(col * scale);
                let y = origin_y + (row as i64) * i64::from(scale);
                fill_clipped(canvas, x, y, scale + extra, scale, style.text_color);
            }
        }
    }
}

fn fill_rect(canvas: &mut RgbaImage, rect: Rect, color: Color) {
    fill_clipped(
        canvas,
        i64::from(rect.x),
        i64::from(rect.y),
        rect.width,
        rect.height,
        color,
    );
}

fn fill_clipped(canvas: &mut RgbaImage, x: i64, y: i64, w: u32, h: u32, color: Color) {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + i64::from(w)).min(i64::from(canvas.width()));
    let y1 = (y + i64::from(h)).min(i64::from(canvas.height()));
    for py in y0..y1 {
        for px in x0..x1 {
            blend_pixel(canvas.get_pixel_mut(px as u32, py as u32), color, 1.0);
        }
    }
}

/// 5x7 bitmap for `ch`. Lowercase folds to uppercase; unknown characters
/// render as `?`.
fn glyph(ch: char) -> [u8; 7] {
    match ch.to_ascii_uppercase() {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        ' ' => [0; 7],
        '-' => [0, 0, 0, 0b11111, 0, 0, 0],
        '+' => [0, 0b00100, 0b00100, 0b11111, 0b00100, 0b00100, 0],
        '.' => [0, 0, 0, 0, 0, 0b01100, 0b01100],
        ',' => [0, 0, 0, 0, 0b01100, 0b00100, 0b01000],
        ':' => [0, 0b01100, 0b01100, 0, 0b01100, 0b01100, 0],
        '!' => [0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0, 0b00100],
        '\'' => [0b01100, 0b00100, 0b01000, 0, 0, 0, 0],
        '/' => [0, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0],
        '(' => [0b00010, 0b00100, 0b01000, 0b01000, 0b01000, 0b00100, 0b00010],
        ')' => [0b01000, 0b00100, 0b00010, 0b00010, 0b00010, 0b00100, 0b01000],
        '&' => [0b01100, 0b10010, 0b10100, 0b01000, 0b10101, 0b10010, 0b01101],
        _ => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0, 0b00100],
    }
}

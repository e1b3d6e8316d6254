//! Rounded-rectangle frame strokes.

use image::{Rgba, RgbaImage};

use crate::color::Color;
use crate::geometry::Rect;

/// Corner radius used when none is configured.
pub const DEFAULT_RADIUS: u32 = 16;

/// Stroke a rounded rectangle whose outer edge hugs `bounds`.
///
/// The stroke is centered on a path inset by half the stroke width, so a
/// frame drawn over an image stays inside the image bounds. Edge pixels are
/// blended by coverage for a smooth curve at the corners.
pub fn draw_rounded_frame(
    canvas: &mut RgbaImage,
    bounds: Rect,
    color: Color,
    stroke_width: u32,
    radius: u32,
) {
    if bounds.width == 0 || bounds.height == 0 || stroke_width == 0 {
        return;
    }

    let stroke = stroke_width as f32;
    let inset = (stroke_width / 2).max(1) as f32;
    let half_w = ((bounds.width as f32 - 2.0 * inset) / 2.0).max(0.5);
    let half_h = ((bounds.height as f32 - 2.0 * inset) / 2.0).max(0.5);
    let r = (radius as f32).min(half_w).min(half_h);
    let cx = bounds.width as f32 / 2.0;
    let cy = bounds.height as f32 / 2.0;

    let x_end = bounds.right().min(canvas.width());
    let y_end = bounds.bottom().min(canvas.height());

    for y in bounds.y..y_end {
        for x in bounds.x..x_end {
            let px = (x - bounds.x) as f32 + 0.5 - cx;
            let py = (y - bounds.y) as f32 + 0.5 - cy;
            let d = rounded_rect_distance(px, py, half_w, half_h, r);
            let coverage = (stroke / 2.0 - d.abs() + 0.5).clamp(0.0, 1.0);
            if coverage > 0.0 {
                blend_pixel(canvas.get_pixel_mut(x, y), color, coverage);
            }
        }
    }
}

/// Signed distance from a point (relative to the center) to the outline of
/// a rounded rectangle. Negative inside.
fn rounded_rect_distance(px: f32, py: f32, half_w: f32, half_h: f32, r: f32) -> f32 {
    let qx = px.abs() - (half_w - r);
    let qy = py.abs() - (half_h - r);
    let outside = (qx.max(0.0).powi(2) + qy.max(0.0).powi(2)).sqrt();
    let inside = qx.max(qy).min(0.0);
    outside + inside - r
}

/// Source-over blend of `color` at `coverage` onto `dst`.
pub(crate) fn blend_pixel(dst: &mut Rgba<u8>, color: Color, coverage: f32) {
    let alpha = coverage * f32::from(color.a) / 255.0;
    if alpha <= 0.0 {
        return;
    }
    let mix = |fg: u8, bg: u8| (f32::from(fg) * alpha + f32::from(bg) * (1.0 - alpha)).round() as u8;
    let out_a = alpha * 255.0 + f32::from(dst[3]) * (1.0 - alpha);
    *dst = Rgba([
        mix(color.r, dst[0]),
        mix(color.g, dst[1]),
        mix(color.b, dst[2]),
        out_a.round().min(255.0) as u8,
    ]);
}

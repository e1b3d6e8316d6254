//! Layout planning for the two-slot canvas.
//!
//! Pure integer geometry: no pixels, no I/O. Every region is derived
//! additively from the canvas edges inward, so the before/after slots and
//! their label bands cannot overlap.
//!
//! ```text
//!  +--------------------------------------------+
//!  |                 margin_top                 |
//!  |   [label band]  gap      [label band]  gap |
//!  | mx +----------+ gutter +----------+ mx     |
//!  |    |  before  |        |  after   |        |
//!  |    +----------+        +----------+        |
//!  |                margin_bottom               |
//!  +--------------------------------------------+
//! ```

use serde::{Deserialize, Serialize};
use vidstage_common::{Error, Result, Size};

/// Axis-aligned rectangle in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub const fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub const fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// True when the two rectangles share at least one pixel.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// Which of the two staged images a slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Left slot.
    Before,
    /// Right slot.
    After,
}

/// Canvas dimensions and the fractions that carve it into slots.
///
/// Margin and gutter fractions are relative to the canvas axis they run
/// along and are floored to whole pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasSpec {
    pub size: Size,
    /// Fraction of height reserved above the label bands.
    pub margin_top: f64,
    /// Fraction of height reserved below the slots.
    pub margin_bottom: f64,
    /// Fraction of width reserved on each side.
    pub margin_x: f64,
    /// Fraction of width between the two slots.
    pub gutter: f64,
    /// Height of the caption band above each slot, in pixels.
    pub label_band_height: u32,
    /// Space between a label band and the image below it, in pixels.
    pub label_gap: u32,
    /// Frame stroke width, in pixels.
    pub border_width: u32,
}

pub const DEFAULT_MARGIN_TOP: f64 = 0.05;
pub const DEFAULT_MARGIN_BOTTOM: f64 = 0.04;
pub const DEFAULT_MARGIN_X: f64 = 0.04;
pub const DEFAULT_GUTTER: f64 = 0.04;
const DEFAULT_LABEL_BAND: f64 = 0.045;
const DEFAULT_LABEL_GAP: f64 = 0.008;
const DEFAULT_BORDER: f64 = 0.01;
const MIN_LABEL_GAP: u32 = 6;
const MIN_BORDER_WIDTH: u32 = 6;

impl CanvasSpec {
    /// Canvas with the default layout tuned for portrait video frames.
    pub fn new(size: Size) -> Self {
        Self {
            size,
            margin_top: DEFAULT_MARGIN_TOP,
            margin_bottom: DEFAULT_MARGIN_BOTTOM,
            margin_x: DEFAULT_MARGIN_X,
            gutter: DEFAULT_GUTTER,
            label_band_height: fraction_of(size.height, DEFAULT_LABEL_BAND),
            label_gap: fraction_of(size.height, DEFAULT_LABEL_GAP).max(MIN_LABEL_GAP),
            border_width: fraction_of(size.width, DEFAULT_BORDER).max(MIN_BORDER_WIDTH),
        }
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// Check fractions and fixed bands before any arithmetic is attempted.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("margin_top", self.margin_top),
            ("margin_bottom", self.margin_bottom),
            ("margin_x", self.margin_x),
            ("gutter", self.gutter),
        ] {
            if !value.is_finite() || !(0.0..0.5).contains(&value) {
                return Err(Error::config(format!(
                    "{name} must be a fraction in [0, 0.5), got {value}"
                )));
            }
        }
        if self.label_band_height == 0 {
            return Err(Error::config("label_band_height must be positive"));
        }
        if self.border_width == 0 {
            return Err(Error::config("border_width must be positive"));
        }
        Ok(())
    }
}

/// Reserved regions for one side of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub side: Side,
    /// Bounding box the image must fit inside.
    pub image: Rect,
    /// Caption band directly above `image`, separated by the label gap.
    pub label: Rect,
}

/// Planned layout for both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotGeometry {
    pub canvas: Size,
    pub before: Slot,
    pub after: Slot,
    pub label_gap: u32,
    pub border_width: u32,
}

impl SlotGeometry {
    pub fn slot(&self, side: Side) -> &Slot {
        match side {
            Side::Before => &self.before,
            Side::After => &self.after,
        }
    }
}

/// Compute slot and label rectangles for `spec`.
///
/// Deterministic: the same spec always yields the same geometry. Fails with
/// a config error when any derived dimension would be zero or negative.
pub fn plan(spec: &CanvasSpec) -> Result<SlotGeometry> {
    spec.validate()?;

    let (w, h) = (spec.width(), spec.height());
    let margin_x = fraction_of(w, spec.margin_x);
    let gutter = fraction_of(w, spec.gutter);
    let margin_top = fraction_of(h, spec.margin_top);
    let margin_bottom = fraction_of(h, spec.margin_bottom);
    let label_h = spec.label_band_height;

    if margin_top < spec.label_gap {
        return Err(Error::config(format!(
            "top margin {margin_top}px cannot hold a {}px label gap on a {} canvas",
            spec.label_gap, spec.size
        )));
    }

    let region_w = margin_x
        .checked_mul(2)
        .and_then(|m| m.checked_add(gutter))
        .and_then(|reserved| w.checked_sub(reserved))
        .ok_or_else(|| too_small(spec, "width"))?;
    let region_top = margin_top
        .checked_add(label_h)
        .ok_or_else(|| too_small(spec, "height"))?;
    let region_h = region_top
        .checked_add(margin_bottom)
        .and_then(|reserved| h.checked_sub(reserved))
        .ok_or_else(|| too_small(spec, "height"))?;

    // Odd remainders stay unused on the right rather than being distributed.
    let slot_w = region_w / 2;
    if slot_w == 0 {
        return Err(too_small(spec, "width"));
    }
    if region_h == 0 {
        return Err(too_small(spec, "height"));
    }

    let label_top = margin_top - spec.label_gap;

    let slot_at = |side: Side, x: u32| Slot {
        side,
        image: Rect::new(x, region_top, slot_w, region_h),
        label: Rect::new(x, label_top, slot_w, label_h),
    };

    Ok(SlotGeometry {
        canvas: spec.size,
        before: slot_at(Side::Before, margin_x),
        after: slot_at(Side::After, margin_x + slot_w + gutter),
        label_gap: spec.label_gap,
        border_width: spec.border_width,
    })
}

fn too_small(spec: &CanvasSpec, axis: &str) -> Error {
    Error::config(format!(
        "canvas {} leaves no {axis} for the image slots",
        spec.size
    ))
}

/// Floor `total * fraction` to whole pixels.
///
/// A small epsilon keeps products like `100 * 0.29` from landing one pixel
/// short due to binary representation.
pub fn fraction_of(total: u32, fraction: f64) -> u32 {
    (f64::from(total) * fraction + 1e-9).floor() as u32
}

/// Largest size with the source aspect ratio that fits inside the box.
///
/// The result touches the box on the limiting axis and is never larger
/// than the box on either axis.
pub fn fit_inside(source: (u32, u32), bounds: (u32, u32)) -> Result<(u32, u32)> {
    let (sw, sh) = source;
    let (bw, bh) = bounds;
    if sw == 0 || sh == 0 {
        return Err(Error::config(format!("source image has zero size {sw}x{sh}")));
    }
    if bw == 0 || bh == 0 {
        return Err(Error::config(format!("target box has zero size {bw}x{bh}")));
    }

    let (sw, sh, bw64, bh64) = (u64::from(sw), u64::from(sh), u64::from(bw), u64::from(bh));
    if sw * bh64 >= sh * bw64 {
        let height = (sh * bw64 / sw).max(1) as u32;
        Ok((bw, height))
    } else {
        let width = (sw * bh64 / sh).max(1) as u32;
        Ok((width, bh))
    }
}

/// Where a resized image and its caption land on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub side: Side,
    /// Absolute bounds of the rendered image; the frame hugs this rect.
    pub image: Rect,
    /// Offset of `image` inside its slot.
    pub offset: (u32, u32),
    /// Caption band directly above the rendered image.
    pub label: Rect,
}

/// Center a source of the given size inside `slot`.
pub fn place(slot: &Slot, source: (u32, u32), label_gap: u32) -> Result<Placement> {
    let (width, height) = fit_inside(source, (slot.image.width, slot.image.height))?;
    let dx = (slot.image.width - width) / 2;
    let dy = (slot.image.height - height) / 2;
    let image = Rect::new(slot.image.x + dx, slot.image.y + dy, width, height);

    // The slot's own band sits at the same gap above the slot top, and dy
    // only pushes the image down, so the band stays inside the slot column.
    let label = Rect::new(
        image.x,
        image.y - label_gap - slot.label.height,
        width,
        slot.label.height,
    );

    Ok(Placement {
        side: slot.side,
        image,
        offset: (dx, dy),
        label,
    })
}

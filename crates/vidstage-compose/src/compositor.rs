//! Two-up compositing onto an opaque canvas.
//!
//! Layers are painted in a fixed order: background, images, frames,
//! captions. The result is flattened to RGB so the encoded file carries no
//! transparency.

use std::io::Cursor;
use std::path::Path;

use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder, Rgb, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::debug;
use vidstage_common::{Error, Result, Size};

use crate::caption::{draw_caption, CaptionStyle};
use crate::color::Color;
use crate::frame::{draw_rounded_frame, DEFAULT_RADIUS};
use crate::geometry::{place, plan, CanvasSpec, Placement, Side, SlotGeometry};

/// Label and colors for one side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideStyle {
    pub label: String,
    pub frame_color: Color,
    pub caption: CaptionStyle,
}

impl SideStyle {
    /// Frame and caption text share one color, with no caption bar.
    pub fn accent(label: impl Into<String>, color: Color) -> Self {
        Self {
            label: label.into(),
            frame_color: color,
            caption: CaptionStyle::text(color),
        }
    }
}

/// Every recognized compositing option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeOptions {
    /// Canvas fill under everything else.
    pub background: Color,
    /// Opaque color that any remaining transparency is flattened onto.
    pub matte: Color,
    /// Frame corner radius in pixels.
    pub frame_radius: u32,
    pub before: SideStyle,
    pub after: SideStyle,
}

impl Default for CompositeOptions {
    fn default() -> Self {
        Self {
            background: Color::WHITE,
            matte: Color::WHITE,
            frame_radius: DEFAULT_RADIUS,
            before: SideStyle::accent("BEFORE", Color::GREEN),
            after: SideStyle::accent("AFTER", Color::RED),
        }
    }
}

impl CompositeOptions {
    fn side(&self, side: Side) -> &SideStyle {
        match side {
            Side::Before => &self.before,
            Side::After => &self.after,
        }
    }
}

/// A source image resized for its slot.
#[derive(Debug, Clone)]
pub struct PlacedImage {
    pub placement: Placement,
    pub image: RgbaImage,
}

impl PlacedImage {
    /// Resize `source` to fit inside the slot for `side` and center it.
    pub fn fit(source: &DynamicImage, geometry: &SlotGeometry, side: Side) -> Result<Self> {
        let placement = place(geometry.slot(side), source.dimensions(), geometry.label_gap)?;
        let (w, h) = (placement.image.width, placement.image.height);
        let image = if source.dimensions() == (w, h) {
            source.to_rgba8()
        } else {
            source.resize_exact(w, h, FilterType::Lanczos3).to_rgba8()
        };
        Ok(Self { placement, image })
    }
}

/// Flattened output of a compositing run.
#[derive(Debug, Clone)]
pub struct Composite {
    pub image: RgbImage,
    pub before: Placement,
    pub after: Placement,
}

impl Composite {
    pub fn size(&self) -> Size {
        Size {
            width: self.image.width(),
            height: self.image.height(),
        }
    }

    /// Encode as PNG with maximum compression.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        PngEncoder::new_with_quality(&mut buf, CompressionType::Best, PngFilter::Adaptive)
            .write_image(
                self.image.as_raw(),
                self.image.width(),
                self.image.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| Error::encode(format!("failed to encode composite as PNG: {e}")))?;
        Ok(buf.into_inner())
    }

    /// Encode and write to `path`.
    pub fn save_png(&self, path: &Path) -> Result<()> {
        let bytes = self.to_png()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

/// Stages two images side by side on one canvas.
#[derive(Debug, Clone)]
pub struct Compositor {
    options: CompositeOptions,
}

impl Compositor {
    /// Validate options once up front.
    pub fn new(options: CompositeOptions) -> Result<Self> {
        if !options.matte.is_opaque() {
            return Err(Error::config(format!(
                "matte color {} must be opaque",
                options.matte
            )));
        }
        Ok(Self { options })
    }

    pub fn options(&self) -> &CompositeOptions {
        &self.options
    }

    /// Plan `spec` and composite encoded source images.
    pub fn compose_encoded(&self, before: &[u8], after: &[u8], spec: &CanvasSpec) -> Result<Composite> {
        let geometry = plan(spec)?;
        let before = decode(before).map_err(|e| with_side(e, Side::Before))?;
        let after = decode(after).map_err(|e| with_side(e, Side::After))?;
        self.compose(&before, &after, &geometry)
    }

    /// Composite decoded images into the planned slots.
    pub fn compose(
        &self,
        before: &DynamicImage,
        after: &DynamicImage,
        geometry: &SlotGeometry,
    ) -> Result<Composite> {
        let placed = [
            PlacedImage::fit(before, geometry, Side::Before)?,
            PlacedImage::fit(after, geometry, Side::After)?,
        ];

        let background = self.options.background.flatten_onto(self.options.matte);
        let mut canvas = RgbaImage::from_pixel(
            geometry.canvas.width,
            geometry.canvas.height,
            background.to_rgba(),
        );

        for p in &placed {
            debug!(
                side = ?p.placement.side,
                x = p.placement.image.x,
                y = p.placement.image.y,
                width = p.placement.image.width,
                height = p.placement.image.height,
                "placing image"
            );
            imageops::overlay(
                &mut canvas,
                &p.image,
                i64::from(p.placement.image.x),
                i64::from(p.placement.image.y),
            );
        }

        for p in &placed {
            draw_rounded_frame(
                &mut canvas,
                p.placement.image,
                self.options.side(p.placement.side).frame_color,
                geometry.border_width,
                self.options.frame_radius,
            );
        }

        for p in &placed {
            let style = self.options.side(p.placement.side);
            draw_caption(&mut canvas, p.placement.label, &style.label, &style.caption);
        }

        let [b, a] = placed;
        Ok(Composite {
            image: flatten(&canvas, self.options.matte),
            before: b.placement,
            after: a.placement,
        })
    }
}

/// Decode an image from memory, sniffing its format.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| Error::decode(format!("failed to decode image: {e}")))
}

/// Read and decode an image file.
pub fn open(path: &Path) -> Result<DynamicImage> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::decode(format!("failed to read image {}: {e}", path.display())))?;
    decode(&bytes).map_err(|e| match e {
        Error::Decode(msg) => Error::decode(format!("{}: {msg}", path.display())),
        other => other,
    })
}

fn with_side(err: Error, side: Side) -> Error {
    match err {
        Error::Decode(msg) => Error::decode(format!("{side:?} image: {msg}")),
        other => other,
    }
}

fn flatten(canvas: &RgbaImage, matte: Color) -> RgbImage {
    RgbImage::from_fn(canvas.width(), canvas.height(), |x, y| {
        let px = canvas.get_pixel(x, y);
        let c = Color::rgba(px[0], px[1], px[2], px[3]).flatten_onto(matte);
        Rgb([c.r, c.g, c.b])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use vidstage_common::ErrorKind;

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(rgb)))
    }

    fn portrait() -> CanvasSpec {
        CanvasSpec::new("720x1280".parse().unwrap())
    }

    fn compositor() -> Compositor {
        Compositor::new(CompositeOptions::default()).unwrap()
    }

    #[test]
    fn test_output_matches_canvas_and_is_opaque_rgb() {
        let geo = plan(&portrait()).unwrap();
        let out = compositor()
            .compose(&solid(1080, 1920, [0, 0, 255]), &solid(1920, 1080, [255, 200, 0]), &geo)
            .unwrap();
        assert_eq!(out.size(), Size { width: 720, height: 1280 });

        // Margin stays background white.
        assert_eq!(*out.image.get_pixel(2, 2), Rgb([255, 255, 255]));
        assert_eq!(*out.image.get_pixel(360, 1275), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_images_centered_with_frames_hugging_them() {
        let geo = plan(&portrait()).unwrap();
        let out = compositor()
            .compose(&solid(1080, 1920, [0, 0, 255]), &solid(1920, 1080, [255, 200, 0]), &geo)
            .unwrap();

        let b = out.before.image;
        let center = (b.x + b.width / 2, b.y + b.height / 2);
        assert_eq!(*out.image.get_pixel(center.0, center.1), Rgb([0, 0, 255]));
        // Frame stroke sits on the image's own left edge, mid-height.
        assert_eq!(*out.image.get_pixel(b.x + 2, center.1), Rgb([0x16, 0xA3, 0x4A]));

        let a = out.after.image;
        assert!(a.height < geo.after.image.height);
        assert_eq!(a.y - geo.after.image.y, (geo.after.image.height - a.height) / 2);
        assert_eq!(*out.image.get_pixel(a.x + 2, a.y + a.height / 2), Rgb([0xDC, 0x26, 0x26]));
        // Just outside the landscape image's frame is background, not red.
        assert_eq!(*out.image.get_pixel(a.x + a.width / 2, a.y - 2), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_matching_aspect_fills_slot() {
        let geo = plan(&portrait()).unwrap();
        let slot = geo.before.image;
        let src = solid(slot.width / 2, slot.height / 2, [10, 20, 30]);
        let out = compositor().compose(&src, &src, &geo).unwrap();
        assert_eq!(out.before.image, slot);
        assert_eq!(out.before.offset, (0, 0));
    }

    #[test]
    fn test_never_crops() {
        let geo = plan(&portrait()).unwrap();
        for (w, h) in [(5000, 20), (20, 5000), (300, 300), (719, 1281)] {
            let placed = PlacedImage::fit(&solid(w, h, [0, 0, 0]), &geo, Side::After).unwrap();
            assert!(geo.after.image.contains(&placed.placement.image), "{w}x{h}");
            assert_eq!(
                (placed.image.width(), placed.image.height()),
                (placed.placement.image.width, placed.placement.image.height)
            );
        }
    }

    #[test]
    fn test_captions_drawn_above_images() {
        let geo = plan(&portrait()).unwrap();
        let out = compositor()
            .compose(&solid(100, 100, [0, 0, 0]), &solid(100, 100, [0, 0, 0]), &geo)
            .unwrap();
        let band = out.before.label;
        let green = Rgb([0x16, 0xA3, 0x4A]);
        let found = (band.y..band.bottom())
            .flat_map(|y| (band.x..band.right()).map(move |x| (x, y)))
            .any(|(x, y)| *out.image.get_pixel(x, y) == green);
        assert!(found, "no caption pixels in before label band");
    }

    #[test]
    fn test_transparent_source_flattened_onto_background() {
        let geo = plan(&portrait()).unwrap();
        let clear = DynamicImage::ImageRgba8(RgbaImage::from_pixel(200, 200, Rgba([0, 0, 0, 0])));
        let out = compositor().compose(&clear, &clear, &geo).unwrap();
        let b = out.before.image;
        assert_eq!(
            *out.image.get_pixel(b.x + b.width / 2, b.y + b.height / 2),
            Rgb([255, 255, 255])
        );
    }

    #[test]
    fn test_compose_encoded_rejects_garbage() {
        let mut png = Cursor::new(Vec::new());
        solid(10, 10, [1, 2, 3]).write_to(&mut png, ImageFormat::Png).unwrap();

        let err = compositor()
            .compose_encoded(&png.into_inner(), b"definitely not an image", &portrait())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.to_string().contains("After"));
    }

    #[test]
    fn test_compose_encoded_propagates_config_error() {
        let spec = CanvasSpec::new("40x40".parse().unwrap());
        let err = compositor().compose_encoded(b"", b"", &spec).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_png_round_trip_dimensions() {
        let geo = plan(&portrait()).unwrap();
        let out = compositor()
            .compose(&solid(50, 80, [9, 9, 9]), &solid(80, 50, [9, 9, 9]), &geo)
            .unwrap();
        let decoded = image::load_from_memory(&out.to_png().unwrap()).unwrap();
        assert_eq!(decoded.dimensions(), (720, 1280));
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn test_translucent_matte_rejected() {
        let options = CompositeOptions {
            matte: Color::rgba(255, 255, 255, 10),
            ..CompositeOptions::default()
        };
        assert_eq!(Compositor::new(options).unwrap_err().kind(), ErrorKind::Config);
    }
}

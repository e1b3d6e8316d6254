//! # vidstage-compose
//!
//! Builds the reference image handed to a video-generation job: two source
//! images staged side by side on a fixed-size canvas, each resized to fit
//! its slot without cropping, framed, and captioned.
//!
//! - [`geometry`] plans the slot and label rectangles (pure integer math).
//! - [`compositor`] resizes, places, frames and captions the images.
//!
//! ## Example
//!
//! ```no_run
//! use vidstage_compose::{CanvasSpec, CompositeOptions, Compositor};
//!
//! let spec = CanvasSpec::new("720x1280".parse()?);
//! let before = std::fs::read("before.png")?;
//! let after = std::fs::read("after.png")?;
//! let composite = Compositor::new(CompositeOptions::default())?
//!     .compose_encoded(&before, &after, &spec)?;
//! composite.save_png("before_after.png".as_ref())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod caption;
pub mod color;
pub mod compositor;
pub mod frame;
pub mod geometry;

pub use caption::{CaptionOptions, CaptionStyle};
pub use color::Color;
pub use compositor::{decode, open, Composite, CompositeOptions, Compositor, PlacedImage, SideStyle};
pub use geometry::{fit_inside, plan, CanvasSpec, Placement, Rect, Side, Slot, SlotGeometry};

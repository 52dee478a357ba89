//! Watermarking of uploaded member photos.
//!
//! A caption is tiled diagonally across the photo at low opacity and the
//! result is re-encoded as PNG or JPEG. Everything here is a pure transform:
//! no IO besides the one-time font load.

pub mod compositor;
pub mod error;
pub mod font;

pub use compositor::{DEFAULT_ANGLE, OutputFormat, WatermarkJob, Watermarked, apply};
pub use error::{FontError, WatermarkError};
pub use font::CaptionFont;

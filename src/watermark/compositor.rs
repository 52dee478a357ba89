//! Tiled caption watermark.
//!
//! The caption is rendered once, rotated, and stamped across a transparent
//! layer in a staggered pattern before the layer is blended over the photo.

use image::codecs::{jpeg::JpegEncoder, png::PngEncoder};
use image::{ColorType, DynamicImage, ImageEncoder, Rgba, RgbaImage};
use std::io::Cursor;

use super::error::WatermarkError;
use super::font::CaptionFont;

pub const DEFAULT_ANGLE: f32 = 20.0;
/// Caption fill: white at low alpha.
pub const CAPTION_COLOR: Rgba<u8> = Rgba([255, 255, 255, 80]);
pub const JPEG_QUALITY: u8 = 90;

const FONT_SIZE_RATIO: f32 = 0.025;
const STEP_X_RATIO: f32 = 0.8;
const STEP_Y_RATIO: f32 = 1.6;

/// Encoding of a watermarked image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    /// PNG only when the extension is exactly `png` (any case); everything
    /// else is normalized to JPEG.
    pub fn from_filename(filename: &str) -> Self {
        let ext = filename.rsplit('.').next().unwrap_or_default();
        if ext.eq_ignore_ascii_case("png") {
            Self::Png
        } else {
            Self::Jpeg
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// Input of a single watermark pass.
#[derive(Debug, Clone, Copy)]
pub struct WatermarkJob<'a> {
    pub image: &'a [u8],
    pub caption: &'a str,
    /// Counter-clockwise rotation in degrees.
    pub angle: f32,
    /// Only consulted to pick the output format.
    pub filename: &'a str,
}

#[derive(Debug, Clone)]
pub struct Watermarked {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

impl Watermarked {
    /// The encoded image positioned at its first byte.
    pub fn into_reader(self) -> Cursor<Vec<u8>> {
        Cursor::new(self.bytes)
    }
}

/// Decode, stamp and re-encode an image.
pub fn apply(job: &WatermarkJob<'_>, font: &CaptionFont) -> Result<Watermarked, WatermarkError> {
    let mut base = image::load_from_memory(job.image)
        .map_err(WatermarkError::Decode)?
        .to_rgba8();
    let (width, height) = base.dimensions();

    let caption = font.render(job.caption, caption_px(width), CAPTION_COLOR);
    let tile = rotate_bicubic(&caption, job.angle);

    let layer = tile_layer(&tile, width, height);
    composite_over(&mut base, &layer, 0, 0);

    let format = OutputFormat::from_filename(job.filename);
    let rgb = DynamicImage::ImageRgba8(base).to_rgb8();
    let bytes = encode(rgb.as_raw(), width, height, format)?;

    Ok(Watermarked {
        bytes,
        format,
        width,
        height,
    })
}

/// Caption pixel size for an image `width` pixels wide.
pub(crate) fn caption_px(width: u32) -> f32 {
    (width as f32 * FONT_SIZE_RATIO).floor().max(1.0)
}

/// Offsets for one axis: from one tile outside the leading edge until past
/// the trailing edge plus one tile.
pub(crate) fn tile_offsets(extent: u32, tile: u32, ratio: f32) -> impl Iterator<Item = i64> {
    let tile = tile as i64;
    let step = ((tile as f32 * ratio) as i64).max(1) as usize;
    (-tile..extent as i64 + tile).step_by(step)
}

/// Stamp `tile` over a transparent layer of the given size.
pub(crate) fn tile_layer(tile: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let mut layer = RgbaImage::new(width, height);
    let (tw, th) = tile.dimensions();
    for x in tile_offsets(width, tw, STEP_X_RATIO) {
        for y in tile_offsets(height, th, STEP_Y_RATIO) {
            composite_over(&mut layer, tile, x, y);
        }
    }
    layer
}

/// Blend `src` over `dst` with its top-left at (`x`, `y`), clipped to `dst`.
pub(crate) fn composite_over(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    let (dw, dh) = (dst.width() as i64, dst.height() as i64);
    let (sw, sh) = (src.width() as i64, src.height() as i64);

    let x_start = x.max(0);
    let y_start = y.max(0);
    let x_end = (x + sw).min(dw);
    let y_end = (y + sh).min(dh);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let fg = *src.get_pixel((tx - x) as u32, (ty - y) as u32);
            if fg[3] == 0 {
                continue;
            }
            let bg = dst.get_pixel_mut(tx as u32, ty as u32);
            *bg = blend_over(*bg, fg);
        }
    }
}

/// Porter-Duff "over" on straight-alpha pixels.
fn blend_over(bg: Rgba<u8>, fg: Rgba<u8>) -> Rgba<u8> {
    let fa = fg[3] as f32 / 255.0;
    let ba = bg[3] as f32 / 255.0;
    let out_a = fa + ba * (1.0 - fa);
    if out_a <= f32::EPSILON {
        return Rgba([0, 0, 0, 0]);
    }
    let channel = |f: u8, b: u8| -> u8 {
        let v = (f as f32 * fa + b as f32 * ba * (1.0 - fa)) / out_a;
        v.round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        channel(fg[0], bg[0]),
        channel(fg[1], bg[1]),
        channel(fg[2], bg[2]),
        (out_a * 255.0).round() as u8,
    ])
}

/// Rotate counter-clockwise by `degrees`, growing the canvas to hold the whole
/// result. Samples with a bicubic kernel on premultiplied color.
pub(crate) fn rotate_bicubic(src: &RgbaImage, degrees: f32) -> RgbaImage {
    let (sw, sh) = (src.width() as f32, src.height() as f32);
    let theta = degrees.to_radians();
    let (sin, cos) = theta.sin_cos();

    // trim float noise so right angles do not gain a pixel
    let dw = (sw * cos.abs() + sh * sin.abs() - 1e-3).ceil().max(1.0) as u32;
    let dh = (sw * sin.abs() + sh * cos.abs() - 1e-3).ceil().max(1.0) as u32;
    let mut out = RgbaImage::new(dw, dh);

    let (scx, scy) = (sw / 2.0, sh / 2.0);
    let (dcx, dcy) = (dw as f32 / 2.0, dh as f32 / 2.0);

    for dy in 0..dh {
        for dx in 0..dw {
            let rx = dx as f32 + 0.5 - dcx;
            let ry = dy as f32 + 0.5 - dcy;
            // inverse of the counter-clockwise rotation in y-down space
            let sx = rx * cos - ry * sin + scx;
            let sy = rx * sin + ry * cos + scy;
            if sx < -2.0 || sy < -2.0 || sx > sw + 2.0 || sy > sh + 2.0 {
                continue;
            }
            out.put_pixel(dx, dy, sample_bicubic(src, sx - 0.5, sy - 0.5));
        }
    }
    out
}

fn cubic_weight(t: f32) -> f32 {
    const A: f32 = -0.5;
    let t = t.abs();
    if t <= 1.0 {
        ((A + 2.0) * t - (A + 3.0)) * t * t + 1.0
    } else if t < 2.0 {
        ((A * t - 5.0 * A) * t + 8.0 * A) * t - 4.0 * A
    } else {
        0.0
    }
}

/// Sample at pixel-center coordinates; outside pixels are transparent.
fn sample_bicubic(src: &RgbaImage, x: f32, y: f32) -> Rgba<u8> {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (w, h) = (src.width() as i64, src.height() as i64);

    let mut acc = [0.0f32; 4];
    for j in -1..=2i64 {
        let wy = cubic_weight(fy - j as f32);
        let py = y0 as i64 + j;
        if py < 0 || py >= h || wy == 0.0 {
            continue;
        }
        for i in -1..=2i64 {
            let wx = cubic_weight(fx - i as f32);
            let px = x0 as i64 + i;
            if px < 0 || px >= w || wx == 0.0 {
                continue;
            }
            let p = src.get_pixel(px as u32, py as u32);
            let a = p[3] as f32;
            let weight = wx * wy;
            acc[0] += p[0] as f32 * a * weight;
            acc[1] += p[1] as f32 * a * weight;
            acc[2] += p[2] as f32 * a * weight;
            acc[3] += a * weight;
        }
    }

    let alpha = acc[3].clamp(0.0, 255.0);
    if alpha < 0.5 {
        return Rgba([0, 0, 0, 0]);
    }
    let unpremultiply = |c: f32| (c / acc[3]).round().clamp(0.0, 255.0) as u8;
    Rgba([
        unpremultiply(acc[0]),
        unpremultiply(acc[1]),
        unpremultiply(acc[2]),
        alpha.round() as u8,
    ])
}

fn encode(rgb: &[u8], width: u32, height: u32, format: OutputFormat) -> Result<Vec<u8>, WatermarkError> {
    let mut buf = Vec::new();
    match format {
        OutputFormat::Png => PngEncoder::new(&mut buf).write_image(rgb, width, height, ColorType::Rgb8),
        OutputFormat::Jpeg => JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY)
            .write_image(rgb, width, height, ColorType::Rgb8),
    }
    .map_err(WatermarkError::Encode)?;
    Ok(buf)
}

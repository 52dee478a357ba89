//! Caption fonts.
//!
//! A TrueType font is loaded once at startup. When it is missing or broken the
//! caption is drawn with a small built-in bitmap font instead, so a watermark is
//! always produced.

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use std::path::Path;
use tracing::{info, warn};

use super::error::FontError;

/// Transparent margin around the caption on every side.
pub const CAPTION_PADDING: u32 = 10;

const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;
const GLYPH_ADVANCE: u32 = GLYPH_W + 1;

/// Read and parse a TrueType/OpenType font file.
pub fn load_truetype(path: &Path) -> Result<FontVec, FontError> {
    let data = std::fs::read(path).map_err(|source| FontError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    FontVec::try_from_vec(data).map_err(|source| FontError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Font used to draw the watermark caption.
pub enum CaptionFont {
    TrueType(FontVec),
    Builtin,
}

impl std::fmt::Debug for CaptionFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TrueType(_) => f.write_str("CaptionFont::TrueType"),
            Self::Builtin => f.write_str("CaptionFont::Builtin"),
        }
    }
}

impl CaptionFont {
    /// Load `path` if given, falling back to the built-in font on any failure.
    pub fn load_or_builtin(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::Builtin;
        };
        match load_truetype(path) {
            Ok(font) => {
                info!(path = %path.display(), "loaded caption font");
                Self::TrueType(font)
            }
            Err(e) => {
                warn!(error = %e, "caption font unavailable; using built-in font");
                Self::Builtin
            }
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin)
    }

    /// Measure the ink box of `text` at `px` pixels.
    pub fn measure(&self, text: &str, px: f32) -> (u32, u32) {
        match self {
            Self::TrueType(font) => {
                let scaled = font.as_scaled(PxScale::from(px));
                let mut width = 0.0f32;
                let mut prev: Option<ab_glyph::GlyphId> = None;
                for c in text.chars() {
                    let id = scaled.glyph_id(c);
                    if let Some(p) = prev {
                        width += scaled.kern(p, id);
                    }
                    width += scaled.h_advance(id);
                    prev = Some(id);
                }
                (width.ceil() as u32, scaled.height().ceil() as u32)
            }
            Self::Builtin => {
                let scale = builtin_scale(px);
                let n = text.chars().count() as u32;
                let width = (n * GLYPH_ADVANCE).saturating_sub(1) * scale;
                (width, GLYPH_H * scale)
            }
        }
    }

    /// Draw `text` onto a transparent canvas sized to its measured box plus
    /// [`CAPTION_PADDING`] on each side.
    pub fn render(&self, text: &str, px: f32, color: Rgba<u8>) -> RgbaImage {
        let (w, h) = self.measure(text, px);
        let mut canvas = RgbaImage::new(w + 2 * CAPTION_PADDING, h + 2 * CAPTION_PADDING);
        match self {
            Self::TrueType(font) => draw_truetype(&mut canvas, font, text, px, color),
            Self::Builtin => draw_builtin(&mut canvas, text, builtin_scale(px), color),
        }
        canvas
    }
}

fn builtin_scale(px: f32) -> u32 {
    ((px / 8.0).floor() as u32).max(1)
}

fn draw_truetype(canvas: &mut RgbaImage, font: &FontVec, text: &str, px: f32, color: Rgba<u8>) {
    let scale = PxScale::from(px);
    let scaled = font.as_scaled(scale);
    let baseline = CAPTION_PADDING as f32 + scaled.ascent();
    let (cw, ch) = (canvas.width() as i32, canvas.height() as i32);

    let mut cursor = CAPTION_PADDING as f32;
    let mut prev: Option<ab_glyph::GlyphId> = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(p) = prev {
            cursor += scaled.kern(p, id);
        }
        let glyph = id.with_scale_and_position(scale, ab_glyph::point(cursor, baseline));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let x = gx as i32 + bounds.min.x as i32;
                let y = gy as i32 + bounds.min.y as i32;
                if x < 0 || y < 0 || x >= cw || y >= ch {
                    return;
                }
                let a = (coverage.clamp(0.0, 1.0) * color[3] as f32) as u8;
                let px = canvas.get_pixel_mut(x as u32, y as u32);
                // overlapping glyph edges keep the stronger coverage
                if a > px[3] {
                    *px = Rgba([color[0], color[1], color[2], a]);
                }
            });
        }
        cursor += scaled.h_advance(id);
        prev = Some(id);
    }
}

fn draw_builtin(canvas: &mut RgbaImage, text: &str, scale: u32, color: Rgba<u8>) {
    for (i, c) in text.chars().enumerate() {
        let rows = builtin_glyph(c);
        let origin_x = CAPTION_PADDING + i as u32 * GLYPH_ADVANCE * scale;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_W {
                if bits & (1 << (GLYPH_W - 1 - col)) == 0 {
                    continue;
                }
                let x0 = origin_x + col * scale;
                let y0 = CAPTION_PADDING + row as u32 * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        canvas.put_pixel(x0 + dx, y0 + dy, color);
                    }
                }
            }
        }
    }
}

/// 5x7 bitmap rows, most significant of the low five bits is the leftmost
/// column. Lowercase letters fold to uppercase; anything else without a glyph
/// is drawn as a hollow box.
fn builtin_glyph(c: char) -> [u8; 7] {
    match c.to_ascii_uppercase() {
        ' ' => [0; 7],
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
        'Y' => [0b10001, 0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100],
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
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        '_' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b11111],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        ',' => [0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b00100, 0b01000],
        ':' => [0b00000, 0b01100, 0b01100, 0b00000, 0b01100, 0b01100, 0b00000],
        '!' => [0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00000, 0b00100],
        '?' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b00000, 0b00100],
        '/' => [0b00001, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b10000],
        '@' => [0b01110, 0b10001, 0b10111, 0b10101, 0b10111, 0b10000, 0b01110],
        _ => [0b11111, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11111],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 80]);

    #[test]
    fn missing_font_file_falls_back_to_builtin() {
        let font = CaptionFont::load_or_builtin(Some(Path::new("/definitely/not/here.ttf")));
        assert!(font.is_builtin());
    }

    #[test]
    fn garbage_font_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").unwrap();

        let err = load_truetype(&path).unwrap_err();
        assert!(matches!(err, FontError::Parse { .. }));
        assert!(CaptionFont::load_or_builtin(Some(&path)).is_builtin());
    }

    #[test]
    fn no_font_path_uses_builtin() {
        assert!(CaptionFont::load_or_builtin(None).is_builtin());
    }

    #[test]
    fn builtin_measure_scales_with_size() {
        let font = CaptionFont::Builtin;
        assert_eq!(font.measure("AB", 5.0), (11, 7));
        assert_eq!(font.measure("AB", 16.0), (22, 14));
        assert_eq!(font.measure("", 16.0), (0, 14));
    }

    #[test]
    fn builtin_render_pads_and_uses_color() {
        let font = CaptionFont::Builtin;
        let img = font.render("HI", 8.0, WHITE);
        assert_eq!(img.dimensions(), (11 + 20, 7 + 20));

        // padding stays transparent
        assert_eq!(img.get_pixel(0, 0)[3], 0);
        assert_eq!(img.get_pixel(9, 9)[3], 0);
        // top-left stroke of 'H'
        assert_eq!(*img.get_pixel(10, 10), WHITE);
        assert!(img.pixels().all(|p| p[3] == 0 || *p == WHITE));
    }

    #[test]
    fn lowercase_folds_to_uppercase() {
        assert_eq!(builtin_glyph('q'), builtin_glyph('Q'));
        assert_ne!(builtin_glyph('~'), [0; 7]);
    }

    fn fixture_font() -> CaptionFont {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/DejaVuSansMono.ttf");
        CaptionFont::TrueType(load_truetype(&path).unwrap())
    }

    #[test]
    fn truetype_render_is_measured_box_plus_padding() {
        let font = fixture_font();
        for px in [10.0, 24.0] {
            let (w, h) = font.measure("ORACLE-BOOTCAMP", px);
            assert!(w > 0 && h > 0);
            let img = font.render("ORACLE-BOOTCAMP", px, WHITE);
            assert_eq!(img.dimensions(), (w + 2 * CAPTION_PADDING, h + 2 * CAPTION_PADDING));
        }
    }

    #[test]
    fn truetype_measure_grows_with_size() {
        let font = fixture_font();
        let small = font.measure("AB", 10.0);
        let large = font.measure("AB", 20.0);
        assert!(large.0 > small.0);
        assert!(large.1 > small.1);
    }

    #[test]
    fn truetype_render_uses_caption_color_and_alpha() {
        let font = fixture_font();
        let img = font.render("HI", 24.0, WHITE);

        assert_eq!(img.get_pixel(0, 0)[3], 0);
        let inked: Vec<_> = img.pixels().filter(|p| p[3] > 0).collect();
        assert!(!inked.is_empty());
        assert!(inked.iter().all(|p| p[0] == 255 && p[1] == 255 && p[2] == 255 && p[3] <= 80));
        assert!(inked.iter().any(|p| p[3] >= 70));
    }
}

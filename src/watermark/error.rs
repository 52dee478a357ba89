//! Watermark error types.

use std::path::PathBuf;
use thiserror::Error as ThisError;

/// Errors that abort a watermark job.
#[derive(Debug, ThisError)]
pub enum WatermarkError {
    /// Input bytes are not a decodable raster image.
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// The composited image could not be re-encoded.
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
}

/// Errors loading a caption font. Callers fall back to the built-in font.
#[derive(Debug, ThisError)]
pub enum FontError {
    #[error("failed to read font {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid font data in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ab_glyph::InvalidFont,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_error_names_the_path() {
        let err = FontError::Read {
            path: PathBuf::from("/nope/arial.ttf"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/nope/arial.ttf"));
        assert!(msg.contains("missing"));
    }
}

//! Label text measurement.

use std::path::Path;

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use kurbo::Size;

use crate::error::DotsError;

/// Measures rendered text. Implemented by whatever owns the font.
pub trait FontMetrics {
    /// Bounding size of `text` rendered at `font_size` pixels.
    fn text_size(&self, text: &str, font_size: f64) -> Result<Size, DotsError>;
}

/// Every character gets the same advance; sizes are fractions of the em.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedAdvance {
    pub advance: f64,
    pub height: f64,
}

impl Default for FixedAdvance {
    fn default() -> Self {
        // Roughly the digit proportions of common sans-serif faces.
        Self {
            advance: 0.6,
            height: 0.72,
        }
    }
}

impl FontMetrics for FixedAdvance {
    fn text_size(&self, text: &str, font_size: f64) -> Result<Size, DotsError> {
        let chars = text.chars().count() as f64;
        Ok(Size::new(
            chars * self.advance * font_size,
            self.height * font_size,
        ))
    }
}

/// Metrics from a real TrueType/OpenType font.
pub struct GlyphMetrics {
    font: FontVec,
}

impl GlyphMetrics {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, DotsError> {
        let font = FontVec::try_from_vec(data)
            .map_err(|e| DotsError::FontMetrics(e.to_string()))?;
        Ok(GlyphMetrics { font })
    }

    pub fn load(path: &Path) -> Result<Self, DotsError> {
        let data = std::fs::read(path)
            .map_err(|e| DotsError::FontMetrics(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(data)
    }
}

impl FontMetrics for GlyphMetrics {
    fn text_size(&self, text: &str, font_size: f64) -> Result<Size, DotsError> {
        if !(font_size > 0.0) {
            return Err(DotsError::FontMetrics(format!(
                "invalid font size {}",
                font_size
            )));
        }
        let scaled = self.font.as_scaled(PxScale::from(font_size as f32));
        let mut width = 0.0f32;
        let mut prev = None;
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(p) = prev {
                width += scaled.kern(p, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }
        let height = scaled.ascent() - scaled.descent();
        Ok(Size::new(width as f64, height as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_advance_scales_with_length_and_size() {
        let m = FixedAdvance::default();
        let one = m.text_size("7", 10.0).unwrap();
        let three = m.text_size("123", 10.0).unwrap();
        assert!((one.width - 6.0).abs() < 1e-9);
        assert!((three.width - 18.0).abs() < 1e-9);
        assert!((three.height - 7.2).abs() < 1e-9);
    }

    #[test]
    fn garbage_font_is_rejected() {
        let err = GlyphMetrics::from_bytes(vec![0, 1, 2, 3]);
        assert!(matches!(err, Err(DotsError::FontMetrics(_))));
    }
}

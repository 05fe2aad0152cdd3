//! Timestamp overlay.
//!
//! The label is rasterised with `ab_glyph` and alpha-blended onto a copy of
//! the decoded frame. Only pixels under glyph coverage are written, and the
//! rectangle enclosing them is reported back as the [`LabelRegion`].

use std::path::Path;

use ab_glyph::{point, Font, FontArc, GlyphId, PxScale, ScaleFont};
use image::Rgba;
use tracing::info;

use crate::error::{FontError, GlyphRenderError};
use crate::pipeline::label::LABEL_CHARSET;
use crate::pipeline::PixelBuffer;

/// Fixed styling for the overlay. Size is in points at 72 DPI, so one point
/// is one pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub size: f32,
    pub color: Rgba<u8>,
    /// Offset of the label's top-left corner from the image's top-left.
    pub margin_x: u32,
    pub margin_y: u32,
}

/// Pixel rectangle the label touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl LabelRegion {
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }

    fn include(region: Option<Self>, x: u32, y: u32) -> Self {
        match region {
            None => Self {
                x,
                y,
                width: 1,
                height: 1,
            },
            Some(r) => {
                let min_x = r.x.min(x);
                let min_y = r.y.min(y);
                let max_x = (r.x + r.width).max(x + 1);
                let max_y = (r.y + r.height).max(y + 1);
                Self {
                    x: min_x,
                    y: min_y,
                    width: max_x - min_x,
                    height: max_y - min_y,
                }
            }
        }
    }
}

/// Annotated copy of a frame.
pub struct Annotated {
    pub image: PixelBuffer,
    /// `None` when the label fell entirely outside the image.
    pub region: Option<LabelRegion>,
}

/// Draws timestamp labels with a font loaded once at startup.
pub struct Annotator {
    font: FontArc,
    style: OverlayStyle,
    /// `ab_glyph` scales by ascent minus descent; this makes the em box
    /// exactly `style.size` pixels tall.
    scale: PxScale,
}

impl Annotator {
    /// Load the overlay font from disk.
    pub fn load(path: &Path, style: OverlayStyle) -> Result<Self, FontError> {
        let bytes = std::fs::read(path).map_err(|source| FontError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let annotator = Self::from_bytes(bytes, style)?;
        info!("Loaded overlay font {}", path.display());
        Ok(annotator)
    }

    /// Parse font data and check it can draw every label character.
    pub fn from_bytes(bytes: Vec<u8>, style: OverlayStyle) -> Result<Self, FontError> {
        let font = FontArc::try_from_vec(bytes).map_err(|_| FontError::Parse)?;
        let units_per_em = font.units_per_em().ok_or(FontError::MissingMetrics)?;
        let scale = PxScale::from(style.size * font.height_unscaled() / units_per_em);

        if let Some(missing) = LABEL_CHARSET
            .chars()
            .find(|&ch| !ch.is_whitespace() && font.glyph_id(ch) == GlyphId(0))
        {
            return Err(FontError::MissingGlyph(missing));
        }

        Ok(Self { font, style, scale })
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Height of the em box in pixels at the configured size.
    pub fn em_px(&self) -> f32 {
        let units_per_em = self.font.units_per_em().unwrap_or(1.0);
        self.font.as_scaled(self.scale).scale_factor().vertical * units_per_em
    }

    /// Copy `source` and draw `label` onto the copy.
    pub fn annotate(&self, source: &PixelBuffer, label: &str) -> Result<Annotated, GlyphRenderError> {
        let mut image = source.clone();
        let (width, height) = image.dimensions();

        let scale = self.scale;
        let scaled = self.font.as_scaled(scale);
        let baseline = self.style.margin_y as f32 + scaled.ascent();
        let fg = self.style.color;

        let mut caret = self.style.margin_x as f32;
        let mut previous: Option<GlyphId> = None;
        let mut region: Option<LabelRegion> = None;

        for ch in label.chars() {
            let id = self.font.glyph_id(ch);
            if id == GlyphId(0) && !ch.is_whitespace() {
                return Err(GlyphRenderError::MissingGlyph(ch));
            }
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            let glyph = id.with_scale_and_position(scale, point(caret, baseline));
            caret += scaled.h_advance(id);
            previous = Some(id);

            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let x = bounds.min.x as i64 + gx as i64;
                let y = bounds.min.y as i64 + gy as i64;
                if coverage <= 0.0 || x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
                    return;
                }
                let (x, y) = (x as u32, y as u32);
                blend(image.get_pixel_mut(x, y), fg, coverage);
                region = Some(LabelRegion::include(region, x, y));
            });
        }

        Ok(Annotated { image, region })
    }
}

/// Source-over blend of `fg` at `coverage` onto `dst`.
fn blend(dst: &mut Rgba<u8>, fg: Rgba<u8>, coverage: f32) {
    let alpha = coverage.min(1.0) * fg[3] as f32 / 255.0;
    for c in 0..3 {
        let mixed = fg[c] as f32 * alpha + dst[c] as f32 * (1.0 - alpha);
        dst[c] = mixed.round() as u8;
    }
    let out_alpha = 255.0 * alpha + dst[3] as f32 * (1.0 - alpha);
    dst[3] = out_alpha.round() as u8;
}

//! Decode → annotate → encode.
//!
//! Every stage is synchronous and CPU bound; the scheduler runs them on the
//! blocking pool one at a time. Buffers are owned by a single cycle and never
//! shared.

pub mod annotate;
pub mod decoder;
pub mod encoder;
pub mod label;
#[cfg(test)]
pub(crate) mod testing;

use bytes::Bytes;
use image::RgbaImage;

pub use annotate::{Annotated, Annotator, LabelRegion, OverlayStyle};
pub use decoder::decode_frame;
pub use encoder::encode_image;
pub use label::format_label;

use crate::capture::{RawFrame, SnapshotFormat};
use crate::error::{DecodeError, EncodeError, GlyphRenderError};

/// Decoded image owned by the in-progress cycle.
pub type PixelBuffer = RgbaImage;

/// The frame-processing stages with their fixed parameters.
pub struct Pipeline {
    annotator: Annotator,
    input: SnapshotFormat,
    output: SnapshotFormat,
    quality: u8,
}

impl Pipeline {
    pub fn new(annotator: Annotator, input: SnapshotFormat, output: SnapshotFormat, quality: u8) -> Self {
        Self {
            annotator,
            input,
            output,
            quality,
        }
    }

    pub fn decode(&self, frame: &RawFrame) -> Result<PixelBuffer, DecodeError> {
        decode_frame(frame, self.input)
    }

    pub fn annotate(&self, image: &PixelBuffer, label: &str) -> Result<Annotated, GlyphRenderError> {
        self.annotator.annotate(image, label)
    }

    pub fn encode(&self, image: &PixelBuffer) -> Result<Bytes, EncodeError> {
        encode_image(image, self.output, self.quality)
    }

    pub fn output_format(&self) -> SnapshotFormat {
        self.output
    }
}

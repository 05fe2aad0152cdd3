//! Fixtures shared by unit tests.

use image::Rgba;

use crate::capture::{RawFrame, SnapshotFormat};
use crate::pipeline::{encode_image, Annotator, OverlayStyle, PixelBuffer};

pub(crate) const TEST_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

pub(crate) fn style() -> OverlayStyle {
    OverlayStyle {
        size: 24.0,
        color: Rgba([255, 255, 0, 255]),
        margin_x: 10,
        margin_y: 10,
    }
}

pub(crate) fn annotator() -> Annotator {
    Annotator::from_bytes(TEST_FONT.to_vec(), style()).unwrap()
}

/// Opaque gradient, so every pixel differs from the overlay colour.
pub(crate) fn sample_image(width: u32, height: u32) -> PixelBuffer {
    PixelBuffer::from_fn(width, height, |x, y| {
        Rgba([(x % 200) as u8, (y % 200) as u8, 128, 255])
    })
}

pub(crate) fn encoded_frame(image: &PixelBuffer, format: SnapshotFormat) -> RawFrame {
    RawFrame::new(encode_image(image, format, 90).unwrap())
}

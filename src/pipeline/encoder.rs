use bytes::Bytes;
use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};

use crate::capture::SnapshotFormat;
use crate::error::EncodeError;
use crate::pipeline::PixelBuffer;

/// Compress an annotated frame. `quality` only applies to JPEG.
pub fn encode_image(
    image: &PixelBuffer,
    format: SnapshotFormat,
    quality: u8,
) -> Result<Bytes, EncodeError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(EncodeError::EmptyImage { width, height });
    }

    let mut out = Vec::with_capacity(width as usize * height as usize / 4);
    match format {
        SnapshotFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb: RgbImage = image.convert();
            JpegEncoder::new_with_quality(&mut out, quality).encode_image(&rgb)?;
        }
        SnapshotFormat::Png => {
            PngEncoder::new(&mut out).write_image(
                image.as_raw(),
                width,
                height,
                ExtendedColorType::Rgba8,
            )?;
        }
    }

    Ok(Bytes::from(out))
}

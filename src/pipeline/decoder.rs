use crate::capture::{RawFrame, SnapshotFormat};
use crate::error::DecodeError;
use crate::pipeline::PixelBuffer;

/// Decode a captured frame into an opaque RGBA copy.
pub fn decode_frame(frame: &RawFrame, format: SnapshotFormat) -> Result<PixelBuffer, DecodeError> {
    let image = image::load_from_memory_with_format(&frame.data, format.image_format())?;
    Ok(image.into_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{encoded_frame, sample_image};

    #[test]
    fn test_decode_keeps_bounds() {
        let frame = encoded_frame(&sample_image(64, 48), SnapshotFormat::Jpeg);
        let decoded = decode_frame(&frame, SnapshotFormat::Jpeg).unwrap();

        assert_eq!(decoded.dimensions(), (64, 48));
    }

    #[test]
    fn test_decode_png_is_exact() {
        let source = sample_image(32, 16);
        let decoded = decode_frame(&encoded_frame(&source, SnapshotFormat::Png), SnapshotFormat::Png)
            .unwrap();

        assert_eq!(decoded, source);
    }

    #[test]
    fn test_truncated_frame_is_rejected() {
        let frame = encoded_frame(&sample_image(64, 48), SnapshotFormat::Jpeg);
        let truncated = RawFrame::new(frame.data.slice(..20));

        assert!(decode_frame(&truncated, SnapshotFormat::Jpeg).is_err());
    }

    #[test]
    fn test_wrong_format_is_rejected() {
        let frame = encoded_frame(&sample_image(8, 8), SnapshotFormat::Png);

        assert!(decode_frame(&frame, SnapshotFormat::Jpeg).is_err());
    }

    #[test]
    fn test_garbage_is_rejected() {
        let frame = RawFrame::new(&b"definitely not an image"[..]);

        assert!(decode_frame(&frame, SnapshotFormat::Jpeg).is_err());
    }
}

use std::time::Duration;

use bytes::Bytes;
use image::ImageFormat;
use serde::{Deserialize, Serialize};

/// Encoded image bytes returned by one capture.
///
/// Transient: dropped as soon as the decoder has produced a pixel buffer.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub data: Bytes,
}

impl RawFrame {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

/// Fixed parameters handed to the capture tool every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureParams {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    /// Hard deadline after which the capture is abandoned.
    pub timeout: Duration,
}

/// Image container formats we decode and encode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    Jpeg,
    Png,
}

impl SnapshotFormat {
    pub fn image_format(self) -> ImageFormat {
        match self {
            SnapshotFormat::Jpeg => ImageFormat::Jpeg,
            SnapshotFormat::Png => ImageFormat::Png,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            SnapshotFormat::Jpeg => "image/jpeg",
            SnapshotFormat::Png => "image/png",
        }
    }
}

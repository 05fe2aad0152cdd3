//! Error types for the refresh pipeline.
//!
//! Two tiers: [`FontError`] and [`ConfigError`] are fatal at startup, while
//! everything wrapped by [`CycleError`] only aborts the current refresh cycle.

use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

use crate::capture::CaptureDevice;

/// Errors from the external frame capture step.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Capture program could not be started.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O failure while collecting the program's output.
    #[error("capture I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Capture program exited unsuccessfully.
    #[error("capture program exited with {status}: {stderr}")]
    Exit { status: ExitStatus, stderr: String },

    /// Capture program was killed after exceeding its deadline.
    #[error("capture timed out after {0:?}")]
    Timeout(Duration),

    /// Capture program succeeded but produced no image bytes.
    #[error("capture produced no data")]
    Empty,
}

/// Raw bytes were not a valid image of the expected format.
#[derive(Debug, Error)]
#[error("failed to decode frame: {0}")]
pub struct DecodeError(#[from] pub image::ImageError);

/// The overlay font cannot render the label.
#[derive(Debug, Error)]
pub enum GlyphRenderError {
    #[error("font has no glyph for {0:?}")]
    MissingGlyph(char),
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("cannot encode a {width}x{height} image")]
    EmptyImage { width: u32, height: u32 },

    #[error("image encoder failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Font resource missing or unusable. Fatal at startup.
#[derive(Debug, Error)]
pub enum FontError {
    #[error("failed to read font {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("font data is not a valid TrueType/OpenType font")]
    Parse,

    #[error("font does not declare units per em")]
    MissingMetrics,

    #[error("font cannot render label character {0:?}")]
    MissingGlyph(char),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Pipeline stage a cycle was in when it aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Capture,
    Decode,
    Annotate,
    Encode,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Capture => "capture",
            Stage::Decode => "decode",
            Stage::Annotate => "annotate",
            Stage::Encode => "encode",
        })
    }
}

/// A refresh cycle aborted. The published snapshot is left untouched.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("capture from {device} failed: {source}")]
    Capture {
        device: CaptureDevice,
        #[source]
        source: CaptureError,
    },

    #[error("decoding frame from {device} failed: {source}")]
    Decode {
        device: CaptureDevice,
        #[source]
        source: DecodeError,
    },

    #[error("annotating frame from {device} failed: {source}")]
    Annotate {
        device: CaptureDevice,
        #[source]
        source: GlyphRenderError,
    },

    #[error("encoding frame from {device} failed: {source}")]
    Encode {
        device: CaptureDevice,
        #[source]
        source: EncodeError,
    },

    /// Blocking worker for a stage panicked or was cancelled.
    #[error("{stage} worker for {device} did not complete: {reason}")]
    Worker {
        device: CaptureDevice,
        stage: Stage,
        reason: String,
    },
}

impl CycleError {
    pub fn stage(&self) -> Stage {
        match self {
            CycleError::Capture { .. } => Stage::Capture,
            CycleError::Decode { .. } => Stage::Decode,
            CycleError::Annotate { .. } => Stage::Annotate,
            CycleError::Encode { .. } => Stage::Encode,
            CycleError::Worker { stage, .. } => *stage,
        }
    }

    pub fn device(&self) -> &CaptureDevice {
        match self {
            CycleError::Capture { device, .. }
            | CycleError::Decode { device, .. }
            | CycleError::Annotate { device, .. }
            | CycleError::Encode { device, .. }
            | CycleError::Worker { device, .. } => device,
        }
    }
}

/// Terminates the refresh scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("overlay font cannot render labels, refusing to continue: {0}")]
    Font(#[source] GlyphRenderError),
}

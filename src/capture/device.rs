//! Capture device selection.
//!
//! Devices are hot-pluggable, so every cycle probes the configured candidates
//! in order and takes the first one that answers. When nothing answers the
//! last candidate is returned anyway and the capture stage reports the real
//! failure.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;
use v4l::{capability::Flags, Device};

use crate::error::ConfigError;

/// Identifier of a video input, e.g. `/dev/video0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptureDevice(String);

impl CaptureDevice {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &str {
        &self.0
    }

    /// `/dev/video0` .. `/dev/video{count-1}`
    pub fn video_nodes(count: usize) -> Vec<Self> {
        (0..count)
            .map(|i| Self::new(format!("/dev/video{}", i)))
            .collect()
    }
}

impl fmt::Display for CaptureDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type Probe = Box<dyn Fn(&CaptureDevice) -> bool + Send + Sync>;

/// Picks the capture device for a cycle.
pub struct DeviceLocator {
    candidates: Vec<CaptureDevice>,
    probe: Probe,
}

impl DeviceLocator {
    pub fn new<P>(candidates: Vec<CaptureDevice>, probe: P) -> Result<Self, ConfigError>
    where
        P: Fn(&CaptureDevice) -> bool + Send + Sync + 'static,
    {
        if candidates.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one capture device must be configured".into(),
            ));
        }

        Ok(Self {
            candidates,
            probe: Box::new(probe),
        })
    }

    /// First accessible candidate, or the last candidate if none is.
    pub fn locate(&self) -> &CaptureDevice {
        match self.candidates.iter().find(|device| (self.probe)(device)) {
            Some(device) => device,
            None => {
                let fallback = self.fallback();
                debug!("No capture device answered the probe, falling back to {}", fallback);
                fallback
            }
        }
    }

    /// Device used when probing finds nothing.
    pub fn fallback(&self) -> &CaptureDevice {
        &self.candidates[self.candidates.len() - 1]
    }

    pub fn candidates(&self) -> &[CaptureDevice] {
        &self.candidates
    }
}

/// Check that a V4L2 node exists and advertises video capture.
pub fn probe_v4l(device: &CaptureDevice) -> bool {
    let path = Path::new(device.path());
    if !path.exists() {
        return false;
    }

    match Device::with_path(path) {
        Ok(dev) => match dev.query_caps() {
            Ok(caps) => {
                let capture = caps.capabilities.contains(Flags::VIDEO_CAPTURE);
                debug!("Probed {} - {} (capture: {})", device, caps.card, capture);
                capture
            }
            Err(e) => {
                debug!("Failed to query {}: {}", device, e);
                false
            }
        },
        Err(e) => {
            debug!("Failed to open {}: {}", device, e);
            false
        }
    }
}

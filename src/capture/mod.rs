pub mod command;
pub mod device;
pub mod frame;

use std::future::Future;

pub use command::CommandGrabber;
pub use device::{probe_v4l, CaptureDevice, DeviceLocator};
pub use frame::{CaptureParams, RawFrame, SnapshotFormat};

use crate::error::CaptureError;

/// Produces one encoded image from a device.
///
/// Implementations must respect `params.timeout` and abandon the underlying
/// operation when it expires.
pub trait FrameGrabber: Send + Sync {
    fn grab(
        &self,
        device: &CaptureDevice,
        params: &CaptureParams,
    ) -> impl Future<Output = Result<RawFrame, CaptureError>> + Send;
}

//! Frame capture through an external program.
//!
//! The program writes one encoded image to stdout. It runs under a deadline;
//! on expiry the child is killed and the cycle is abandoned.

use std::process::Stdio;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, instrument};

use crate::capture::{CaptureDevice, CaptureParams, FrameGrabber, RawFrame};
use crate::error::CaptureError;
use crate::CaptureConfig;

/// Runs a capture program whose arguments may contain `{device}`,
/// `{width}`, `{height}` and `{quality}` placeholders.
#[derive(Debug, Clone)]
pub struct CommandGrabber {
    program: String,
    args: Vec<String>,
}

impl CommandGrabber {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    fn expand_args(&self, device: &CaptureDevice, params: &CaptureParams) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{device}", device.path())
                    .replace("{width}", &params.width.to_string())
                    .replace("{height}", &params.height.to_string())
                    .replace("{quality}", &params.quality.to_string())
            })
            .collect()
    }
}

impl FrameGrabber for CommandGrabber {
    #[instrument(skip(self, params), fields(program = %self.program))]
    async fn grab(
        &self,
        device: &CaptureDevice,
        params: &CaptureParams,
    ) -> Result<RawFrame, CaptureError> {
        let args = self.expand_args(device, params);
        debug!("Running {} {:?}", self.program, args);

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CaptureError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match timeout(params.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => return Err(CaptureError::Timeout(params.timeout)),
        };

        if !output.status.success() {
            return Err(CaptureError::Exit {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if output.stdout.is_empty() {
            return Err(CaptureError::Empty);
        }

        debug!("Captured {} bytes", output.stdout.len());
        Ok(RawFrame::new(output.stdout))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn params(timeout: Duration) -> CaptureParams {
        CaptureParams {
            width: 640,
            height: 480,
            quality: 90,
            timeout,
        }
    }

    fn shell(script: &str) -> CommandGrabber {
        CommandGrabber::new("sh", vec!["-c".into(), script.into()])
    }

    #[test]
    fn test_placeholders_are_expanded() {
        let grabber = CommandGrabber::new(
            "fswebcam",
            vec![
                "-d".into(),
                "{device}".into(),
                "-r".into(),
                "{width}x{height}".into(),
                "--jpeg".into(),
                "{quality}".into(),
            ],
        );
        let args = grabber.expand_args(
            &CaptureDevice::new("/dev/video2"),
            &params(Duration::from_secs(1)),
        );

        assert_eq!(args, ["-d", "/dev/video2", "-r", "640x480", "--jpeg", "90"]);
    }

    #[tokio::test]
    async fn test_stdout_becomes_frame() {
        let grabber = shell("printf 'frame:%s' {device}");
        let frame = grabber
            .grab(&CaptureDevice::new("/dev/video0"), &params(Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(&frame.data[..], b"frame:/dev/video0");
    }

    #[tokio::test]
    async fn test_nonzero_exit_reports_stderr() {
        let grabber = shell("echo 'no such device' >&2; exit 3");
        let err = grabber
            .grab(&CaptureDevice::new("/dev/video0"), &params(Duration::from_secs(5)))
            .await
            .unwrap_err();

        match err {
            CaptureError::Exit { status, stderr } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "no such device");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_output_is_an_error() {
        let grabber = shell("true");
        let err = grabber
            .grab(&CaptureDevice::new("/dev/video0"), &params(Duration::from_secs(5)))
            .await
            .unwrap_err();

        assert!(matches!(err, CaptureError::Empty));
    }

    #[tokio::test]
    async fn test_hanging_capture_times_out() {
        let grabber = shell("sleep 30");
        let started = std::time::Instant::now();
        let err = grabber
            .grab(
                &CaptureDevice::new("/dev/video0"),
                &params(Duration::from_millis(100)),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CaptureError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_missing_program_fails_to_spawn() {
        let grabber = CommandGrabber::new("/nonexistent/river-capture", Vec::new());
        let err = grabber
            .grab(&CaptureDevice::new("/dev/video0"), &params(Duration::from_secs(1)))
            .await
            .unwrap_err();

        assert!(matches!(err, CaptureError::Spawn { .. }));
    }
}

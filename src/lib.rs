pub mod cache;
pub mod capture;
pub mod error;
pub mod pipeline;
pub mod scheduler;
pub mod server;
pub mod service;

use std::path::{Path, PathBuf};
use std::time::Duration;

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::capture::{CaptureDevice, CaptureParams, SnapshotFormat};
use crate::error::ConfigError;
use crate::pipeline::OverlayStyle;

pub use cache::{Snapshot, SnapshotCache};
pub use scheduler::{RefreshScheduler, RefreshState};
pub use service::SnapshotService;

/// Prefix for environment overrides, e.g. `RIVER_REFRESH__INTERVAL_SECS=10`.
pub const ENV_PREFIX: &str = "RIVER";

/// System configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub refresh: RefreshConfig,
    pub overlay: OverlayConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Probed in order every cycle.
    pub devices: Vec<CaptureDevice>,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    /// Format the capture program writes.
    pub format: SnapshotFormat,
    pub timeout_ms: u64,
    pub program: String,
    /// Supports `{device}`, `{width}`, `{height}` and `{quality}`.
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub font_path: PathBuf,
    pub size: f32,
    pub color: [u8; 4],
    pub margin_x: u32,
    pub margin_y: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: SnapshotFormat,
    pub quality: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            devices: CaptureDevice::video_nodes(10),
            width: 640,
            height: 480,
            quality: 90,
            format: SnapshotFormat::Jpeg,
            timeout_ms: 15_000,
            program: "fswebcam".into(),
            args: [
                "-q",
                "-d",
                "{device}",
                "-r",
                "{width}x{height}",
                "--jpeg",
                "{quality}",
                "--no-banner",
                "-",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            font_path: PathBuf::from("assets/fonts/DejaVuSans.ttf"),
            size: 24.0,
            color: [255, 255, 0, 255],
            margin_x: 10,
            margin_y: 10,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: SnapshotFormat::Jpeg,
            quality: 90,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:80".into(),
        }
    }
}

impl Config {
    /// Defaults, then the optional TOML file, then `RIVER_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("capture.devices")
                .with_list_parse_key("capture.args")
                .with_list_parse_key("overlay.color"),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.capture.devices.is_empty() {
            return invalid("capture.devices must list at least one device");
        }
        if self.capture.width == 0 || self.capture.height == 0 {
            return invalid("capture resolution must be non-zero");
        }
        if !(1..=100).contains(&self.capture.quality) || !(1..=100).contains(&self.output.quality) {
            return invalid("quality must be between 1 and 100");
        }
        if self.capture.timeout_ms == 0 {
            return invalid("capture.timeout_ms must be non-zero");
        }
        if self.capture.program.is_empty() {
            return invalid("capture.program must be set");
        }
        if self.refresh.interval_secs == 0 {
            return invalid("refresh.interval_secs must be non-zero");
        }
        if !(self.overlay.size.is_finite() && self.overlay.size > 0.0) {
            return invalid("overlay.size must be positive");
        }
        Ok(())
    }
}

impl CaptureConfig {
    pub fn params(&self) -> CaptureParams {
        CaptureParams {
            width: self.width,
            height: self.height,
            quality: self.quality,
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl OverlayConfig {
    pub fn style(&self) -> OverlayStyle {
        OverlayStyle {
            size: self.size,
            color: Rgba(self.color),
            margin_x: self.margin_x,
            margin_y: self.margin_y,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write_config(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("river-{}-{}.toml", name, std::process::id()));
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();

        assert_eq!(config.capture.devices.len(), 10);
        assert_eq!(config.capture.devices[0].path(), "/dev/video0");
        assert_eq!(config.refresh.interval(), Duration::from_secs(60));
        assert_eq!(config.overlay.style().color, Rgba([255, 255, 0, 255]));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let path = write_config(
            "override",
            r#"
                [capture]
                devices = ["/dev/video4", "/dev/video5"]
                timeout_ms = 2500

                [refresh]
                interval_secs = 5

                [output]
                format = "png"
            "#,
        );
        let config = Config::load(Some(path.as_path())).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(
            config.capture.devices,
            vec![CaptureDevice::new("/dev/video4"), CaptureDevice::new("/dev/video5")]
        );
        assert_eq!(config.capture.params().timeout, Duration::from_millis(2500));
        assert_eq!(config.capture.width, 640);
        assert_eq!(config.refresh.interval_secs, 5);
        assert_eq!(config.output.format, SnapshotFormat::Png);
    }

    #[test]
    fn test_empty_device_list_is_rejected() {
        let path = write_config("empty", "[capture]\ndevices = []\n");
        let result = Config::load(Some(path.as_path()));
        fs::remove_file(&path).ok();

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = Config::load(Some(Path::new("/nonexistent/river.toml")));

        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let mut config = Config::default();
        config.refresh.interval_secs = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_quality_is_rejected() {
        let mut config = Config::default();
        config.output.quality = 0;

        assert!(config.validate().is_err());
    }
}

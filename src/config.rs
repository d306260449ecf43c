use crate::error::{CaptureError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

fn default_poll_interval_ms() -> u64 {
    1000
}

/// Capture settings for one device, as stored in the JSON config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CaptureConfig {
    /// Device path, e.g. `/dev/video0`
    pub device: String,
    /// Encoding name as advertised by the device
    pub encoding: String,
    /// Pixel format code (v4l2 fourcc as u32)
    pub format: u32,
    pub width: u32,
    pub height: u32,
    /// Per-call liveness poll in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl CaptureConfig {
    pub fn new(
        device: impl Into<String>,
        encoding: impl Into<String>,
        format: u32,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            device: device.into(),
            encoding: encoding.into(),
            format,
            width,
            height,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }

    /// Load a config from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading capture config from {}", path.display());

        let data = std::fs::read_to_string(path).map_err(|source| CaptureError::ConfigLoad {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

use std::io;
use thiserror::Error;

/// Errors raised while setting up a capture session.
///
/// Per-frame failures never show up here: a missed or undecodable frame is
/// reported as "no frame" by the grab calls.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to read config file {path}")]
    ConfigLoad {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse capture config")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Failed to open device {device}")]
    DeviceOpen {
        device: String,
        #[source]
        source: io::Error,
    },

    #[error(
        "Unsupported video format on {device}: format {format} ({encoding}) at {width}x{height}"
    )]
    UnsupportedFormat {
        device: String,
        format: u32,
        encoding: String,
        width: u32,
        height: u32,
    },

    #[error("Device {device} rejected format {format} at {width}x{height}")]
    FormatCommit {
        device: String,
        format: u32,
        width: u32,
        height: u32,
        #[source]
        source: io::Error,
    },

    #[error("Failed to start streaming on {device}")]
    StreamStart {
        device: String,
        #[source]
        source: io::Error,
    },

    #[error("A frame grabber is already running for {device}")]
    GrabberRunning { device: String },

    #[error("Failed to spawn frame grabber thread")]
    GrabberSpawn(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, CaptureError>;

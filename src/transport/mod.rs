mod v4l_device;

pub use v4l_device::V4lTransport;

use std::io;
use std::time::Duration;
use thiserror::Error;

/// A pixel format advertised by a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescription {
    /// Pixel format code
    pub format: u32,
    /// Human readable encoding name, e.g. "MJPEG" or "YUYV 4:2:2"
    pub encoding: String,
}

/// Largest frame size of one advertised resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameSize {
    pub max_width: u32,
    pub max_height: u32,
}

impl FrameSize {
    pub fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
        }
    }
}

/// Outcome of a failed wait for the next frame
#[derive(Error, Debug)]
pub enum WaitError {
    #[error("Timed out waiting for frame")]
    Timeout,

    #[error("Transport error while waiting for frame")]
    Io(#[from] io::Error),
}

/// Trait for video capture devices
///
/// Implementations own the device handle. A transport is opened once,
/// configured with [`set_image_format`](Self::set_image_format), started
/// and then polled with [`wait_for_frame`](Self::wait_for_frame) followed by
/// [`read_frame`](Self::read_frame).
pub trait DeviceTransport: Send + Sized {
    /// Open the device at `path`
    fn open(path: &str) -> io::Result<Self>;

    /// List the pixel formats the device supports
    fn supported_formats(&self) -> io::Result<Vec<FormatDescription>>;

    /// List the frame sizes supported for a pixel format
    fn supported_frame_sizes(&self, format: u32) -> io::Result<Vec<FrameSize>>;

    /// Commit the capture format
    fn set_image_format(&mut self, format: u32, width: u32, height: u32) -> io::Result<()>;

    fn start_streaming(&mut self) -> io::Result<()>;

    /// Block until a frame is ready or `timeout` elapses
    fn wait_for_frame(&mut self, timeout: Duration) -> Result<(), WaitError>;

    /// Read the frame made ready by the last successful wait
    fn read_frame(&mut self) -> io::Result<Vec<u8>>;

    /// Stop streaming and release the device
    fn close(self);
}

//! Frame grabbing over V4L2 capture devices.
//!
//! A [`CaptureSession`] opens a device, checks the requested pixel format and
//! resolution against what the device advertises, starts streaming and
//! decodes raw frames (YUYV or MJPEG) into RGB images. A continuous frame
//! grabber can keep the newest frame in a shared slot for any number of
//! readers.

pub mod capture;
pub mod config;
pub mod decode;
pub mod detect;
pub mod error;
pub mod transport;

pub use capture::{CaptureSession, FrameGrabber, LatestFrame, StopToken};
pub use config::CaptureConfig;
pub use error::{CaptureError, Result};
pub use transport::{DeviceTransport, V4lTransport};

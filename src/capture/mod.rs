mod grabber;
mod negotiate;
mod session;

pub use grabber::{FrameGrabber, LatestFrame, LatestFrameSlot, StopToken};
pub use negotiate::{capabilities, is_supported, CapabilityEntry};
pub use session::CaptureSession;

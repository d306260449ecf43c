use super::session::CaptureSession;
use crate::error::{CaptureError, Result};
use crate::transport::DeviceTransport;
use image::RgbImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::SystemTime;

/// Cooperative stop signal for a continuous frame grabber
///
/// The loop checks the token once per iteration, after its grab attempt, so
/// a grab already in progress always completes.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The most recent frame published by a frame grabber
#[derive(Debug, Clone)]
pub struct LatestFrame {
    pub image: Arc<RgbImage>,
    /// Wall-clock capture time, never earlier than the previous frame's
    pub captured_at: SystemTime,
    /// Publish counter, starting at 1
    pub sequence: u64,
}

/// Single-slot holder for the newest decoded frame
///
/// Frame and timestamp live under one lock, so readers always see a pair
/// that was written together. The lock is never held while grabbing or
/// decoding.
#[derive(Debug, Default)]
pub struct LatestFrameSlot {
    frame: Mutex<Option<LatestFrame>>,
}

impl LatestFrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slot contents with `image`, stamped with the current time
    pub fn publish(&self, image: RgbImage) -> Option<LatestFrame> {
        let image = Arc::new(image);
        let now = SystemTime::now();

        let mut guard = self.frame.lock().ok()?;
        let (captured_at, sequence) = match guard.as_ref() {
            // Clamp so a wall clock stepping backwards cannot reorder frames
            Some(prev) => (now.max(prev.captured_at), prev.sequence + 1),
            None => (now, 1),
        };

        let frame = LatestFrame {
            image,
            captured_at,
            sequence,
        };
        *guard = Some(frame.clone());
        Some(frame)
    }

    /// Copy out the current (frame, timestamp) pair
    pub fn read(&self) -> Option<LatestFrame> {
        self.frame.lock().ok()?.clone()
    }
}

/// Handle to a running continuous capture loop
pub struct FrameGrabber {
    stop: StopToken,
    handle: Option<JoinHandle<u64>>,
}

impl FrameGrabber {
    /// Ask the loop to exit after its current grab. Does not wait.
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop the loop and wait for it to exit
    ///
    /// Returns the number of frames published, or `None` if the loop
    /// thread panicked.
    pub fn join(mut self) -> Option<u64> {
        self.stop.stop();
        self.handle.take()?.join().ok()
    }
}

impl Drop for FrameGrabber {
    fn drop(&mut self) {
        self.stop.stop();
    }
}

pub(super) fn spawn<T>(session: Arc<CaptureSession<T>>, stop: StopToken) -> Result<FrameGrabber>
where
    T: DeviceTransport + 'static,
{
    let token = stop.clone();
    let handle = std::thread::Builder::new()
        .name("frame-grabber".into())
        .spawn(move || {
            let published = run_grabber(&session, &token);
            session.grabber_finished();
            published
        })
        .map_err(CaptureError::GrabberSpawn)?;

    Ok(FrameGrabber {
        stop,
        handle: Some(handle),
    })
}

fn run_grabber<T: DeviceTransport>(session: &CaptureSession<T>, stop: &StopToken) -> u64 {
    let device = &session.config().device;
    tracing::info!("Frame grabber started on {}", device);

    let mut published = 0u64;
    loop {
        if let Some(image) = session.grab_frame() {
            if let Some(frame) = session.latest_slot().publish(image) {
                published += 1;
                tracing::trace!("Published frame {}", frame.sequence);
            }
        }

        if stop.is_stopped() {
            break;
        }
        if session.is_closed() {
            tracing::warn!("Session on {} closed under a running frame grabber", device);
            break;
        }

        std::thread::yield_now();
    }

    tracing::info!("Frame grabber on {} stopped after {} frames", device, published);
    published
}

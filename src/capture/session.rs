use super::grabber::{self, FrameGrabber, LatestFrame, LatestFrameSlot, StopToken};
use super::negotiate;
use crate::config::CaptureConfig;
use crate::decode::{self, FrameDecoder};
use crate::error::{CaptureError, Result};
use crate::transport::{DeviceTransport, WaitError};
use image::RgbImage;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Transport errors are logged on the first miss and then every this many
const ERROR_LOG_EVERY: u64 = 100;

/// A streaming capture device with a negotiated format
///
/// Grabs are blocking and may be issued from any thread. The session is
/// `Sync` so it can be shared with a continuous frame grabber through an
/// [`Arc`].
pub struct CaptureSession<T: DeviceTransport> {
    transport: Mutex<Option<T>>,
    config: CaptureConfig,
    decoder: Option<Box<dyn FrameDecoder>>,
    latest: LatestFrameSlot,
    grabber_running: AtomicBool,
    transport_errors: AtomicU64,
}

impl<T: DeviceTransport> CaptureSession<T> {
    /// Open the configured device, negotiate its format and start streaming
    pub fn open(config: CaptureConfig) -> Result<Self> {
        tracing::info!("Opening capture device {}", config.device);

        let transport = T::open(&config.device).map_err(|source| CaptureError::DeviceOpen {
            device: config.device.clone(),
            source,
        })?;

        Self::with_transport(config, transport)
    }

    /// Negotiate and start streaming on an already opened transport
    ///
    /// The transport is closed on every failure path.
    pub fn with_transport(config: CaptureConfig, mut transport: T) -> Result<Self> {
        tracing::debug!(
            "Negotiating format {} ({}) at {}x{} on {}",
            config.format,
            config.encoding,
            config.width,
            config.height,
            config.device
        );

        if !negotiate::is_supported(
            &transport,
            config.format,
            config.width,
            config.height,
            &config.encoding,
        ) {
            transport.close();
            return Err(CaptureError::UnsupportedFormat {
                device: config.device,
                format: config.format,
                encoding: config.encoding,
                width: config.width,
                height: config.height,
            });
        }

        if let Err(source) = transport.set_image_format(config.format, config.width, config.height)
        {
            transport.close();
            return Err(CaptureError::FormatCommit {
                device: config.device,
                format: config.format,
                width: config.width,
                height: config.height,
                source,
            });
        }

        if let Err(source) = transport.start_streaming() {
            transport.close();
            return Err(CaptureError::StreamStart {
                device: config.device,
                source,
            });
        }

        let decoder = decode::decoder_for_encoding(&config.encoding);
        if decoder.is_none() {
            tracing::warn!(
                "No decoder for encoding {:?}, every grab on {} will come back empty",
                config.encoding,
                config.device
            );
        }

        tracing::info!(
            "Streaming {} at {}x{} from {}",
            config.encoding,
            config.width,
            config.height,
            config.device
        );

        Ok(Self {
            transport: Mutex::new(Some(transport)),
            config,
            decoder,
            latest: LatestFrameSlot::new(),
            grabber_running: AtomicBool::new(false),
            transport_errors: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Grab one frame, waiting at most one poll interval
    ///
    /// Timeouts, transport errors and undecodable frames all yield `None`.
    pub fn grab_frame(&self) -> Option<RgbImage> {
        self.grab_frame_within(self.config.poll_interval())
    }

    /// Keep grabbing until a frame arrives or `timeout` has elapsed
    ///
    /// Each attempt waits at most the poll interval, trimmed to the time left.
    pub fn grab_frame_with_timeout(&self, timeout: Duration) -> Option<RgbImage> {
        let start = Instant::now();
        loop {
            let remaining = timeout.saturating_sub(start.elapsed());
            if let Some(frame) = self.grab_frame_within(self.config.poll_interval().min(remaining)) {
                return Some(frame);
            }

            if start.elapsed() >= timeout || self.is_closed() {
                return None;
            }
            std::thread::yield_now();
        }
    }

    fn grab_frame_within(&self, poll: Duration) -> Option<RgbImage> {
        let raw = {
            let mut guard = self.transport.lock().ok()?;
            let transport = guard.as_mut()?;

            match transport.wait_for_frame(poll) {
                Ok(()) => {}
                Err(WaitError::Timeout) => {
                    tracing::trace!("No frame from {} within {:?}", self.config.device, poll);
                    return None;
                }
                Err(WaitError::Io(e)) => {
                    self.note_transport_error(&e);
                    return None;
                }
            }

            match transport.read_frame() {
                Ok(raw) => raw,
                Err(e) => {
                    self.note_transport_error(&e);
                    return None;
                }
            }
        };

        self.transport_errors.store(0, Ordering::Relaxed);
        self.decode(&raw)
    }

    fn decode(&self, raw: &[u8]) -> Option<RgbImage> {
        let Some(decoder) = &self.decoder else {
            tracing::debug!("Unknown encoding: {}", self.config.encoding);
            return None;
        };

        match decoder.decode(self.config.width, self.config.height, raw) {
            Ok(image) => Some(image),
            Err(e) => {
                tracing::debug!("Dropping frame from {}: {}", self.config.device, e);
                None
            }
        }
    }

    fn note_transport_error(&self, error: &std::io::Error) {
        let count = self.transport_errors.fetch_add(1, Ordering::Relaxed) + 1;
        if count == 1 || count % ERROR_LOG_EVERY == 0 {
            tracing::warn!(
                "Transport error on {} ({} in a row): {}",
                self.config.device,
                count,
                error
            );
        }
    }

    /// Number of transport errors since the last frame was read
    ///
    /// Grabs never fail on a lost device; callers that want to give up on a
    /// disconnected camera can watch this counter and close the session.
    pub fn consecutive_transport_errors(&self) -> u64 {
        self.transport_errors.load(Ordering::Relaxed)
    }

    /// Latest frame published by the continuous grabber, if any
    pub fn read_latest(&self) -> Option<LatestFrame> {
        self.latest.read()
    }

    pub(super) fn latest_slot(&self) -> &LatestFrameSlot {
        &self.latest
    }

    pub(super) fn grabber_finished(&self) {
        self.grabber_running.store(false, Ordering::SeqCst);
    }

    pub fn is_grabber_running(&self) -> bool {
        self.grabber_running.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.transport.lock().map_or(true, |guard| guard.is_none())
    }

    /// Stop streaming and release the device
    ///
    /// Stop any frame grabber first. Grabs after close yield `None`.
    pub fn close(&self) {
        let transport = self.transport.lock().ok().and_then(|mut guard| guard.take());

        match transport {
            Some(transport) => {
                transport.close();
                tracing::info!("Closed capture device {}", self.config.device);
            }
            None => tracing::debug!("Capture device {} already closed", self.config.device),
        }
    }
}

impl<T: DeviceTransport + 'static> CaptureSession<T> {
    /// Run a frame grabber on a dedicated thread
    ///
    /// The grabber keeps the latest decoded frame in the session's slot,
    /// readable through [`read_latest`](Self::read_latest). Only one grabber
    /// may run per session; a new one needs a fresh [`StopToken`].
    pub fn start_continuous(self: &Arc<Self>, stop: StopToken) -> Result<FrameGrabber> {
        if self
            .grabber_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CaptureError::GrabberRunning {
                device: self.config.device.clone(),
            });
        }

        grabber::spawn(Arc::clone(self), stop).inspect_err(|_| self.grabber_finished())
    }
}

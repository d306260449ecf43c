//! Scripted in-memory capture device for integration tests

#![allow(dead_code)]

use framegrab::transport::{DeviceTransport, FormatDescription, FrameSize, WaitError};
use framegrab::CaptureConfig;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const MJPG: u32 = 0x4750_4a4d;
pub const YUYV: u32 = 0x5659_5559;
pub const H264: u32 = 0x3436_3248;

/// Shared view into a scripted device, kept by the test after the
/// transport has been handed to a session
#[derive(Debug, Default)]
pub struct Probe {
    pub closed: AtomicUsize,
    pub frames_served: AtomicUsize,
    pub corrupt: AtomicBool,
    pub disconnected: AtomicBool,
}

impl Probe {
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn frames_served(&self) -> usize {
        self.frames_served.load(Ordering::SeqCst)
    }
}

pub struct ScriptedTransport {
    formats: Vec<(u32, String, Vec<FrameSize>)>,
    frame_interval: Duration,
    payload: Vec<u8>,
    fail_commit: bool,
    fail_start: bool,
    committed: Option<(u32, u32, u32)>,
    streaming: bool,
    next_frame_at: Instant,
    ready: bool,
    probe: Arc<Probe>,
}

impl ScriptedTransport {
    /// A webcam offering MJPEG and YUYV at common sizes, producing a frame
    /// every 20ms
    pub fn webcam() -> Self {
        Self {
            formats: vec![
                (
                    MJPG,
                    "MJPEG".to_string(),
                    vec![FrameSize::new(1280, 720), FrameSize::new(640, 480)],
                ),
                (
                    YUYV,
                    "YUYV 4:2:2".to_string(),
                    vec![FrameSize::new(640, 480), FrameSize::new(320, 240)],
                ),
                (H264, "H264".to_string(), vec![FrameSize::new(640, 480)]),
            ],
            frame_interval: Duration::from_millis(20),
            payload: jpeg_frame(640, 480),
            fail_commit: false,
            fail_start: false,
            committed: None,
            streaming: false,
            next_frame_at: Instant::now(),
            ready: false,
            probe: Arc::new(Probe::default()),
        }
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn probe(&self) -> Arc<Probe> {
        Arc::clone(&self.probe)
    }
}

impl DeviceTransport for ScriptedTransport {
    fn open(path: &str) -> io::Result<Self> {
        match path {
            "/dev/video0" | "/dev/video1" => Ok(Self::webcam()),
            _ => Err(io::Error::new(io::ErrorKind::NotFound, path.to_string())),
        }
    }

    fn supported_formats(&self) -> io::Result<Vec<FormatDescription>> {
        Ok(self
            .formats
            .iter()
            .map(|(format, encoding, _)| FormatDescription {
                format: *format,
                encoding: encoding.clone(),
            })
            .collect())
    }

    fn supported_frame_sizes(&self, format: u32) -> io::Result<Vec<FrameSize>> {
        Ok(self
            .formats
            .iter()
            .filter(|(f, _, _)| *f == format)
            .flat_map(|(_, _, sizes)| sizes.iter().copied())
            .collect())
    }

    fn set_image_format(&mut self, format: u32, width: u32, height: u32) -> io::Result<()> {
        if self.fail_commit {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "EINVAL"));
        }
        self.committed = Some((format, width, height));
        Ok(())
    }

    fn start_streaming(&mut self) -> io::Result<()> {
        if self.fail_start || self.committed.is_none() {
            return Err(io::Error::new(io::ErrorKind::Other, "VIDIOC_STREAMON"));
        }
        self.streaming = true;
        self.next_frame_at = Instant::now() + self.frame_interval;
        Ok(())
    }

    fn wait_for_frame(&mut self, timeout: Duration) -> Result<(), WaitError> {
        if !self.streaming {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "not streaming").into());
        }
        if self.probe.disconnected.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "ENODEV").into());
        }

        let now = Instant::now();
        let due = self.next_frame_at.saturating_duration_since(now);
        if due > timeout {
            std::thread::sleep(timeout);
            return Err(WaitError::Timeout);
        }

        std::thread::sleep(due);
        self.next_frame_at = Instant::now() + self.frame_interval;
        self.ready = true;
        Ok(())
    }

    fn read_frame(&mut self) -> io::Result<Vec<u8>> {
        if !std::mem::take(&mut self.ready) {
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "no frame ready"));
        }
        self.probe.frames_served.fetch_add(1, Ordering::SeqCst);

        if self.probe.corrupt.load(Ordering::SeqCst) {
            return Ok(vec![0xff, 0xd8, 0xde, 0xad, 0xbe, 0xef]);
        }
        Ok(self.payload.clone())
    }

    fn close(self) {
        self.probe.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Transport whose open never fails, for probing limits
pub struct AlwaysOpen;

impl DeviceTransport for AlwaysOpen {
    fn open(_path: &str) -> io::Result<Self> {
        Ok(AlwaysOpen)
    }

    fn supported_formats(&self) -> io::Result<Vec<FormatDescription>> {
        Ok(Vec::new())
    }

    fn supported_frame_sizes(&self, _format: u32) -> io::Result<Vec<FrameSize>> {
        Ok(Vec::new())
    }

    fn set_image_format(&mut self, _: u32, _: u32, _: u32) -> io::Result<()> {
        Ok(())
    }

    fn start_streaming(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn wait_for_frame(&mut self, timeout: Duration) -> Result<(), WaitError> {
        std::thread::sleep(timeout);
        Err(WaitError::Timeout)
    }

    fn read_frame(&mut self) -> io::Result<Vec<u8>> {
        Err(io::Error::new(io::ErrorKind::WouldBlock, "no frame ready"))
    }

    fn close(self) {}
}

pub fn jpeg_frame(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut jpeg = Vec::new();
    JpegEncoder::new(&mut jpeg)
        .encode_image(&image)
        .expect("encode test frame");
    jpeg
}

/// Neutral gray YUYV frame
pub fn yuyv_frame(width: u32, height: u32) -> Vec<u8> {
    vec![128u8; (width * height * 2) as usize]
}

pub fn mjpeg_config() -> CaptureConfig {
    let mut config = CaptureConfig::new("/dev/video0", "MJPEG", MJPG, 640, 480);
    config.poll_interval_ms = 50;
    config
}

use super::{DeviceTransport, FormatDescription, FrameSize, WaitError};
use std::io;
use std::time::Duration;
use v4l::buffer::{Metadata, Type};
use v4l::framesize::FrameSizeEnum;
use v4l::io::mmap::Stream;
use v4l::io::traits::{CaptureStream, Stream as StreamTrait};
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

const BUFFER_COUNT: u32 = 4;

/// V4L2 capture device backed by memory-mapped streaming buffers
pub struct V4lTransport {
    device: Device,
    path: String,
    stream: Option<Stream<'static>>,
    pending: Option<Vec<u8>>,
}

impl V4lTransport {
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl DeviceTransport for V4lTransport {
    fn open(path: &str) -> io::Result<Self> {
        tracing::debug!("Opening v4l2 device {}", path);
        let device = Device::with_path(path)?;

        Ok(Self {
            device,
            path: path.to_string(),
            stream: None,
            pending: None,
        })
    }

    fn supported_formats(&self) -> io::Result<Vec<FormatDescription>> {
        let formats = self
            .device
            .enum_formats()?
            .into_iter()
            .map(|desc| FormatDescription {
                format: u32::from(desc.fourcc),
                encoding: desc.description,
            })
            .collect();

        Ok(formats)
    }

    fn supported_frame_sizes(&self, format: u32) -> io::Result<Vec<FrameSize>> {
        let sizes = self
            .device
            .enum_framesizes(FourCC::from(format))?
            .into_iter()
            .map(|size| match size.size {
                FrameSizeEnum::Discrete(discrete) => FrameSize::new(discrete.width, discrete.height),
                // Stepwise ranges are reported by their upper bound
                FrameSizeEnum::Stepwise(step) => FrameSize::new(step.max_width, step.max_height),
            })
            .collect();

        Ok(sizes)
    }

    fn set_image_format(&mut self, format: u32, width: u32, height: u32) -> io::Result<()> {
        let fourcc = FourCC::from(format);
        let requested = Format::new(width, height, fourcc);
        let actual = self.device.set_format(&requested)?;

        tracing::debug!(
            "Device {} set format {:?} at {}x{}",
            self.path,
            actual.fourcc,
            actual.width,
            actual.height
        );

        // The decoders rely on the configured geometry, so a silently adjusted
        // format is as good as a rejected one.
        if actual.fourcc != fourcc || actual.width != width || actual.height != height {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "device adjusted format to {:?} at {}x{}",
                    actual.fourcc, actual.width, actual.height
                ),
            ));
        }

        Ok(())
    }

    fn start_streaming(&mut self) -> io::Result<()> {
        let mut stream = Stream::with_buffers(&self.device, Type::VideoCapture, BUFFER_COUNT)?;

        // Buffer 0 is queued by the first `next()`, so only the rest are
        // handed to the driver here.
        for index in 1..BUFFER_COUNT as usize {
            if let Err(e) = CaptureStream::queue(&mut stream, index) {
                tracing::debug!("Queued {} buffers on {}: {}", index, self.path, e);
                break;
            }
        }
        StreamTrait::start(&mut stream)?;

        self.stream = Some(stream);
        Ok(())
    }

    fn wait_for_frame(&mut self, timeout: Duration) -> Result<(), WaitError> {
        let stream = self.stream.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "streaming not started")
        })?;

        self.pending = Some(pull_frame(stream, timeout)?);
        Ok(())
    }

    fn read_frame(&mut self) -> io::Result<Vec<u8>> {
        self.pending
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::WouldBlock, "no frame ready"))
    }

    fn close(mut self) {
        tracing::debug!("Closing v4l2 device {}", self.path);
        // Dropping the stream turns streaming off and unmaps the buffers
        // before the device handle goes away.
        self.stream.take();
    }
}

/// Filled-buffer queue of a capture stream
trait FrameQueue {
    /// Wait up to `timeout_ms` for the driver to fill a buffer
    fn poll_filled(&self, timeout_ms: i32) -> io::Result<bool>;

    /// Return the previously handed out buffer and take the next filled one
    fn next_filled(&mut self) -> io::Result<(&[u8], Metadata)>;
}

impl FrameQueue for Stream<'static> {
    fn poll_filled(&self, timeout_ms: i32) -> io::Result<bool> {
        Ok(self.handle().poll(libc::POLLIN, timeout_ms)? > 0)
    }

    fn next_filled(&mut self) -> io::Result<(&[u8], Metadata)> {
        // No timeout is set on the stream: only called once a buffer is
        // known to be filled, so the dequeue inside never gives up half way
        // and the buffer it re-queues is always one it dequeued before.
        let (buf, meta) = CaptureStream::next(self)?;
        Ok((buf, *meta))
    }
}

/// Pull one frame, waiting at most `timeout`
///
/// A timeout leaves the queue untouched. Only the `bytesused` prefix of the
/// buffer is copied.
fn pull_frame<Q: FrameQueue>(queue: &mut Q, timeout: Duration) -> Result<Vec<u8>, WaitError> {
    let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
    if !queue.poll_filled(timeout_ms)? {
        return Err(WaitError::Timeout);
    }

    let (buf, meta) = queue.next_filled()?;
    let used = match meta.bytesused as usize {
        0 => buf.len(),
        n => n.min(buf.len()),
    };
    tracing::trace!("Dequeued buffer seq={} used={}/{}", meta.sequence, used, buf.len());

    Ok(buf[..used].to_vec())
}

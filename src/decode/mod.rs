mod jpeg;
mod yuyv;

pub use jpeg::JpegDecoder;
pub use yuyv::YuyvDecoder;

use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Frame too short: got {got} bytes, expected {expected}")]
    Truncated { got: usize, expected: usize },

    #[error("Failed to decode JPEG frame")]
    Jpeg(#[from] image::ImageError),
}

/// Trait for raw frame decoders
pub trait FrameDecoder: Send + Sync {
    /// Decode one raw frame captured at `width`x`height`
    fn decode(&self, width: u32, height: u32, raw: &[u8]) -> Result<RgbImage, DecodeError>;
}

/// Encodings with a known decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Yuyv,
    Mjpeg,
}

impl Encoding {
    /// Map a device encoding name to a decoder family. Names are case-sensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "YUYV" | "YUYV 4:2:2" | "YUV 4:2:2 (YUYV)" => Some(Encoding::Yuyv),
            "MJPEG" => Some(Encoding::Mjpeg),
            _ => None,
        }
    }

    pub fn decoder(self) -> Box<dyn FrameDecoder> {
        match self {
            Encoding::Yuyv => Box::new(YuyvDecoder),
            Encoding::Mjpeg => Box::new(JpegDecoder),
        }
    }
}

/// Pick the decoder for an encoding name, if there is one
pub fn decoder_for_encoding(name: &str) -> Option<Box<dyn FrameDecoder>> {
    Encoding::from_name(name).map(Encoding::decoder)
}

use super::{DecodeError, FrameDecoder};
use image::{ImageFormat, RgbImage};

/// Motion-JPEG decoder; every frame is a self-contained JPEG image
pub struct JpegDecoder;

impl FrameDecoder for JpegDecoder {
    fn decode(&self, _width: u32, _height: u32, raw: &[u8]) -> Result<RgbImage, DecodeError> {
        let _span = tracing::debug_span!("jpeg_decode").entered();

        // Dimensions come from the stream itself
        let decoded = image::load_from_memory_with_format(raw, ImageFormat::Jpeg)?;
        Ok(decoded.to_rgb8())
    }
}

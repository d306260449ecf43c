use super::{DecodeError, FrameDecoder};
use image::{Rgb, RgbImage};

/// Packed YUV 4:2:2 (Y0 U Y1 V) decoder
pub struct YuyvDecoder;

impl FrameDecoder for YuyvDecoder {
    fn decode(&self, width: u32, height: u32, raw: &[u8]) -> Result<RgbImage, DecodeError> {
        yuyv_to_rgb(width, height, raw)
    }
}

/// Convert a packed YUYV frame to RGB
///
/// Each 4-byte group carries two pixels sharing one U and one V sample.
/// Trailing bytes past `width * height * 2` (driver padding) are ignored.
pub fn yuyv_to_rgb(width: u32, height: u32, raw: &[u8]) -> Result<RgbImage, DecodeError> {
    let expected = width as usize * height as usize * 2;
    if raw.len() < expected {
        return Err(DecodeError::Truncated {
            got: raw.len(),
            expected,
        });
    }

    let mut image = RgbImage::new(width, height);
    let stride = width as usize * 2;

    for y in 0..height {
        let row = &raw[y as usize * stride..(y as usize + 1) * stride];
        for x in (0..width).step_by(2) {
            let i = x as usize * 2;
            // Odd widths leave a final half group; reuse its luma sample
            let (y0, u, y1, v) = if i + 3 < row.len() {
                (row[i], row[i + 1], row[i + 2], row[i + 3])
            } else {
                (row[i], row[i + 1], row[i], 128)
            };

            image.put_pixel(x, y, yuv_to_rgb(y0, u, v));
            if x + 1 < width {
                image.put_pixel(x + 1, y, yuv_to_rgb(y1, u, v));
            }
        }
    }

    Ok(image)
}

/// Convert YUV (BT.601) to RGB
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> Rgb<u8> {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.140 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.395 * u - 0.581 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 2.032 * u).clamp(0.0, 255.0) as u8;

    Rgb([r, g, b])
}

use crate::transport::{DeviceTransport, FrameSize};
use std::io;

/// One advertised (pixel format, encoding) pair and its frame sizes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityEntry {
    pub format: u32,
    pub encoding: String,
    pub frame_sizes: Vec<FrameSize>,
}

/// Query the full capability set of a device
///
/// Always asks the transport; nothing is cached between calls.
pub fn capabilities<T: DeviceTransport>(transport: &T) -> io::Result<Vec<CapabilityEntry>> {
    transport
        .supported_formats()?
        .into_iter()
        .map(|desc| {
            let frame_sizes = transport.supported_frame_sizes(desc.format)?;
            Ok(CapabilityEntry {
                format: desc.format,
                encoding: desc.encoding,
                frame_sizes,
            })
        })
        .collect()
}

/// Check whether a device advertises exactly this format, encoding and size
///
/// Only exact size matches count. A device that cannot be queried supports
/// nothing.
pub fn is_supported<T: DeviceTransport>(
    transport: &T,
    format: u32,
    width: u32,
    height: u32,
    encoding: &str,
) -> bool {
    let formats = match transport.supported_formats() {
        Ok(formats) => formats,
        Err(e) => {
            tracing::warn!("Failed to query supported formats: {}", e);
            return false;
        }
    };

    for desc in formats {
        if desc.format != format || desc.encoding != encoding {
            continue;
        }

        match transport.supported_frame_sizes(format) {
            Ok(sizes) => {
                if sizes
                    .iter()
                    .any(|size| size.max_width == width && size.max_height == height)
                {
                    return true;
                }
            }
            Err(e) => tracing::warn!("Failed to query frame sizes for format {}: {}", format, e),
        }
    }

    false
}

use crate::capture::{capabilities, CapabilityEntry};
use crate::transport::DeviceTransport;
use std::fmt;

/// Upper bound on probed device indices
pub const DEFAULT_MAX_DEVICES: u32 = 64;

/// Capabilities of one probed device
#[derive(Debug, Clone)]
pub struct DeviceReport {
    pub path: String,
    pub capabilities: Vec<CapabilityEntry>,
}

impl fmt::Display for DeviceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Device: {}", self.path)?;
        for entry in &self.capabilities {
            for size in &entry.frame_sizes {
                writeln!(
                    f,
                    "  Format: {} Encoding: {} Width: {:4} Height: {:4}",
                    entry.format, entry.encoding, size.max_width, size.max_height
                )?;
            }
        }
        Ok(())
    }
}

pub fn device_path(index: u32) -> String {
    format!("/dev/video{}", index)
}

/// Probe `/dev/video0`, `/dev/video1`, ... until one fails to open
///
/// Stops after `max_devices` paths even if every open succeeds.
pub fn probe_devices<T: DeviceTransport>(max_devices: u32) -> Vec<DeviceReport> {
    let mut reports = Vec::new();

    for index in 0..max_devices {
        let path = device_path(index);
        let transport = match T::open(&path) {
            Ok(transport) => transport,
            Err(e) => {
                tracing::debug!("Stopping probe at {}: {}", path, e);
                break;
            }
        };

        let capabilities = capabilities(&transport).unwrap_or_else(|e| {
            tracing::warn!("Failed to query capabilities of {}: {}", path, e);
            Vec::new()
        });
        transport.close();

        reports.push(DeviceReport { path, capabilities });
    }

    reports
}

//! Device probe backed by the cpal default host

use cpal::traits::{DeviceTrait, HostTrait};
use tracing::debug;

use crate::application::ports::DeviceProbe;

/// Answers capability questions about the default input device
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalDeviceProbe;

impl CpalDeviceProbe {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceProbe for CpalDeviceProbe {
    fn can_record(&self) -> bool {
        cpal::default_host().default_input_device().is_some()
    }

    /// The device counts as busy when it exists but refuses to report a
    /// default configuration.
    fn is_microphone_busy(&self) -> bool {
        let Some(device) = cpal::default_host().default_input_device() else {
            return false;
        };

        match device.default_input_config() {
            Ok(_) => false,
            Err(e) => {
                debug!(error = %e, "default input device is not available");
                true
            }
        }
    }
}

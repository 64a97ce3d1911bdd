//! Capture capability port

/// Port for checking whether the machine can record right now.
pub trait DeviceProbe: Send + Sync {
    /// Whether a usable input device exists
    fn can_record(&self) -> bool;

    /// Whether the input device is held by another application
    fn is_microphone_busy(&self) -> bool;
}

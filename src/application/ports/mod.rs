//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod config;
pub mod device;
pub mod notifier;
pub mod observer;
pub mod recorder;

// Re-export common types
pub use config::ConfigStore;
pub use device::DeviceProbe;
pub use notifier::{NotificationError, NotificationIcon, Notifier};
pub use observer::StatusObserver;
pub use recorder::{ActiveRecording, AudioBackend, RecorderError};

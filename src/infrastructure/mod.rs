//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with cpal, FFmpeg, desktop notifications and the XDG config dir.

pub mod config;
pub mod device;
pub mod notification;
pub mod recording;

// Re-export adapters
pub use config::XdgConfigStore;
pub use device::CpalDeviceProbe;
pub use notification::{create_notifier, NoOpNotifier, NotifyRustNotifier};
pub use recording::{CpalBackend, FfmpegBackend};

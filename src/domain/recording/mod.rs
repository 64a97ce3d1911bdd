//! Recording value objects

pub mod duration;
pub mod recording_data;
pub mod status;

pub use duration::Duration;
pub use recording_data::{AudioMimeType, OutputArtifact, RecordingData, UNKNOWN_DURATION_MS};
pub use status::{CurrentStatus, RecordingStatus, StatusUpdate, STATUS_UPDATE_EVENT};

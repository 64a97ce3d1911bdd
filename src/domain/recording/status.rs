//! Session status value objects

use std::fmt;

use serde::{Deserialize, Serialize};

/// Event name under which status updates are pushed to the host
pub const STATUS_UPDATE_EVENT: &str = "recordingUpdate";

/// Lifecycle status of the recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordingStatus {
    #[default]
    None,
    Recording,
    Paused,
    Stopped,
}

impl RecordingStatus {
    /// Get the wire representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Recording => "RECORDING",
            Self::Paused => "PAUSED",
            Self::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable progress snapshot pushed to the registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    is_recording: bool,
    elapsed_seconds: u64,
}

impl StatusUpdate {
    pub const fn new(is_recording: bool, elapsed_seconds: u64) -> Self {
        Self {
            is_recording,
            elapsed_seconds,
        }
    }

    pub const fn is_recording(&self) -> bool {
        self.is_recording
    }

    pub const fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }
}

/// Answer to a status query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStatus {
    pub status: RecordingStatus,
    pub elapsed_seconds: u64,
}

impl CurrentStatus {
    /// Status reported when no session exists
    pub const fn none() -> Self {
        Self {
            status: RecordingStatus::None,
            elapsed_seconds: 0,
        }
    }
}

impl Default for CurrentStatus {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_names() {
        assert_eq!(RecordingStatus::None.to_string(), "NONE");
        assert_eq!(RecordingStatus::Paused.to_string(), "PAUSED");
        assert_eq!(
            serde_json::to_string(&RecordingStatus::Recording).unwrap(),
            "\"RECORDING\""
        );
    }

    #[test]
    fn status_update_serializes_camel_case() {
        let json = serde_json::to_value(StatusUpdate::new(true, 3)).unwrap();
        assert_eq!(json["isRecording"], true);
        assert_eq!(json["elapsedSeconds"], 3);
    }

    #[test]
    fn current_status_default_is_none() {
        let status = CurrentStatus::default();
        assert_eq!(status.status, RecordingStatus::None);
        assert_eq!(status.elapsed_seconds, 0);
    }
}

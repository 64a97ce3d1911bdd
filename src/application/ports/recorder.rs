//! Recorder backend port interfaces

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::recording::OutputArtifact;

/// Recorder backend errors
#[derive(Debug, Clone, Error)]
pub enum RecorderError {
    #[error("No audio input device available")]
    NoInputDevice,

    #[error("Recorder is not available: {0}")]
    Unavailable(String),

    #[error("Audio input device is busy: {0}")]
    DeviceBusy(String),

    #[error("Failed to start recording: {0}")]
    StartFailed(String),

    #[error("Pausing and resuming is not supported on this platform")]
    UnsupportedOnPlatform,

    #[error("Recording failed: {0}")]
    RecordingFailed(String),

    #[error("Failed to stop recording: {0}")]
    StopFailed(String),

    #[error("Failed to write recording: {0}")]
    WriteFailed(String),

    #[error("Failed to delete recording: {0}")]
    DeleteFailed(String),
}

/// Port for a platform recording primitive.
///
/// Each call to [`open`](AudioBackend::open) begins a new capture and hands
/// back the handle that owns it.
#[async_trait]
pub trait AudioBackend: Send + Sync + 'static {
    /// Handle for one capture in progress
    type Recording: ActiveRecording;

    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Begin capturing audio.
    ///
    /// # Returns
    /// The handle of the running capture or an error
    async fn open(&self) -> Result<Self::Recording, RecorderError>;
}

/// A capture started by an [`AudioBackend`].
///
/// Not reentrant: the session controller is its only user.
#[async_trait]
pub trait ActiveRecording: Send + 'static {
    /// Suspend capture. Returns `false` if the recorder did not change state.
    fn pause(&mut self) -> Result<bool, RecorderError>;

    /// Continue a suspended capture. Returns `false` if the recorder did not change state.
    fn resume(&mut self) -> Result<bool, RecorderError>;

    /// Stop capture and finish writing the output artifact.
    async fn stop(&mut self) -> Result<(), RecorderError>;

    /// The artifact this capture writes to.
    fn output_artifact(&self) -> OutputArtifact;

    /// Remove the output artifact from disk. Missing files are not an error.
    async fn delete_output_artifact(&mut self) -> Result<(), RecorderError>;
}

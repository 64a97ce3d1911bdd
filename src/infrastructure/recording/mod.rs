//! Recording infrastructure module
//!
//! Provides cross-platform audio capture using cpal (primary) or FFmpeg (fallback).
//! The cpal backend encodes to FLAC; FFmpeg writes Ogg/Opus.

mod cpal_backend;
mod ffmpeg_backend;
mod flac_encoder;

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::application::ports::RecorderError;
use crate::domain::recording::AudioMimeType;

pub use cpal_backend::{CpalBackend, CpalRecording};
pub use ffmpeg_backend::{FfmpegBackend, FfmpegRecording};
pub use flac_encoder::{encode_to_flac, EncodingError, TARGET_SAMPLE_RATE};

/// Build a unique artifact path inside `dir`
pub fn artifact_path(dir: &Path, mime_type: AudioMimeType) -> PathBuf {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);

    dir.join(format!(
        "voice-recording-{}-{}.{}",
        std::process::id(),
        timestamp,
        mime_type.extension()
    ))
}

/// Remove an artifact; a file that is already gone is fine
pub(crate) async fn remove_artifact(path: &Path) -> Result<(), RecorderError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RecorderError::DeleteFailed(format!(
            "{}: {}",
            path.display(),
            e
        ))),
    }
}

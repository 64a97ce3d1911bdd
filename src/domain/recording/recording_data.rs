//! Recorded audio value objects

use std::fmt;
use std::path::{Path, PathBuf};

/// Duration reported when the length of a recording cannot be determined
pub const UNKNOWN_DURATION_MS: i64 = -1;

/// Supported capture MIME types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioMimeType {
    Flac,
    Ogg,
    Aac,
    Wav,
}

impl AudioMimeType {
    /// Get the MIME type string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Flac => "audio/flac",
            Self::Ogg => "audio/ogg",
            Self::Aac => "audio/aac",
            Self::Wav => "audio/wav",
        }
    }

    /// Get the file extension
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Flac => "flac",
            Self::Ogg => "ogg",
            Self::Aac => "aac",
            Self::Wav => "wav",
        }
    }
}

impl fmt::Display for AudioMimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for AudioMimeType {
    fn default() -> Self {
        Self::Flac
    }
}

/// Reference to the file a backend is writing.
///
/// The duration is only meaningful once the backend has been stopped;
/// before that it holds [`UNKNOWN_DURATION_MS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    path: PathBuf,
    mime_type: AudioMimeType,
    ms_duration: i64,
}

impl OutputArtifact {
    pub fn new(path: impl Into<PathBuf>, mime_type: AudioMimeType) -> Self {
        Self {
            path: path.into(),
            mime_type,
            ms_duration: UNKNOWN_DURATION_MS,
        }
    }

    /// Record the measured duration of the finished artifact
    pub fn with_duration(mut self, ms_duration: i64) -> Self {
        self.ms_duration = ms_duration;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mime_type(&self) -> AudioMimeType {
        self.mime_type
    }

    pub fn ms_duration(&self) -> i64 {
        self.ms_duration
    }
}

/// Finished recording handed to the caller of `stop`.
#[derive(Debug, Clone)]
pub struct RecordingData {
    data: Vec<u8>,
    ms_duration: i64,
    mime_type: AudioMimeType,
}

impl RecordingData {
    /// Create RecordingData from raw bytes
    pub fn new(data: Vec<u8>, ms_duration: i64, mime_type: AudioMimeType) -> Self {
        Self {
            data,
            ms_duration,
            mime_type,
        }
    }

    /// Get the raw audio data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume and return the raw audio data
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Duration in milliseconds, negative when unknown
    pub fn ms_duration(&self) -> i64 {
        self.ms_duration
    }

    /// Get the MIME type
    pub fn mime_type(&self) -> AudioMimeType {
        self.mime_type
    }

    /// Get the size in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Get human-readable size
    pub fn human_readable_size(&self) -> String {
        let bytes = self.size_bytes();
        if bytes < 1024 {
            format!("{} B", bytes)
        } else if bytes < 1024 * 1024 {
            format!("{:.1} KB", bytes as f64 / 1024.0)
        } else {
            format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
        }
    }

    /// Encode the audio data as base64
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_type_strings() {
        assert_eq!(AudioMimeType::Flac.as_str(), "audio/flac");
        assert_eq!(AudioMimeType::Ogg.extension(), "ogg");
        assert_eq!(AudioMimeType::default(), AudioMimeType::Flac);
    }

    #[test]
    fn artifact_duration_unknown_until_set() {
        let artifact = OutputArtifact::new("/tmp/rec.flac", AudioMimeType::Flac);
        assert_eq!(artifact.ms_duration(), UNKNOWN_DURATION_MS);

        let artifact = artifact.with_duration(1500);
        assert_eq!(artifact.ms_duration(), 1500);
        assert_eq!(artifact.path(), Path::new("/tmp/rec.flac"));
    }

    #[test]
    fn human_readable_size() {
        let small = RecordingData::new(vec![0u8; 500], 10, AudioMimeType::Flac);
        assert_eq!(small.human_readable_size(), "500 B");

        let medium = RecordingData::new(vec![0u8; 2048], 10, AudioMimeType::Flac);
        assert_eq!(medium.human_readable_size(), "2.0 KB");
    }

    #[test]
    fn to_base64_decodes_back() {
        let data = RecordingData::new(vec![1, 2, 3, 4], 1000, AudioMimeType::Ogg);
        let b64 = data.to_base64();

        use base64::Engine;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&b64)
            .unwrap();
        assert_eq!(decoded, vec![1, 2, 3, 4]);
    }
}

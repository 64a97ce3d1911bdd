//! FFmpeg-based recorder backend
//!
//! Spawns `ffmpeg` capturing from the configured input and writing Ogg/Opus.
//! Pause and resume suspend the process with SIGSTOP/SIGCONT, which is only
//! available on Unix.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{artifact_path, remove_artifact};
use crate::application::ports::{ActiveRecording, AudioBackend, RecorderError};
use crate::domain::recording::{AudioMimeType, OutputArtifact};

/// Grace period for FFmpeg to start before we check it is still alive
const STARTUP_GRACE: StdDuration = StdDuration::from_millis(150);

/// How long FFmpeg gets to finalize the file after SIGINT
const SHUTDOWN_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// Recorder backend that shells out to `ffmpeg`
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    output_dir: PathBuf,
    input_format: String,
    input_device: String,
}

impl FfmpegBackend {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        input_format: impl Into<String>,
        input_device: impl Into<String>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            input_format: input_format.into(),
            input_device: input_device.into(),
        }
    }

    /// Build FFmpeg args for an unbounded capture
    fn build_ffmpeg_args(&self, output_path: &Path) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-f".to_string(),
            self.input_format.clone(),
            "-i".to_string(),
            self.input_device.clone(),
            "-ar".to_string(),
            "16000".to_string(), // 16kHz sample rate
            "-ac".to_string(),
            "1".to_string(), // Mono
            "-c:a".to_string(),
            "libopus".to_string(),
            "-b:a".to_string(),
            "16k".to_string(),
            "-application".to_string(),
            "voip".to_string(),
            "-y".to_string(),
            output_path.to_string_lossy().to_string(),
        ]
    }

    fn spawn_ffmpeg(args: &[String]) -> Result<Child, RecorderError> {
        Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RecorderError::Unavailable("ffmpeg not found in PATH".to_string())
                } else {
                    RecorderError::StartFailed(e.to_string())
                }
            })
    }
}

#[async_trait]
impl AudioBackend for FfmpegBackend {
    type Recording = FfmpegRecording;

    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn open(&self) -> Result<FfmpegRecording, RecorderError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| RecorderError::StartFailed(format!("Cannot create output dir: {}", e)))?;

        let path = artifact_path(&self.output_dir, AudioMimeType::Ogg);
        let mut child = Self::spawn_ffmpeg(&self.build_ffmpeg_args(&path))?;

        tokio::time::sleep(STARTUP_GRACE).await;
        if let Ok(Some(status)) = child.try_wait() {
            let message = last_stderr_line(&mut child).await;
            return Err(RecorderError::StartFailed(format!(
                "ffmpeg exited with {}: {}",
                status, message
            )));
        }

        debug!(path = %path.display(), "ffmpeg capture started");
        Ok(FfmpegRecording {
            child: Some(child),
            artifact: OutputArtifact::new(path, AudioMimeType::Ogg),
            clock: ActiveClock::started(),
        })
    }
}

/// Wall clock that only advances while capture is running
#[derive(Debug, Clone, Copy)]
struct ActiveClock {
    accumulated: StdDuration,
    running_since: Option<Instant>,
}

impl ActiveClock {
    fn started() -> Self {
        Self {
            accumulated: StdDuration::ZERO,
            running_since: Some(Instant::now()),
        }
    }

    fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    fn halt(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += since.elapsed();
        }
    }

    fn proceed(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    fn elapsed(&self) -> StdDuration {
        self.accumulated + self.running_since.map_or(StdDuration::ZERO, |s| s.elapsed())
    }
}

/// A running FFmpeg capture
pub struct FfmpegRecording {
    child: Option<Child>,
    artifact: OutputArtifact,
    clock: ActiveClock,
}

impl FfmpegRecording {
    #[cfg(unix)]
    fn signal(&self, sig: nix::sys::signal::Signal) -> Result<(), RecorderError> {
        use nix::sys::signal;
        use nix::unistd::Pid;

        let pid = self
            .child
            .as_ref()
            .and_then(Child::id)
            .ok_or_else(|| RecorderError::RecordingFailed("ffmpeg is not running".to_string()))?;

        signal::kill(Pid::from_raw(pid as i32), sig)
            .map_err(|e| RecorderError::RecordingFailed(format!("Signal {:?} failed: {}", sig, e)))
    }

    /// Ask FFmpeg to finalize the file and exit
    #[cfg(unix)]
    fn request_shutdown(&mut self) -> Result<(), RecorderError> {
        use nix::sys::signal::Signal;

        if !self.clock.is_running() {
            self.signal(Signal::SIGCONT)?;
        }
        self.signal(Signal::SIGINT)
    }

    #[cfg(not(unix))]
    fn request_shutdown(&mut self) -> Result<(), RecorderError> {
        match self.child.as_mut() {
            Some(child) => child
                .start_kill()
                .map_err(|e| RecorderError::StopFailed(e.to_string())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ActiveRecording for FfmpegRecording {
    #[cfg(unix)]
    fn pause(&mut self) -> Result<bool, RecorderError> {
        if !self.clock.is_running() {
            return Ok(false);
        }
        self.signal(nix::sys::signal::Signal::SIGSTOP)?;
        self.clock.halt();
        Ok(true)
    }

    #[cfg(not(unix))]
    fn pause(&mut self) -> Result<bool, RecorderError> {
        Err(RecorderError::UnsupportedOnPlatform)
    }

    #[cfg(unix)]
    fn resume(&mut self) -> Result<bool, RecorderError> {
        if self.clock.is_running() {
            return Ok(false);
        }
        self.signal(nix::sys::signal::Signal::SIGCONT)?;
        self.clock.proceed();
        Ok(true)
    }

    #[cfg(not(unix))]
    fn resume(&mut self) -> Result<bool, RecorderError> {
        Err(RecorderError::UnsupportedOnPlatform)
    }

    async fn stop(&mut self) -> Result<(), RecorderError> {
        if self.child.is_none() {
            return Ok(());
        }

        self.request_shutdown()?;
        self.clock.halt();

        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "ffmpeg exited"),
            Ok(Err(e)) => return Err(RecorderError::StopFailed(e.to_string())),
            Err(_) => {
                warn!("ffmpeg did not exit in time, killing it");
                child
                    .kill()
                    .await
                    .map_err(|e| RecorderError::StopFailed(e.to_string()))?;
            }
        }

        let ms_duration = self.clock.elapsed().as_millis() as i64;
        self.artifact = self.artifact.clone().with_duration(ms_duration);
        Ok(())
    }

    fn output_artifact(&self) -> OutputArtifact {
        self.artifact.clone()
    }

    async fn delete_output_artifact(&mut self) -> Result<(), RecorderError> {
        remove_artifact(self.artifact.path()).await
    }
}

async fn last_stderr_line(child: &mut Child) -> String {
    let Some(mut stderr) = child.stderr.take() else {
        return "unknown error".to_string();
    };

    let mut buf = Vec::new();
    let _ = stderr.read_to_end(&mut buf).await;
    String::from_utf8_lossy(&buf)
        .lines()
        .last()
        .unwrap_or("unknown error")
        .to_string()
}

//! Cross-platform recorder backend using cpal
//!
//! Captures mono 16-bit PCM from the default input device and writes a
//! FLAC artifact when stopped.
//!
//! The cpal stream is not `Send`, so it lives on a dedicated capture thread
//! for the whole session; the handle only shares the sample buffer and flags.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::thread::JoinHandle;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BuildStreamError, SampleFormat, SampleRate, StreamConfig};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::flac_encoder::{encode_to_flac, TARGET_SAMPLE_RATE};
use super::{artifact_path, remove_artifact};
use crate::application::ports::{ActiveRecording, AudioBackend, RecorderError};
use crate::domain::recording::{AudioMimeType, OutputArtifact};

/// How often the capture thread checks for shutdown
const CAPTURE_POLL_INTERVAL: StdDuration = StdDuration::from_millis(50);

type SampleBuffer = Arc<StdMutex<Vec<i16>>>;

/// Recorder backend backed by the default cpal input device
#[derive(Debug, Clone)]
pub struct CpalBackend {
    output_dir: PathBuf,
}

impl CpalBackend {
    /// Create a backend writing artifacts to `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Get the default input device
    fn input_device() -> Result<cpal::Device, RecorderError> {
        cpal::default_host()
            .default_input_device()
            .ok_or(RecorderError::NoInputDevice)
    }

    /// Pick an input configuration, preferring mono and 16kHz
    fn input_config(device: &cpal::Device) -> Result<(StreamConfig, SampleFormat), RecorderError> {
        let supported = device.supported_input_configs().map_err(|e| {
            RecorderError::Unavailable(format!("Failed to query input configs: {}", e))
        })?;

        let includes_target = |range: &cpal::SupportedStreamConfigRange| {
            range.min_sample_rate().0 <= TARGET_SAMPLE_RATE
                && range.max_sample_rate().0 >= TARGET_SAMPLE_RATE
        };

        let mut best: Option<cpal::SupportedStreamConfigRange> = None;
        for range in supported {
            if !matches!(range.sample_format(), SampleFormat::I16 | SampleFormat::F32) {
                continue;
            }

            let is_better = match &best {
                None => true,
                Some(current) => {
                    range.channels() < current.channels()
                        || (includes_target(&range) && !includes_target(current))
                }
            };
            if is_better {
                best = Some(range);
            }
        }

        let range = best.ok_or_else(|| {
            RecorderError::Unavailable("No supported input configuration".to_string())
        })?;

        let sample_rate = if includes_target(&range) {
            SampleRate(TARGET_SAMPLE_RATE)
        } else {
            range.min_sample_rate()
        };

        let config = StreamConfig {
            channels: range.channels(),
            sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };
        Ok((config, range.sample_format()))
    }

    fn build_stream(
        device: &cpal::Device,
        config: &StreamConfig,
        sample_format: SampleFormat,
        samples: SampleBuffer,
        capturing: Arc<AtomicBool>,
    ) -> Result<cpal::Stream, RecorderError> {
        let channels = config.channels;
        let on_error = |err: cpal::StreamError| warn!(error = %err, "audio stream error");

        let stream = match sample_format {
            SampleFormat::I16 => device.build_input_stream(
                config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    if capturing.load(Ordering::SeqCst) {
                        append_mono(&samples, data, channels);
                    }
                },
                on_error,
                None,
            ),
            SampleFormat::F32 => device.build_input_stream(
                config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if capturing.load(Ordering::SeqCst) {
                        let pcm: Vec<i16> = data.iter().map(|&s| f32_to_i16(s)).collect();
                        append_mono(&samples, &pcm, channels);
                    }
                },
                on_error,
                None,
            ),
            other => {
                return Err(RecorderError::Unavailable(format!(
                    "Unsupported sample format: {:?}",
                    other
                )))
            }
        };

        stream.map_err(|e| match e {
            BuildStreamError::DeviceNotAvailable => RecorderError::DeviceBusy(e.to_string()),
            other => RecorderError::StartFailed(other.to_string()),
        })
    }

    /// Body of the capture thread. Reports readiness (or the failure) once,
    /// then keeps the stream alive until `running` is cleared.
    fn capture(
        samples: SampleBuffer,
        capturing: Arc<AtomicBool>,
        running: Arc<AtomicBool>,
        ready: oneshot::Sender<Result<u32, RecorderError>>,
    ) {
        let started = Self::input_device().and_then(|device| {
            let (config, sample_format) = Self::input_config(&device)?;
            let stream =
                Self::build_stream(&device, &config, sample_format, samples, capturing)?;
            stream
                .play()
                .map_err(|e| RecorderError::StartFailed(e.to_string()))?;
            Ok((stream, config.sample_rate.0))
        });

        let stream = match started {
            Ok((stream, sample_rate)) => {
                if ready.send(Ok(sample_rate)).is_err() {
                    return;
                }
                stream
            }
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        };

        while running.load(Ordering::SeqCst) {
            std::thread::sleep(CAPTURE_POLL_INTERVAL);
        }
        drop(stream);
        debug!("capture thread finished");
    }
}

#[async_trait]
impl AudioBackend for CpalBackend {
    type Recording = CpalRecording;

    fn name(&self) -> &'static str {
        "cpal"
    }

    async fn open(&self) -> Result<CpalRecording, RecorderError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| RecorderError::StartFailed(format!("Cannot create output dir: {}", e)))?;

        let samples: SampleBuffer = Arc::new(StdMutex::new(Vec::new()));
        let capturing = Arc::new(AtomicBool::new(true));
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = oneshot::channel();

        let worker = {
            let samples = Arc::clone(&samples);
            let capturing = Arc::clone(&capturing);
            let running = Arc::clone(&running);
            std::thread::Builder::new()
                .name("cpal-capture".to_string())
                .spawn(move || Self::capture(samples, capturing, running, ready_tx))
                .map_err(|e| RecorderError::StartFailed(e.to_string()))?
        };

        let sample_rate = match ready_rx.await {
            Ok(Ok(rate)) => rate,
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(RecorderError::StartFailed(
                    "Capture thread exited before starting".to_string(),
                ))
            }
        };

        let artifact = OutputArtifact::new(
            artifact_path(&self.output_dir, AudioMimeType::Flac),
            AudioMimeType::Flac,
        );
        debug!(path = %artifact.path().display(), sample_rate, "cpal capture started");

        Ok(CpalRecording {
            artifact,
            samples,
            capturing,
            running,
            sample_rate,
            worker: Some(worker),
        })
    }
}

/// A running cpal capture
pub struct CpalRecording {
    artifact: OutputArtifact,
    samples: SampleBuffer,
    /// Cleared while paused; the stream keeps running but samples are dropped
    capturing: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    sample_rate: u32,
    worker: Option<JoinHandle<()>>,
}

impl CpalRecording {
    async fn join_worker(&mut self) -> Result<(), RecorderError> {
        self.running.store(false, Ordering::SeqCst);
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        tokio::task::spawn_blocking(move || worker.join())
            .await
            .map_err(|e| RecorderError::StopFailed(format!("Join task error: {}", e)))?
            .map_err(|_| RecorderError::StopFailed("Capture thread panicked".to_string()))
    }

    fn take_samples(&self) -> Vec<i16> {
        let mut buffer = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *buffer)
    }
}

#[async_trait]
impl ActiveRecording for CpalRecording {
    fn pause(&mut self) -> Result<bool, RecorderError> {
        Ok(self.capturing.swap(false, Ordering::SeqCst))
    }

    fn resume(&mut self) -> Result<bool, RecorderError> {
        Ok(!self.capturing.swap(true, Ordering::SeqCst))
    }

    async fn stop(&mut self) -> Result<(), RecorderError> {
        self.capturing.store(false, Ordering::SeqCst);
        self.join_worker().await?;

        let samples = self.take_samples();
        let ms_duration = samples_to_millis(samples.len(), self.sample_rate);
        let sample_rate = self.sample_rate;

        let encoded = if samples.is_empty() {
            Vec::new()
        } else {
            tokio::task::spawn_blocking(move || encode_to_flac(&samples, sample_rate))
                .await
                .map_err(|e| RecorderError::RecordingFailed(format!("Encode task error: {}", e)))?
                .map_err(|e| RecorderError::RecordingFailed(e.to_string()))?
        };

        tokio::fs::write(self.artifact.path(), &encoded)
            .await
            .map_err(|e| RecorderError::WriteFailed(e.to_string()))?;

        self.artifact = self.artifact.clone().with_duration(ms_duration);
        debug!(bytes = encoded.len(), ms_duration, "cpal capture written");
        Ok(())
    }

    fn output_artifact(&self) -> OutputArtifact {
        self.artifact.clone()
    }

    async fn delete_output_artifact(&mut self) -> Result<(), RecorderError> {
        remove_artifact(self.artifact.path()).await
    }
}

impl Drop for CpalRecording {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Mix interleaved frames down to mono
fn stereo_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels as usize)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
            (sum / i32::from(channels)) as i16
        })
        .collect()
}

fn append_mono(buffer: &SampleBuffer, data: &[i16], channels: u16) {
    let mono = stereo_to_mono(data, channels);
    if let Ok(mut buffer) = buffer.lock() {
        buffer.extend_from_slice(&mono);
    }
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}

fn samples_to_millis(samples: usize, sample_rate: u32) -> i64 {
    if sample_rate == 0 {
        return 0;
    }
    (samples as u64 * 1000 / u64::from(sample_rate)) as i64
}

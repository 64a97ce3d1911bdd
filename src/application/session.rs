//! Recording session use case
//!
//! Owns the single recording session, drives the recorder backend and
//! runs the one-second progress tick.

use std::sync::{Arc, Weak};
use std::time::Duration as StdDuration;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::recording::{CurrentStatus, Duration, OutputArtifact, RecordingData};
use crate::domain::session::{InvalidStateTransition, RecordingSession, SessionAction};

use super::ports::{ActiveRecording, AudioBackend, DeviceProbe, RecorderError, StatusObserver};
use super::progress::ProgressNotifier;

/// Errors surfaced by session commands.
///
/// Every variant maps to a stable code via [`SessionError::code`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("A recording session is already in progress")]
    AlreadyRecording,

    #[error("No recording has been started")]
    NotRecording,

    #[error("Pausing and resuming is not supported on this platform")]
    UnsupportedOnPlatform,

    #[error("This device cannot record audio")]
    CannotRecord,

    #[error("The microphone is being used by another application")]
    DeviceBusy,

    #[error("Failed to record: {0}")]
    FailedToRecord(String),

    #[error("The recording is empty")]
    EmptyRecording,

    #[error("Failed to fetch the recording: {0}")]
    FetchFailed(String),
}

impl SessionError {
    /// Stable code for the host boundary
    pub const fn code(&self) -> &'static str {
        match self {
            Self::AlreadyRecording => "ALREADY_RECORDING",
            Self::NotRecording => "RECORDING_HAS_NOT_STARTED",
            Self::UnsupportedOnPlatform => "NOT_SUPPORTED_OS_VERSION",
            Self::CannotRecord => "CANNOT_RECORD_ON_THIS_PHONE",
            Self::DeviceBusy => "MICROPHONE_BEING_USED",
            Self::FailedToRecord(_) => "FAILED_TO_RECORD",
            Self::EmptyRecording => "EMPTY_RECORDING",
            Self::FetchFailed(_) => "FAILED_TO_FETCH_RECORDING",
        }
    }

    fn from_open(err: RecorderError) -> Self {
        match err {
            RecorderError::NoInputDevice | RecorderError::Unavailable(_) => Self::CannotRecord,
            RecorderError::DeviceBusy(_) => Self::DeviceBusy,
            RecorderError::UnsupportedOnPlatform => Self::UnsupportedOnPlatform,
            other => Self::FailedToRecord(other.to_string()),
        }
    }

    fn from_control(err: RecorderError) -> Self {
        match err {
            RecorderError::UnsupportedOnPlatform => Self::UnsupportedOnPlatform,
            other => Self::FailedToRecord(other.to_string()),
        }
    }
}

impl From<InvalidStateTransition> for SessionError {
    fn from(err: InvalidStateTransition) -> Self {
        match err.action {
            SessionAction::Start => Self::AlreadyRecording,
            SessionAction::Pause | SessionAction::Resume | SessionAction::Stop => {
                Self::NotRecording
            }
        }
    }
}

/// Handle to the running tick task. Cancelling is idempotent.
#[derive(Default)]
struct Ticker {
    task: Option<JoinHandle<()>>,
}

impl Ticker {
    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct SessionState<R> {
    session: RecordingSession,
    recording: Option<R>,
    ticker: Ticker,
    /// Bumped on every start so a stale tick never touches a newer session
    generation: u64,
}

impl<R> SessionState<R> {
    fn new() -> Self {
        Self {
            session: RecordingSession::new(),
            recording: None,
            ticker: Ticker::default(),
            generation: 0,
        }
    }
}

/// Session controller.
///
/// Commands are expected from a single control queue; the internal lock only
/// serialises them against the tick task.
pub struct SessionController<B, P>
where
    B: AudioBackend,
    P: DeviceProbe,
{
    backend: B,
    probe: P,
    state: Arc<Mutex<SessionState<B::Recording>>>,
    notifier: Arc<ProgressNotifier>,
    tick_interval: StdDuration,
}

impl<B, P> SessionController<B, P>
where
    B: AudioBackend,
    P: DeviceProbe,
{
    /// Create a controller with the default one-second tick
    pub fn new(backend: B, probe: P) -> Self {
        Self::with_tick_interval(backend, probe, Duration::default_tick_interval())
    }

    /// Create a controller with a custom tick period
    pub fn with_tick_interval(backend: B, probe: P, tick_interval: Duration) -> Self {
        Self {
            backend,
            probe,
            state: Arc::new(Mutex::new(SessionState::new())),
            notifier: Arc::new(ProgressNotifier::new()),
            tick_interval: tick_interval.as_std(),
        }
    }

    /// Name of the recorder backend in use
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Capability check, independent of any session
    pub fn can_record(&self) -> bool {
        self.probe.can_record()
    }

    /// Register the status observer, replacing any previous one
    pub fn register_observer<O>(&self, observer: &Arc<O>)
    where
        O: StatusObserver + 'static,
    {
        self.notifier.register(observer);
    }

    pub fn unregister_observer(&self) {
        self.notifier.unregister();
    }

    /// Current status snapshot; NONE when no session exists
    pub async fn status(&self) -> CurrentStatus {
        self.state.lock().await.session.snapshot()
    }

    /// Start a new session
    pub async fn start(&self) -> Result<(), SessionError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        state.session.ensure(SessionAction::Start)?;
        if !self.probe.can_record() {
            return Err(SessionError::CannotRecord);
        }
        if self.probe.is_microphone_busy() {
            return Err(SessionError::DeviceBusy);
        }

        let recording = self
            .backend
            .open()
            .await
            .map_err(SessionError::from_open)?;

        let update = state.session.begin()?;
        state.recording = Some(recording);
        state.generation += 1;
        info!(backend = self.backend.name(), "recording started");

        self.notifier.emit(update);
        state.ticker = self.arm_ticker(state.generation);
        Ok(())
    }

    /// Pause the session.
    ///
    /// Returns `false` when the backend did not change state; the session is left as is.
    pub async fn pause(&self) -> Result<bool, SessionError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        state.session.ensure(SessionAction::Pause)?;
        let recording = state
            .recording
            .as_mut()
            .ok_or(SessionError::NotRecording)?;
        if !recording.pause().map_err(SessionError::from_control)? {
            return Ok(false);
        }

        let update = state.session.pause()?;
        info!(elapsed_seconds = update.elapsed_seconds(), "recording paused");
        self.notifier.emit(update);
        Ok(true)
    }

    /// Resume a paused session.
    ///
    /// Returns `false` when the backend did not change state; the session is left as is.
    pub async fn resume(&self) -> Result<bool, SessionError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        state.session.ensure(SessionAction::Resume)?;
        let recording = state
            .recording
            .as_mut()
            .ok_or(SessionError::NotRecording)?;
        if !recording.resume().map_err(SessionError::from_control)? {
            return Ok(false);
        }

        let update = state.session.resume()?;
        info!(elapsed_seconds = update.elapsed_seconds(), "recording resumed");
        self.notifier.emit(update);
        Ok(true)
    }

    /// Stop the session and hand the recording to the caller.
    ///
    /// The backend artifact is released whether or not finalising succeeds.
    pub async fn stop(&self) -> Result<RecordingData, SessionError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        state.session.ensure(SessionAction::Stop)?;
        let mut recording = state
            .recording
            .take()
            .ok_or(SessionError::NotRecording)?;
        let final_update = state.session.finish()?;

        let result = finalize(&mut recording).await;
        if let Err(e) = recording.delete_output_artifact().await {
            warn!(error = %e, "failed to release recording artifact");
        }

        state.session.reset();
        self.notifier.emit(final_update);
        state.ticker.cancel();

        match &result {
            Ok(data) => info!(
                size = %data.human_readable_size(),
                ms_duration = data.ms_duration(),
                elapsed_seconds = final_update.elapsed_seconds(),
                "recording stopped"
            ),
            Err(e) => warn!(code = e.code(), error = %e, "recording stopped without audio"),
        }
        result
    }

    /// Forced teardown of the host process.
    ///
    /// Stops the backend, discards the artifact and drops the observer without
    /// emitting a final update. No-op when no session exists.
    pub async fn teardown(&self) {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        state.ticker.cancel();
        self.notifier.unregister();

        if let Some(mut recording) = state.recording.take() {
            if let Err(e) = recording.stop().await {
                warn!(error = %e, "failed to stop recorder during teardown");
            }
            if let Err(e) = recording.delete_output_artifact().await {
                warn!(error = %e, "failed to release recording artifact during teardown");
            }
            info!("recording session torn down");
        }
        state.session.reset();
    }

    fn arm_ticker(&self, generation: u64) -> Ticker {
        let shared = Arc::downgrade(&self.state);
        let notifier = Arc::clone(&self.notifier);
        let period = self.tick_interval;

        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                if !tick_once(&shared, &notifier, generation).await {
                    break;
                }
            }
        });

        Ticker { task: Some(task) }
    }
}

/// One tick firing. Returns `false` once the session it belongs to is gone.
async fn tick_once<R>(
    shared: &Weak<Mutex<SessionState<R>>>,
    notifier: &ProgressNotifier,
    generation: u64,
) -> bool {
    let Some(state) = shared.upgrade() else {
        return false;
    };
    let mut state = state.lock().await;
    if state.generation != generation || !state.session.is_active() {
        return false;
    }

    if let Some(update) = state.session.tick() {
        debug!(elapsed_seconds = update.elapsed_seconds(), "tick");
        notifier.emit(update);
    }
    true
}

async fn finalize<R: ActiveRecording>(recording: &mut R) -> Result<RecordingData, SessionError> {
    recording
        .stop()
        .await
        .map_err(|e| SessionError::FetchFailed(e.to_string()))?;

    let artifact = recording.output_artifact();
    let data = read_artifact(&artifact).await;
    if data.is_empty() || artifact.ms_duration() < 0 {
        return Err(SessionError::EmptyRecording);
    }

    Ok(RecordingData::new(
        data,
        artifact.ms_duration(),
        artifact.mime_type(),
    ))
}

/// Read errors degrade to an empty artifact.
async fn read_artifact(artifact: &OutputArtifact) -> Vec<u8> {
    match tokio::fs::read(artifact.path()).await {
        Ok(data) => data,
        Err(e) => {
            warn!(path = %artifact.path().display(), error = %e, "failed to read recording artifact");
            Vec::new()
        }
    }
}

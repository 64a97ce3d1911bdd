//! Recording session state machine

use std::fmt;
use thiserror::Error;

use crate::domain::recording::{CurrentStatus, RecordingStatus, StatusUpdate};

/// Commands that drive the session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionAction {
    Start,
    Pause,
    Resume,
    Stop,
}

impl SessionAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start recording",
            Self::Pause => "pause recording",
            Self::Resume => "resume recording",
            Self::Stop => "stop recording",
        }
    }
}

impl fmt::Display for SessionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid state transition: cannot {action} while in {current_status} state")]
pub struct InvalidStateTransition {
    pub current_status: RecordingStatus,
    pub action: SessionAction,
}

/// Recording session entity.
/// Owns the lifecycle status and the elapsed-seconds counter.
///
/// State machine:
///   NONE -> RECORDING (begin)
///   RECORDING -> PAUSED (pause)
///   PAUSED -> RECORDING (resume)
///   RECORDING | PAUSED -> STOPPED (finish)
///   any -> NONE (reset)
#[derive(Debug, Default)]
pub struct RecordingSession {
    status: RecordingStatus,
    elapsed_seconds: u64,
}

impl RecordingSession {
    /// Create a session holder with no active recording
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> RecordingStatus {
        self.status
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    /// Check whether a session exists (any status but NONE)
    pub fn is_active(&self) -> bool {
        self.status != RecordingStatus::None
    }

    pub fn is_recording(&self) -> bool {
        self.status == RecordingStatus::Recording
    }

    /// Snapshot for status queries
    pub fn snapshot(&self) -> CurrentStatus {
        CurrentStatus {
            status: self.status,
            elapsed_seconds: self.elapsed_seconds,
        }
    }

    /// Progress update describing the current state
    pub fn update(&self) -> StatusUpdate {
        StatusUpdate::new(self.is_recording(), self.elapsed_seconds)
    }

    /// Check that `action` is allowed without changing anything
    pub fn ensure(&self, action: SessionAction) -> Result<(), InvalidStateTransition> {
        let allowed = match action {
            SessionAction::Start => self.status == RecordingStatus::None,
            SessionAction::Pause => self.status == RecordingStatus::Recording,
            SessionAction::Resume => self.status == RecordingStatus::Paused,
            SessionAction::Stop => matches!(
                self.status,
                RecordingStatus::Recording | RecordingStatus::Paused
            ),
        };

        if allowed {
            Ok(())
        } else {
            Err(InvalidStateTransition {
                current_status: self.status,
                action,
            })
        }
    }

    /// Transition from NONE to RECORDING with a fresh counter
    pub fn begin(&mut self) -> Result<StatusUpdate, InvalidStateTransition> {
        self.ensure(SessionAction::Start)?;
        self.status = RecordingStatus::Recording;
        self.elapsed_seconds = 0;
        Ok(self.update())
    }

    /// Transition from RECORDING to PAUSED
    pub fn pause(&mut self) -> Result<StatusUpdate, InvalidStateTransition> {
        self.ensure(SessionAction::Pause)?;
        self.status = RecordingStatus::Paused;
        Ok(self.update())
    }

    /// Transition from PAUSED to RECORDING
    pub fn resume(&mut self) -> Result<StatusUpdate, InvalidStateTransition> {
        self.ensure(SessionAction::Resume)?;
        self.status = RecordingStatus::Recording;
        Ok(self.update())
    }

    /// Transition to STOPPED, keeping the counter for the final update
    pub fn finish(&mut self) -> Result<StatusUpdate, InvalidStateTransition> {
        self.ensure(SessionAction::Stop)?;
        self.status = RecordingStatus::Stopped;
        Ok(self.update())
    }

    /// Destroy the session
    pub fn reset(&mut self) {
        self.status = RecordingStatus::None;
        self.elapsed_seconds = 0;
    }

    /// Advance the counter by one second.
    ///
    /// Only counts while RECORDING; returns `None` (nothing to emit) otherwise.
    pub fn tick(&mut self) -> Option<StatusUpdate> {
        if !self.is_recording() {
            return None;
        }
        self.elapsed_seconds += 1;
        Some(self.update())
    }
}

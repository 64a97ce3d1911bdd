//! Recording session entity

mod recording_session;

pub use recording_session::{InvalidStateTransition, RecordingSession, SessionAction};

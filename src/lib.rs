//! Voice Recorder - background voice recording with pause/resume
//!
//! This crate provides a recording session core: a small state machine that
//! drives a platform recorder, reports elapsed recording time once per tick to
//! a single observer, and hands back the finished audio on stop.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Session state machine, value objects, and errors
//! - **Application**: Session controller, progress notifier, and port interfaces (traits)
//! - **Infrastructure**: Adapter implementations (cpal, FFmpeg, notifications, config file)
//! - **CLI**: Daemon host, JSON-lines IPC, client commands, and signal handling

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;

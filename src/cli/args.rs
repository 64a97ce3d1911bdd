//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::config::BackendKind;

/// Voice Recorder - background voice recording with pause/resume and live progress
#[derive(Parser, Debug)]
#[command(name = "voice-recorder")]
#[command(version)]
#[command(about = "Background voice recorder with pause/resume and live progress updates")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the recorder daemon in the foreground
    Daemon(DaemonArgs),
    /// Check whether this machine can record audio
    CanRecord,
    /// Start a recording session
    Start,
    /// Pause the current session
    Pause,
    /// Resume a paused session
    Resume,
    /// Stop the session and fetch the recording
    Stop(StopArgs),
    /// Show the current session status
    Status {
        /// Print the raw status JSON
        #[arg(long)]
        json: bool,
    },
    /// Print whether audio is being captured right now
    IsRecording,
    /// Print whole seconds recorded in the current session
    RecordingTime,
    /// Follow progress updates until interrupted
    Watch,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Daemon options; unset values come from config and environment
#[derive(Args, Debug, Default)]
pub struct DaemonArgs {
    /// Recorder backend
    #[arg(short = 'b', long, value_name = "BACKEND", env = "VOICE_RECORDER_BACKEND")]
    pub backend: Option<BackendArg>,

    /// Progress tick period (e.g., 1s, 500ms)
    #[arg(long, value_name = "TIME")]
    pub tick_interval: Option<String>,

    /// Directory for in-progress recordings
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Show a desktop notice when recording starts
    #[arg(short = 'n', long)]
    pub notify: bool,
}

/// Stop options
#[derive(Args, Debug, Default)]
pub struct StopArgs {
    /// Write the decoded audio to FILE
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print the raw stop payload JSON (base64 audio)
    #[arg(long)]
    pub json: bool,
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Backend argument for clap ValueEnum
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Cpal,
    Ffmpeg,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Cpal => BackendKind::Cpal,
            BackendArg::Ffmpeg => BackendKind::Ffmpeg,
        }
    }
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "backend",
    "tick_interval",
    "output_dir",
    "notify",
    "ffmpeg.input_format",
    "ffmpeg.input_device",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}

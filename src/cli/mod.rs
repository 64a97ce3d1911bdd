//! CLI layer - Command-line interface
//!
//! Contains argument parsing, output formatting, the daemon host with its
//! IPC endpoint, and the client commands that talk to it.

pub mod app;
pub mod args;
pub mod client_cmd;
pub mod config_cmd;
pub mod daemon_app;
pub mod ipc;
pub mod pid_file;
pub mod presenter;
pub mod signals;

// Re-export commonly used types
pub use app::{load_merged_config, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE_ERROR};
pub use args::{Cli, Commands, ConfigAction, DaemonArgs, StopArgs};
pub use daemon_app::{run_daemon, DaemonOptions};
pub use presenter::Presenter;

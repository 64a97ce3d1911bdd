//! Shared CLI plumbing: exit codes and config resolution

use crate::application::ports::ConfigStore;
use crate::domain::config::{AppConfig, BackendKind};
use crate::domain::recording::Duration;
use crate::infrastructure::XdgConfigStore;

use super::args::DaemonArgs;
use super::daemon_app::DaemonOptions;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Load and merge configuration from file and CLI.
///
/// Environment values reach `cli_config` through clap's `env` fallbacks, so
/// the effective order is defaults < file < env < cli.
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = store.load_or_empty().await;

    AppConfig::defaults().merge(file_config).merge(cli_config)
}

/// CLI layer of the config for the daemon command
pub fn daemon_cli_config(args: &DaemonArgs) -> AppConfig {
    AppConfig {
        backend: args.backend.map(|b| BackendKind::from(b).to_string()),
        tick_interval: args.tick_interval.clone(),
        output_dir: args
            .output_dir
            .as_ref()
            .map(|dir| dir.to_string_lossy().into_owned()),
        notify: args.notify.then_some(true),
        ffmpeg: None,
    }
}

/// Resolve daemon options, rejecting values that cannot be used
pub fn resolve_daemon_options(config: &AppConfig) -> Result<DaemonOptions, String> {
    let backend = match config.backend.as_deref() {
        Some(raw) => raw.parse::<BackendKind>().map_err(|e| e.to_string())?,
        None => BackendKind::default(),
    };

    let tick_interval = match config.tick_interval.as_deref() {
        Some(raw) => raw
            .parse::<Duration>()
            .map_err(|e| format!("Invalid tick-interval: {}", e))?,
        None => Duration::default_tick_interval(),
    };

    Ok(DaemonOptions {
        backend,
        tick_interval,
        output_dir: config.output_dir_or_default(),
        notify: config.notify_or_default(),
        ffmpeg_input_format: config.ffmpeg_input_format_or_default().to_string(),
        ffmpeg_input_device: config.ffmpeg_input_device_or_default().to_string(),
    })
}

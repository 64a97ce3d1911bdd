//! Voice Recorder CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use voice_recorder::cli::{
    app::{daemon_cli_config, load_merged_config, resolve_daemon_options},
    args::{Cli, Commands},
    client_cmd,
    config_cmd::handle_config_command,
    daemon_app::run_daemon,
    presenter::Presenter,
    EXIT_ERROR, EXIT_USAGE_ERROR,
};
use voice_recorder::infrastructure::XdgConfigStore;

/// Environment variable holding the log filter directives
const LOG_ENV: &str = "VOICE_RECORDER_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();
    let mut presenter = Presenter::new();

    let result = match cli.command {
        Commands::Config { action } => {
            let store = XdgConfigStore::new();
            handle_config_command(action, &store, &presenter)
                .await
                .map_err(|e| e.to_string())
        }
        Commands::Daemon(args) => {
            let config = load_merged_config(daemon_cli_config(&args)).await;
            return match resolve_daemon_options(&config) {
                Ok(options) => run_daemon(options).await,
                Err(e) => {
                    presenter.error(&e);
                    ExitCode::from(EXIT_USAGE_ERROR)
                }
            };
        }
        Commands::CanRecord => client_cmd::handle_can_record(&presenter).await,
        Commands::Start => client_cmd::handle_start(&presenter).await,
        Commands::Pause => client_cmd::handle_pause(&presenter).await,
        Commands::Resume => client_cmd::handle_resume(&presenter).await,
        Commands::Stop(args) => client_cmd::handle_stop(args, &presenter).await,
        Commands::Status { json } => client_cmd::handle_status(json, &presenter).await,
        Commands::IsRecording => client_cmd::handle_is_recording(&presenter).await,
        Commands::RecordingTime => client_cmd::handle_recording_time(&presenter).await,
        Commands::Watch => client_cmd::handle_watch(&mut presenter).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            presenter.error(&e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

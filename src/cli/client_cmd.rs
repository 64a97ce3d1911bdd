//! Client command handlers - talk to the running daemon over IPC

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::domain::recording::CurrentStatus;

use super::args::StopArgs;
use super::ipc::protocol::{
    Event, GenericResponse, Method, RecordingPayload, RecordingTimeResponse, Request,
};
use super::ipc::{create_ipc_client, Connection, IpcClient};
use super::presenter::Presenter;

const NO_DAEMON: &str = "No daemon running. Start with: voice-recorder daemon";

/// `can-record`: prints `true` or `false`
pub async fn handle_can_record(presenter: &Presenter) -> Result<(), String> {
    let answer: GenericResponse = request(Method::CanDeviceVoiceRecord).await?;
    presenter.output(&answer.value.to_string());
    Ok(())
}

/// `start`
pub async fn handle_start(presenter: &Presenter) -> Result<(), String> {
    let _: GenericResponse = request(Method::StartRecording).await?;
    presenter.success("Recording started");
    Ok(())
}

/// `pause`
pub async fn handle_pause(presenter: &Presenter) -> Result<(), String> {
    let answer: GenericResponse = request(Method::PauseRecording).await?;
    if answer.value {
        presenter.success("Recording paused");
    } else {
        presenter.warn("Recorder could not pause");
    }
    Ok(())
}

/// `resume`
pub async fn handle_resume(presenter: &Presenter) -> Result<(), String> {
    let answer: GenericResponse = request(Method::ResumeRecording).await?;
    if answer.value {
        presenter.success("Recording resumed");
    } else {
        presenter.warn("Recorder could not resume");
    }
    Ok(())
}

/// `stop`: saves the audio to `--output`, prints the payload JSON otherwise
pub async fn handle_stop(args: StopArgs, presenter: &Presenter) -> Result<(), String> {
    let payload: RecordingPayload = request(Method::StopRecording).await?;

    if let Some(ref output) = args.output {
        save_recording(&payload, output).await?;
        presenter.success(&format!(
            "Saved {} ({} ms) to {}",
            payload.mime_type,
            payload.ms_duration,
            output.display()
        ));
    }

    if args.json || args.output.is_none() {
        let json = serde_json::to_string(&payload)
            .map_err(|e| format!("Failed to encode recording: {}", e))?;
        presenter.output(&json);
    }
    Ok(())
}

/// `status`
pub async fn handle_status(json: bool, presenter: &Presenter) -> Result<(), String> {
    let status: CurrentStatus = request(Method::GetCurrentStatus).await?;
    if json {
        let json = serde_json::to_string(&status)
            .map_err(|e| format!("Failed to encode status: {}", e))?;
        presenter.output(&json);
    } else {
        presenter.output(&presenter.format_status(&status));
    }
    Ok(())
}

/// `is-recording`: prints `true` only while capturing, not while paused
pub async fn handle_is_recording(presenter: &Presenter) -> Result<(), String> {
    let answer: GenericResponse = request(Method::IsRecording).await?;
    presenter.output(&answer.value.to_string());
    Ok(())
}

/// `recording-time`
pub async fn handle_recording_time(presenter: &Presenter) -> Result<(), String> {
    let answer: RecordingTimeResponse = request(Method::RecordingTime).await?;
    presenter.output(&answer.value.to_string());
    Ok(())
}

/// `watch`: follow progress updates until the stream ends or Ctrl+C
pub async fn handle_watch(presenter: &mut Presenter) -> Result<(), String> {
    let mut conn = connect().await?;
    let ack = conn
        .call(&Request::listen())
        .await
        .map_err(communication_error)?;
    let _: GenericResponse = ack.into_result().map_err(|e| e.to_string())?;

    presenter.start_spinner("Waiting for updates...");
    let result = follow_events(&mut conn, presenter).await;
    presenter.stop_spinner();

    if result.is_ok() {
        presenter.info("Stopped watching");
    }
    result
}

async fn follow_events(conn: &mut Connection, presenter: &Presenter) -> Result<(), String> {
    loop {
        tokio::select! {
            event = conn.receive::<Event>() => match event.map_err(communication_error)? {
                Some(event) => presenter.update_spinner(&presenter.format_update(&event.data)),
                None => return Ok(()),
            },
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}

async fn save_recording(payload: &RecordingPayload, output: &Path) -> Result<(), String> {
    let bytes = payload
        .decode()
        .map_err(|e| format!("Daemon sent invalid audio data: {}", e))?;
    tokio::fs::write(output, bytes)
        .await
        .map_err(|e| format!("Failed to write {}: {}", output.display(), e))
}

/// One request/response exchange on a fresh connection
async fn request<T: DeserializeOwned>(method: Method) -> Result<T, String> {
    let mut conn = connect().await?;
    let response = conn
        .call(&Request::new(method))
        .await
        .map_err(communication_error)?;
    response.into_result().map_err(|e| e.to_string())
}

async fn connect() -> Result<Connection, String> {
    let client = create_ipc_client();
    if !client.is_daemon_running() {
        return Err(NO_DAEMON.to_string());
    }
    client.connect().await.map_err(communication_error)
}

fn communication_error(e: std::io::Error) -> String {
    format!("Failed to communicate with daemon: {}", e)
}

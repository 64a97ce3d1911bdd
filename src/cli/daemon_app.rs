//! Daemon app runner
//!
//! Hosts the session controller for the lifetime of the process and answers
//! IPC requests one at a time.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::application::ports::{
    AudioBackend, DeviceProbe, NotificationIcon, Notifier, StatusObserver,
};
use crate::application::SessionController;
use crate::domain::config::BackendKind;
use crate::domain::recording::{Duration, RecordingStatus, StatusUpdate};
use crate::infrastructure::{create_notifier, CpalBackend, CpalDeviceProbe, FfmpegBackend};

use super::app::{EXIT_ERROR, EXIT_SUCCESS};
use super::ipc::{create_ipc_server, IpcServer};
use super::ipc::protocol::{
    codes, GenericResponse, Method, RecordingPayload, RecordingTimeResponse, Response,
};
use super::pid_file::PidFile;
use super::presenter::Presenter;
use super::signals::{DaemonSignal, DaemonSignalHandler, LISTENER_CAPACITY};

/// Fully resolved daemon settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonOptions {
    pub backend: BackendKind,
    pub tick_interval: Duration,
    pub output_dir: PathBuf,
    pub notify: bool,
    pub ffmpeg_input_format: String,
    pub ffmpeg_input_device: String,
}

/// Forwards progress updates to one listening connection
struct ChannelObserver {
    sender: mpsc::Sender<StatusUpdate>,
}

impl StatusObserver for ChannelObserver {
    fn on_status(&self, update: StatusUpdate) {
        // Never waits on the client; a closed receiver is fine too
        if let Err(mpsc::error::TrySendError::Full(update)) = self.sender.try_send(update) {
            debug!(
                elapsed_seconds = update.elapsed_seconds(),
                "listener lagging, update dropped"
            );
        }
    }
}

/// Run daemon mode
pub async fn run_daemon(options: DaemonOptions) -> ExitCode {
    let presenter = Presenter::new();

    let pid_file = PidFile::new();
    if let Err(e) = pid_file.acquire() {
        presenter.error(&e.to_string());
        return ExitCode::from(EXIT_ERROR);
    }

    // Returns handler + sender for the IPC server
    let (mut signals, signal_tx) = match DaemonSignalHandler::new().await {
        Ok(s) => s,
        Err(e) => {
            presenter.error(&format!("Failed to setup signal handler: {}", e));
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let mut server = create_ipc_server();
    if let Err(e) = server.bind() {
        presenter.error(&format!("Failed to bind IPC endpoint: {}", e));
        return ExitCode::from(EXIT_ERROR);
    }
    let server: Arc<dyn IpcServer> = Arc::from(server);
    let endpoint = server.path();

    let server_task = {
        let server = Arc::clone(&server);
        tokio::spawn(async move {
            if let Err(e) = server.run(signal_tx).await {
                error!(error = %e, "IPC server stopped");
            }
        })
    };

    let notifier = create_notifier(options.notify);

    presenter.daemon_status("Started, waiting for commands...");
    presenter.info(&format!(
        "PID: {} | Backend: {} | Endpoint: {} | SIGINT: exit",
        std::process::id(),
        options.backend,
        endpoint
    ));
    info!(
        backend = %options.backend,
        tick_interval = %options.tick_interval,
        output_dir = %options.output_dir.display(),
        "daemon started"
    );

    let result = match options.backend {
        BackendKind::Cpal => {
            let controller = SessionController::with_tick_interval(
                CpalBackend::new(&options.output_dir),
                CpalDeviceProbe::new(),
                options.tick_interval,
            );
            daemon_loop(&controller, &mut signals, &*notifier, &presenter).await
        }
        BackendKind::Ffmpeg => {
            let controller = SessionController::with_tick_interval(
                FfmpegBackend::new(
                    &options.output_dir,
                    &options.ffmpeg_input_format,
                    &options.ffmpeg_input_device,
                ),
                CpalDeviceProbe::new(),
                options.tick_interval,
            );
            daemon_loop(&controller, &mut signals, &*notifier, &presenter).await
        }
    };

    server_task.abort();
    server.cleanup();
    let _ = pid_file.release();

    if result {
        ExitCode::from(EXIT_SUCCESS)
    } else {
        ExitCode::from(EXIT_ERROR)
    }
}

/// Process queued signals until shutdown. Returns `false` if the queue
/// closed unexpectedly.
pub async fn daemon_loop<B, P>(
    controller: &SessionController<B, P>,
    signals: &mut DaemonSignalHandler,
    notifier: &dyn Notifier,
    presenter: &Presenter,
) -> bool
where
    B: AudioBackend,
    P: DeviceProbe,
{
    // Strong handle for the registered observer; the controller only keeps a weak one
    let mut listener: Option<Arc<ChannelObserver>> = None;

    loop {
        match signals.recv().await {
            Some(DaemonSignal::Command { method, reply }) => {
                debug!(?method, "processing command");
                let response = handle_command(controller, method, notifier, presenter).await;
                if reply.send(response).is_err() {
                    debug!(?method, "client left before the reply");
                }
            }
            Some(DaemonSignal::Subscribe { reply }) => {
                let (sender, updates) = mpsc::channel(LISTENER_CAPACITY);
                let observer = Arc::new(ChannelObserver { sender });
                controller.register_observer(&observer);
                // Dropping the previous observer ends its event stream
                listener = Some(observer);
                if reply.send(updates).is_err() {
                    controller.unregister_observer();
                    listener = None;
                }
                debug!(active = listener.is_some(), "listener registered");
            }
            Some(DaemonSignal::Shutdown) => {
                presenter.info("Processing shutdown");
                controller.teardown().await;
                drop(listener);
                presenter.daemon_status("Shutting down...");
                return true;
            }
            None => return false,
        }
    }
}

async fn handle_command<B, P>(
    controller: &SessionController<B, P>,
    method: Method,
    notifier: &dyn Notifier,
    presenter: &Presenter,
) -> Response
where
    B: AudioBackend,
    P: DeviceProbe,
{
    match method {
        Method::CanDeviceVoiceRecord => Response::ok(GenericResponse::new(controller.can_record())),
        Method::StartRecording => match controller.start().await {
            Ok(()) => {
                presenter.daemon_status(&format!("Recording ({})...", controller.backend_name()));
                if let Err(e) = notifier
                    .notify(
                        "Recording in Progress",
                        "Recording audio in the background.",
                        NotificationIcon::Recording,
                    )
                    .await
                {
                    warn!(error = %e, "failed to show recording notice");
                }
                Response::ok(GenericResponse::new(true))
            }
            Err(e) => {
                presenter.warn(&format!("Start failed: {}", e));
                e.into()
            }
        },
        Method::PauseRecording => {
            let result = controller.pause().await;
            if let Ok(true) = result {
                presenter.daemon_status("Paused");
            }
            result.map(GenericResponse::new).into()
        }
        Method::ResumeRecording => {
            let result = controller.resume().await;
            if let Ok(true) = result {
                presenter.daemon_status("Recording...");
            }
            result.map(GenericResponse::new).into()
        }
        Method::StopRecording => match controller.stop().await {
            Ok(data) => {
                presenter.daemon_status(&format!(
                    "Idle (last recording: {}, {} ms)",
                    data.human_readable_size(),
                    data.ms_duration()
                ));
                Response::ok(RecordingPayload::from(&data))
            }
            Err(e) => {
                presenter.warn(&format!("Stop failed: {}", e));
                presenter.daemon_status("Idle");
                e.into()
            }
        },
        Method::GetCurrentStatus => Response::ok(controller.status().await),
        Method::IsRecording => {
            let status = controller.status().await;
            Response::ok(GenericResponse::new(
                status.status == RecordingStatus::Recording,
            ))
        }
        Method::RecordingTime => {
            let status = controller.status().await;
            Response::ok(RecordingTimeResponse::new(status.elapsed_seconds))
        }
        // Served by the connection itself; never queued as a command
        Method::AddListener => Response::error(
            codes::UNKNOWN_METHOD,
            "addListener must be sent as a listen request",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{ActiveRecording, NotificationError, RecorderError};
    use crate::domain::recording::{AudioMimeType, CurrentStatus, OutputArtifact};
    use crate::infrastructure::NoOpNotifier;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;
    use tokio::sync::oneshot;

    struct FileBackend {
        dir: PathBuf,
    }

    struct FileRecording {
        artifact: OutputArtifact,
    }

    #[async_trait]
    impl AudioBackend for FileBackend {
        type Recording = FileRecording;

        fn name(&self) -> &'static str {
            "file"
        }

        async fn open(&self) -> Result<FileRecording, RecorderError> {
            let path = self.dir.join("take.flac");
            Ok(FileRecording {
                artifact: OutputArtifact::new(path, AudioMimeType::Flac),
            })
        }
    }

    #[async_trait]
    impl ActiveRecording for FileRecording {
        fn pause(&mut self) -> Result<bool, RecorderError> {
            Ok(true)
        }

        fn resume(&mut self) -> Result<bool, RecorderError> {
            Ok(true)
        }

        async fn stop(&mut self) -> Result<(), RecorderError> {
            std::fs::write(self.artifact.path(), b"fLaC")
                .map_err(|e| RecorderError::WriteFailed(e.to_string()))?;
            self.artifact = self.artifact.clone().with_duration(2000);
            Ok(())
        }

        fn output_artifact(&self) -> OutputArtifact {
            self.artifact.clone()
        }

        async fn delete_output_artifact(&mut self) -> Result<(), RecorderError> {
            let _ = std::fs::remove_file(self.artifact.path());
            Ok(())
        }
    }

    struct Probe;

    impl DeviceProbe for Probe {
        fn can_record(&self) -> bool {
            true
        }

        fn is_microphone_busy(&self) -> bool {
            false
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        titles: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(
            &self,
            title: &str,
            _message: &str,
            _icon: NotificationIcon,
        ) -> Result<(), NotificationError> {
            self.titles.lock().unwrap().push(title.to_string());
            Ok(())
        }
    }

    fn controller(dir: &Path) -> SessionController<FileBackend, Probe> {
        SessionController::new(
            FileBackend {
                dir: dir.to_path_buf(),
            },
            Probe,
        )
    }

    async fn call(tx: &mpsc::Sender<DaemonSignal>, method: Method) -> Response {
        let (reply, response) = oneshot::channel();
        tx.send(DaemonSignal::Command { method, reply }).await.unwrap();
        response.await.unwrap()
    }

    #[tokio::test]
    async fn full_session_over_the_queue() {
        let dir = TempDir::new().unwrap();
        let controller = controller(dir.path());
        let (mut signals, tx) = DaemonSignalHandler::detached();
        let notifier = RecordingNotifier::default();
        let presenter = Presenter::new();

        let client = async {
            let started: GenericResponse =
                call(&tx, Method::StartRecording).await.into_result().unwrap();
            assert!(started.value);

            let again = call(&tx, Method::StartRecording).await;
            assert_eq!(again.error.unwrap().code, "ALREADY_RECORDING");

            let recording: GenericResponse =
                call(&tx, Method::IsRecording).await.into_result().unwrap();
            assert!(recording.value);

            let paused: GenericResponse =
                call(&tx, Method::PauseRecording).await.into_result().unwrap();
            assert!(paused.value);

            let recording: GenericResponse =
                call(&tx, Method::IsRecording).await.into_result().unwrap();
            assert!(!recording.value);

            let status: CurrentStatus =
                call(&tx, Method::GetCurrentStatus).await.into_result().unwrap();
            assert_eq!(status.status, RecordingStatus::Paused);

            let time: RecordingTimeResponse =
                call(&tx, Method::RecordingTime).await.into_result().unwrap();
            assert_eq!(time.value, status.elapsed_seconds);

            let payload: RecordingPayload =
                call(&tx, Method::StopRecording).await.into_result().unwrap();
            assert_eq!(payload.decode().unwrap(), b"fLaC");

            let recording: GenericResponse =
                call(&tx, Method::IsRecording).await.into_result().unwrap();
            assert!(!recording.value);
            let time: RecordingTimeResponse =
                call(&tx, Method::RecordingTime).await.into_result().unwrap();
            assert_eq!(time.value, 0);
            assert_eq!(payload.ms_duration, 2000);
            assert_eq!(payload.mime_type, "audio/flac");

            tx.send(DaemonSignal::Shutdown).await.unwrap();
        };

        let (clean, ()) = tokio::join!(
            daemon_loop(&controller, &mut signals, &notifier, &presenter),
            client
        );
        assert!(clean);
        assert_eq!(
            notifier.titles.lock().unwrap().as_slice(),
            ["Recording in Progress"]
        );
        assert!(!dir.path().join("take.flac").exists());
    }

    #[tokio::test]
    async fn control_without_session_reports_code() {
        let dir = TempDir::new().unwrap();
        let controller = controller(dir.path());
        let (mut signals, tx) = DaemonSignalHandler::detached();
        let presenter = Presenter::new();

        let client = async {
            let response = call(&tx, Method::StopRecording).await;
            assert_eq!(response.error.unwrap().code, "RECORDING_HAS_NOT_STARTED");

            let can: GenericResponse = call(&tx, Method::CanDeviceVoiceRecord)
                .await
                .into_result()
                .unwrap();
            assert!(can.value);
            drop(tx);
        };

        let (clean, ()) = tokio::join!(
            daemon_loop(&controller, &mut signals, &NoOpNotifier, &presenter),
            client
        );
        assert!(!clean);
    }

    #[tokio::test]
    async fn newer_listener_replaces_older() {
        let dir = TempDir::new().unwrap();
        let controller = controller(dir.path());
        let (mut signals, tx) = DaemonSignalHandler::detached();
        let presenter = Presenter::new();

        let client = async {
            let (reply, first) = oneshot::channel();
            tx.send(DaemonSignal::Subscribe { reply }).await.unwrap();
            let mut first = first.await.unwrap();

            let (reply, second) = oneshot::channel();
            tx.send(DaemonSignal::Subscribe { reply }).await.unwrap();
            let mut second = second.await.unwrap();

            // Old stream ends once its observer is dropped
            assert!(first.recv().await.is_none());

            call(&tx, Method::StartRecording).await;
            call(&tx, Method::PauseRecording).await;
            assert_eq!(second.recv().await, Some(StatusUpdate::new(true, 0)));
            assert_eq!(second.recv().await, Some(StatusUpdate::new(false, 0)));

            tx.send(DaemonSignal::Shutdown).await.unwrap();
        };

        let (clean, ()) = tokio::join!(
            daemon_loop(&controller, &mut signals, &NoOpNotifier, &presenter),
            client
        );
        assert!(clean);
    }
    #[tokio::test(start_paused = true)]
    async fn lagging_listener_never_stalls_the_session() {
        let dir = TempDir::new().unwrap();
        let controller = controller(dir.path());
        let (mut signals, tx) = DaemonSignalHandler::detached();
        let presenter = Presenter::new();

        let client = async {
            let (reply, updates) = oneshot::channel();
            tx.send(DaemonSignal::Subscribe { reply }).await.unwrap();
            let updates = updates.await.unwrap();

            // Nobody reads `updates` for a minute of ticks
            call(&tx, Method::StartRecording).await;
            tokio::time::sleep(std::time::Duration::from_millis(60_500)).await;

            let time: RecordingTimeResponse =
                call(&tx, Method::RecordingTime).await.into_result().unwrap();
            assert_eq!(time.value, 60);
            let payload = call(&tx, Method::StopRecording).await;
            assert!(payload.ok);

            tx.send(DaemonSignal::Shutdown).await.unwrap();
            updates
        };

        let (clean, mut updates) = tokio::join!(
            daemon_loop(&controller, &mut signals, &NoOpNotifier, &presenter),
            client
        );
        assert!(clean);

        let mut queued = Vec::new();
        while let Ok(update) = updates.try_recv() {
            queued.push(update);
        }
        assert_eq!(queued.len(), LISTENER_CAPACITY);
        assert_eq!(queued[0], StatusUpdate::new(true, 0));
        assert_eq!(queued[LISTENER_CAPACITY - 1], StatusUpdate::new(true, 15));
    }
}

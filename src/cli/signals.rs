//! Daemon signal queue
//!
//! OS shutdown signals and IPC requests all arrive through one channel, so
//! the daemon loop handles them strictly one at a time.

use tokio::sync::{mpsc, oneshot};
use tracing::info;

use super::ipc::protocol::{Method, Response};
use crate::domain::recording::StatusUpdate;

/// Capacity of the daemon command queue
const QUEUE_CAPACITY: usize = 16;

/// Progress updates buffered per listener before newer ones are dropped
pub const LISTENER_CAPACITY: usize = 16;

/// Messages handled by the daemon loop
#[derive(Debug)]
pub enum DaemonSignal {
    /// A request/response method from a client
    Command {
        method: Method,
        reply: oneshot::Sender<Response>,
    },
    /// A client asked for progress events
    Subscribe {
        reply: oneshot::Sender<mpsc::Receiver<StatusUpdate>>,
    },
    /// Shutdown daemon (SIGINT/SIGTERM)
    Shutdown,
}

/// Daemon signal handler
///
/// Listens for OS shutdown signals and hands out a sender for other sources
/// (the IPC server) to queue requests for the daemon loop.
pub struct DaemonSignalHandler {
    receiver: mpsc::Receiver<DaemonSignal>,
}

impl DaemonSignalHandler {
    /// Create the handler and start listening for shutdown signals
    pub async fn new() -> Result<(Self, mpsc::Sender<DaemonSignal>), std::io::Error> {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        spawn_shutdown_listeners(&tx)?;
        Ok((Self { receiver: rx }, tx))
    }

    /// Handler fed only by the returned sender
    pub fn detached() -> (Self, mpsc::Sender<DaemonSignal>) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        (Self { receiver: rx }, tx)
    }

    /// Wait for the next signal
    pub async fn recv(&mut self) -> Option<DaemonSignal> {
        self.receiver.recv().await
    }
}

#[cfg(unix)]
fn spawn_shutdown_listeners(tx: &mpsc::Sender<DaemonSignal>) -> Result<(), std::io::Error> {
    use tokio::signal::unix::{signal, SignalKind};

    for (kind, name) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
    ] {
        let mut stream = signal(kind)?;
        let tx = tx.clone();
        tokio::spawn(async move {
            stream.recv().await;
            info!(signal = name, "received shutdown signal");
            let _ = tx.send(DaemonSignal::Shutdown).await;
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn spawn_shutdown_listeners(tx: &mpsc::Sender<DaemonSignal>) -> Result<(), std::io::Error> {
    let tx = tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!(signal = "ctrl-c", "received shutdown signal");
            let _ = tx.send(DaemonSignal::Shutdown).await;
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn detached_handler_receives_queued_signals() {
        let (mut handler, tx) = DaemonSignalHandler::detached();

        let (reply, _response) = oneshot::channel();
        tx.send(DaemonSignal::Command {
            method: Method::GetCurrentStatus,
            reply,
        })
        .await
        .unwrap();
        tx.send(DaemonSignal::Shutdown).await.unwrap();

        assert!(matches!(
            handler.recv().await,
            Some(DaemonSignal::Command {
                method: Method::GetCurrentStatus,
                ..
            })
        ));
        assert!(matches!(handler.recv().await, Some(DaemonSignal::Shutdown)));

        drop(tx);
        assert!(handler.recv().await.is_none());
    }
}

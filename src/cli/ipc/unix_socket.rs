//! Unix Domain Socket transport for daemon control
//!
//! Used on Linux and macOS.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{serve_connection, Connection, IpcClient, IpcServer};
use crate::cli::signals::DaemonSignal;

const SOCKET_NAME: &str = "voice-recorder.sock";

/// Socket path resolver
#[derive(Debug, Clone)]
pub struct SocketPath {
    path: PathBuf,
}

impl SocketPath {
    /// Create socket path, preferring XDG_RUNTIME_DIR
    pub fn new() -> Self {
        let dir = std::env::var_os("XDG_RUNTIME_DIR")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);
        Self::with_path(dir.join(SOCKET_NAME))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Remove socket file if it exists
    pub fn cleanup(&self) -> io::Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

impl Default for SocketPath {
    fn default() -> Self {
        Self::new()
    }
}

/// Unix Domain Socket server for daemon requests
pub struct UnixSocketServer {
    socket_path: SocketPath,
    listener: Option<UnixListener>,
}

impl UnixSocketServer {
    pub fn new(socket_path: SocketPath) -> Self {
        Self {
            socket_path,
            listener: None,
        }
    }
}

impl Drop for UnixSocketServer {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[async_trait]
impl IpcServer for UnixSocketServer {
    fn bind(&mut self) -> io::Result<()> {
        // A stale socket from a crashed daemon blocks bind
        self.socket_path.cleanup()?;

        let listener = UnixListener::bind(self.socket_path.path())?;
        self.listener = Some(listener);
        Ok(())
    }

    fn path(&self) -> String {
        self.socket_path.path().to_string_lossy().to_string()
    }

    async fn run(&self, tx: mpsc::Sender<DaemonSignal>) -> io::Result<()> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "Socket not bound"))?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let (reader, writer) = stream.into_split();
                        if let Err(e) = serve_connection(Connection::new(reader, writer), tx).await
                        {
                            debug!(error = %e, "socket connection closed with error");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "socket accept failed"),
            }
        }
    }

    fn cleanup(&self) {
        let _ = self.socket_path.cleanup();
    }
}

/// Unix Domain Socket client
pub struct UnixSocketClient {
    socket_path: SocketPath,
}

impl UnixSocketClient {
    pub fn new(socket_path: SocketPath) -> Self {
        Self { socket_path }
    }
}

#[async_trait]
impl IpcClient for UnixSocketClient {
    fn is_daemon_running(&self) -> bool {
        self.socket_path.exists()
    }

    async fn connect(&self) -> io::Result<Connection> {
        let stream = UnixStream::connect(self.socket_path.path()).await?;
        let (reader, writer) = stream.into_split();
        Ok(Connection::new(reader, writer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ipc::protocol::{Method, Request, Response};
    use tempfile::TempDir;

    #[test]
    fn socket_name_is_namespaced() {
        let socket_path = SocketPath::new();
        assert!(socket_path.path().ends_with(SOCKET_NAME));
    }

    #[tokio::test]
    async fn client_round_trip_over_socket() {
        let dir = TempDir::new().unwrap();
        let socket_path = SocketPath::with_path(dir.path().join("test.sock"));

        let mut server = UnixSocketServer::new(socket_path.clone());
        server.bind().unwrap();

        let (tx, mut rx) = mpsc::channel(4);
        tokio::spawn(async move {
            let _ = server.run(tx).await;
        });
        tokio::spawn(async move {
            while let Some(signal) = rx.recv().await {
                if let DaemonSignal::Command { reply, .. } = signal {
                    let _ = reply.send(Response::ok(true));
                }
            }
        });

        let client = UnixSocketClient::new(socket_path);
        assert!(client.is_daemon_running());

        let mut conn = client.connect().await.unwrap();
        let response = conn.call(&Request::new(Method::PauseRecording)).await.unwrap();
        assert!(response.into_result::<bool>().unwrap());
    }

    #[test]
    fn missing_socket_means_no_daemon() {
        let dir = TempDir::new().unwrap();
        let client = UnixSocketClient::new(SocketPath::with_path(dir.path().join("none.sock")));
        assert!(!client.is_daemon_running());
    }
}

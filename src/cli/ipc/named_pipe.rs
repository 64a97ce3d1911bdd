//! Named Pipe transport for daemon control on Windows

use std::io;

use async_trait::async_trait;
use tokio::net::windows::named_pipe::{ClientOptions, ServerOptions};
use tokio::sync::mpsc;
use tracing::debug;

use super::{serve_connection, Connection, IpcClient, IpcServer};
use crate::cli::signals::DaemonSignal;

/// Per-machine pipe name
const PIPE_NAME: &str = r"\\.\pipe\voice-recorder";

/// Named pipe path resolver
#[derive(Debug, Clone)]
pub struct PipePath {
    path: String,
}

impl PipePath {
    /// Default daemon pipe
    pub fn new() -> Self {
        Self {
            path: PIPE_NAME.to_string(),
        }
    }

    /// Full pipe name
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Check if the named pipe exists
    pub fn exists(&self) -> bool {
        std::fs::metadata(&self.path).is_ok()
    }
}

impl Default for PipePath {
    fn default() -> Self {
        Self::new()
    }
}

/// Named Pipe server for daemon requests
pub struct NamedPipeServer {
    pipe_path: PipePath,
    bound: bool,
}

impl NamedPipeServer {
    /// Server for `pipe_path`; nothing is created until `run`
    pub fn new(pipe_path: PipePath) -> Self {
        Self {
            pipe_path,
            bound: false,
        }
    }
}

#[async_trait]
impl IpcServer for NamedPipeServer {
    fn bind(&mut self) -> io::Result<()> {
        // Pipe instances are created per connection in run()
        self.bound = true;
        Ok(())
    }

    fn path(&self) -> String {
        self.pipe_path.path().to_string()
    }

    async fn run(&self, tx: mpsc::Sender<DaemonSignal>) -> io::Result<()> {
        if !self.bound {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "Pipe not bound"));
        }

        loop {
            let server = ServerOptions::new()
                .first_pipe_instance(false)
                .create(&self.pipe_path.path)?;
            // Blocks until a client opens this instance
            server.connect().await?;

            let tx = tx.clone();
            tokio::spawn(async move {
                let (reader, writer) = tokio::io::split(server);
                if let Err(e) = serve_connection(Connection::new(reader, writer), tx).await {
                    debug!(error = %e, "pipe connection closed with error");
                }
            });
        }
    }

    fn cleanup(&self) {
        // Pipe instances go away with their handles
    }
}

/// Named Pipe client for talking to the daemon
pub struct NamedPipeClient {
    pipe_path: PipePath,
}

impl NamedPipeClient {
    /// Client for `pipe_path`
    pub fn new(pipe_path: PipePath) -> Self {
        Self { pipe_path }
    }
}

#[async_trait]
impl IpcClient for NamedPipeClient {
    fn is_daemon_running(&self) -> bool {
        self.pipe_path.exists()
    }

    async fn connect(&self) -> io::Result<Connection> {
        let client = ClientOptions::new().open(&self.pipe_path.path)?;
        let (reader, writer) = tokio::io::split(client);
        Ok(Connection::new(reader, writer))
    }
}

//! IPC (Inter-Process Communication) module for daemon control
//!
//! Provides platform-specific transports:
//! - Unix (Linux/macOS): Unix Domain Sockets
//! - Windows: Named Pipes
//!
//! Both carry the same JSON-lines protocol, handled here.

#[cfg(windows)]
mod named_pipe;
pub mod protocol;
#[cfg(unix)]
mod unix_socket;

#[cfg(windows)]
pub use named_pipe::{NamedPipeClient, NamedPipeServer, PipePath};
#[cfg(unix)]
pub use unix_socket::{SocketPath, UnixSocketClient, UnixSocketServer};

use std::io;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use self::protocol::{codes, Event, GenericResponse, Method, Request, Response};
use super::signals::DaemonSignal;

/// Line-oriented JSON connection over any byte stream
pub struct Connection {
    reader: BufReader<Box<dyn AsyncRead + Send + Unpin>>,
    writer: Box<dyn AsyncWrite + Send + Unpin>,
}

impl Connection {
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: BufReader::new(Box::new(reader)),
            writer: Box::new(writer),
        }
    }

    /// Write one message as a JSON line
    pub async fn send<T: Serialize>(&mut self, message: &T) -> io::Result<()> {
        let mut line = serde_json::to_string(message)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await
    }

    /// Read the next non-empty line; `None` at end of stream
    pub async fn receive_line(&mut self) -> io::Result<Option<String>> {
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line).await? == 0 {
                return Ok(None);
            }
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_string()));
            }
        }
    }

    /// Read and decode the next message; `None` at end of stream
    pub async fn receive<T: DeserializeOwned>(&mut self) -> io::Result<Option<T>> {
        match self.receive_line().await? {
            Some(line) => serde_json::from_str(&line)
                .map(Some)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            None => Ok(None),
        }
    }

    /// Wait for end of stream, discarding whatever the peer sends meanwhile.
    ///
    /// Cancel safe: dropping the future never splits a pending line.
    pub async fn closed(&mut self) -> io::Result<()> {
        loop {
            let pending = self.reader.fill_buf().await?.len();
            if pending == 0 {
                return Ok(());
            }
            self.reader.consume(pending);
        }
    }

    /// Send a request and wait for its response
    pub async fn call(&mut self, request: &Request) -> io::Result<Response> {
        self.send(request).await?;
        self.receive().await?.ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "Daemon closed the connection")
        })
    }
}

/// Trait for IPC servers that listen for daemon commands
#[async_trait::async_trait]
pub trait IpcServer: Send + Sync {
    /// Bind to the IPC endpoint
    fn bind(&mut self) -> io::Result<()>;

    /// Get the path/name of the IPC endpoint
    fn path(&self) -> String;

    /// Accept connections and forward their requests to the daemon loop
    async fn run(&self, tx: mpsc::Sender<DaemonSignal>) -> io::Result<()>;

    /// Cleanup IPC resources
    fn cleanup(&self);
}

/// Trait for IPC clients that talk to the daemon
#[async_trait::async_trait]
pub trait IpcClient: Send + Sync {
    /// Check if daemon appears to be running (endpoint exists)
    fn is_daemon_running(&self) -> bool;

    /// Open a connection to the daemon
    async fn connect(&self) -> io::Result<Connection>;
}

/// Serve one client connection until it disconnects.
///
/// Requests are answered in order. `addListener` turns the connection into
/// an event stream for the rest of its life.
pub async fn serve_connection(
    mut conn: Connection,
    tx: mpsc::Sender<DaemonSignal>,
) -> io::Result<()> {
    while let Some(line) = conn.receive_line().await? {
        let request = match Request::parse(&line) {
            Ok(request) => request,
            Err(response) => {
                conn.send(&response).await?;
                continue;
            }
        };
        debug!(method = ?request.method, "request");

        if request.method == Method::AddListener {
            return stream_events(conn, &tx).await;
        }

        let response = dispatch(&tx, request.method).await;
        conn.send(&response).await?;
    }
    Ok(())
}

async fn dispatch(tx: &mpsc::Sender<DaemonSignal>, method: Method) -> Response {
    let (reply, response) = oneshot::channel();
    if tx.send(DaemonSignal::Command { method, reply }).await.is_err() {
        return unavailable();
    }
    response.await.unwrap_or_else(|_| unavailable())
}

async fn stream_events(mut conn: Connection, tx: &mpsc::Sender<DaemonSignal>) -> io::Result<()> {
    let (reply, subscription) = oneshot::channel();
    if tx.send(DaemonSignal::Subscribe { reply }).await.is_err() {
        return conn.send(&unavailable()).await;
    }
    let Ok(mut updates) = subscription.await else {
        return conn.send(&unavailable()).await;
    };

    conn.send(&Response::ok(GenericResponse::new(true))).await?;

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(update) => conn.send(&Event::recording_update(update)).await?,
                // Replaced by a newer listener
                None => return Ok(()),
            },
            closed = conn.closed() => return closed,
        }
    }
}

fn unavailable() -> Response {
    Response::error(codes::DAEMON_UNAVAILABLE, "Daemon is shutting down")
}

/// Create the appropriate IPC server for the current platform
#[cfg(unix)]
pub fn create_ipc_server() -> Box<dyn IpcServer> {
    Box::new(UnixSocketServer::new(SocketPath::new()))
}

#[cfg(windows)]
pub fn create_ipc_server() -> Box<dyn IpcServer> {
    Box::new(NamedPipeServer::new(PipePath::new()))
}

/// Create the appropriate IPC client for the current platform
#[cfg(unix)]
pub fn create_ipc_client() -> Box<dyn IpcClient> {
    Box::new(UnixSocketClient::new(SocketPath::new()))
}

#[cfg(windows)]
pub fn create_ipc_client() -> Box<dyn IpcClient> {
    Box::new(NamedPipeClient::new(PipePath::new()))
}

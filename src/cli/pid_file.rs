//! PID file management for daemon mode

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use tracing::debug;

/// File name inside the runtime dir
const PID_FILE_NAME: &str = "voice-recorder.pid";

/// PID file guarding a single daemon per user
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// PID file in XDG_RUNTIME_DIR, falling back to the temp dir
    pub fn new() -> Self {
        let dir = std::env::var_os("XDG_RUNTIME_DIR")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);
        Self::with_path(dir.join(PID_FILE_NAME))
    }

    /// PID file at a custom location
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the PID file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// PID of the live daemon recorded in the file, if any.
    /// A stale file is removed.
    pub fn is_running(&self) -> Option<u32> {
        // Unreadable or garbage contents count as no daemon
        let contents = fs::read_to_string(&self.path).ok()?;
        let pid: u32 = contents.trim().parse().ok()?;

        if pid == process::id() || process_alive(pid) {
            Some(pid)
        } else {
            debug!(pid, path = %self.path.display(), "removing stale PID file");
            let _ = fs::remove_file(&self.path);
            None
        }
    }

    /// Acquire the PID file (fails if another daemon is running)
    pub fn acquire(&self) -> Result<(), PidFileError> {
        if let Some(pid) = self.is_running() {
            return Err(PidFileError::AlreadyRunning(pid));
        }

        let mut file = File::create(&self.path).map_err(|e| {
            PidFileError::WriteFailed(format!("Failed to create PID file: {}", e))
        })?;
        // Record our PID
        write!(file, "{}", process::id())
            .map_err(|e| PidFileError::WriteFailed(format!("Failed to write PID: {}", e)))
    }

    /// Release the PID file if it is ours
    pub fn release(&self) -> Result<(), PidFileError> {
        let ours = fs::read_to_string(&self.path)
            .ok()
            .and_then(|c| c.trim().parse::<u32>().ok())
            .is_some_and(|pid| pid == process::id());

        if ours {
            fs::remove_file(&self.path).map_err(|e| {
                PidFileError::RemoveFailed(format!("Failed to remove PID file: {}", e))
            })?;
        }
        Ok(())
    }
}

impl Default for PidFile {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        // Best effort
        let _ = self.release();
    }
}

/// Signal 0 probes for existence without touching the process
#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        // Exists but owned by someone else
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(windows)]
fn process_alive(pid: u32) -> bool {
    use windows_sys::Win32::Foundation::{CloseHandle, STILL_ACTIVE};
    use windows_sys::Win32::System::Threading::{
        GetExitCodeProcess, OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION,
    };

    // SAFETY: the handle is checked for null and closed before returning.
    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
        if handle.is_null() {
            return false;
        }
        let mut exit_code = 0u32;
        let queried = GetExitCodeProcess(handle, &mut exit_code) != 0;
        CloseHandle(handle);
        queried && exit_code == STILL_ACTIVE as u32
    }
}

/// PID file errors
#[derive(Debug, thiserror::Error)]
pub enum PidFileError {
    #[error("Another daemon is already running (PID: {0})")]
    AlreadyRunning(u32),

    #[error("Failed to write PID file: {0}")]
    WriteFailed(String),

    #[error("Failed to remove PID file: {0}")]
    RemoveFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_path_is_namespaced() {
        assert!(PidFile::new().path().ends_with(PID_FILE_NAME));
    }

    #[test]
    fn missing_file_is_not_running() {
        let dir = TempDir::new().unwrap();
        let pid_file = PidFile::with_path(dir.path().join("none.pid"));
        assert!(pid_file.is_running().is_none());
    }

    #[test]
    fn acquire_then_release() {
        let dir = TempDir::new().unwrap();
        let pid_file = PidFile::with_path(dir.path().join("daemon.pid"));

        pid_file.acquire().unwrap();
        assert_eq!(pid_file.is_running(), Some(process::id()));

        pid_file.release().unwrap();
        assert!(!pid_file.path().exists());
    }

    #[test]
    fn garbage_pid_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("daemon.pid");
        fs::write(&path, "not a pid").unwrap();

        let pid_file = PidFile::with_path(&path);
        assert!(pid_file.is_running().is_none());
        pid_file.acquire().unwrap();
    }

    #[test]
    fn release_leaves_foreign_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("daemon.pid");
        fs::write(&path, "1").unwrap();

        PidFile::with_path(&path).release().unwrap();
        assert!(path.exists());
    }
}

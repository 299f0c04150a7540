//! PTY Service
//! Owns the one shell shared by every client, bound to the current workspace root.
//!
//! Lifecycle: `Uninitialized -> Running -> (Terminating -> Running)*`. A root change
//! detaches the old output pump, kills the old shell and only then attaches the new
//! one, so no client ever sees output from a shell bound to a stale root.

use crate::error::{Result, WorkspaceError};
use crate::gateway::Broadcaster;
use crate::models::{ServerEvent, TerminalSize};
use parking_lot::Mutex;
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
#[cfg(not(unix))]
use portable_pty::ChildKiller;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

pub const MIN_TERMINAL_DIMENSION: u16 = 2;
pub const MAX_TERMINAL_DIMENSION: u16 = 500;

/// Control side of a running shell process
pub trait ShellHandle: Send {
    fn resize(&self, size: TerminalSize) -> Result<()>;

    /// Kill the process and reap it
    fn terminate(&mut self);

    fn process_id(&self) -> Option<u32>;
}

/// A freshly spawned shell: its output, its input and its handle
pub struct SpawnedShell {
    pub reader: Box<dyn Read + Send>,
    pub writer: Box<dyn Write + Send>,
    pub handle: Box<dyn ShellHandle>,
}

/// Starts shell processes
pub trait ShellLauncher: Send + Sync {
    fn launch(&self, cwd: &Path, size: TerminalSize) -> Result<SpawnedShell>;
}

/// Launches the configured shell inside a native pseudo-terminal
pub struct PtyLauncher {
    shell: String,
}

impl PtyLauncher {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    /// `$SHELL`, falling back to the platform default
    pub fn default_shell() -> String {
        if cfg!(windows) {
            "powershell.exe".to_string()
        } else {
            std::env::var("SHELL").unwrap_or_else(|_| "/bin/bash".to_string())
        }
    }
}

fn pty_size(size: TerminalSize) -> PtySize {
    PtySize {
        rows: size.rows,
        cols: size.cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}

impl ShellLauncher for PtyLauncher {
    fn launch(&self, cwd: &Path, size: TerminalSize) -> Result<SpawnedShell> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(pty_size(size))
            .map_err(|e| WorkspaceError::Terminal(format!("Failed to open PTY: {}", e)))?;

        let mut cmd = CommandBuilder::new(&self.shell);
        cmd.cwd(cwd);

        // Set environment variables for proper terminal
        cmd.env("TERM", "xterm-256color");
        cmd.env("COLORTERM", "truecolor");

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| WorkspaceError::Terminal(format!("Failed to spawn shell: {}", e)))?;
        // Keep no slave end open here, or the reader never sees EOF when the shell exits
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| WorkspaceError::Terminal(format!("Failed to get PTY reader: {}", e)))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| WorkspaceError::Terminal(format!("Failed to get PTY writer: {}", e)))?;

        Ok(SpawnedShell {
            reader,
            writer,
            handle: Box::new(PtyHandle {
                master: pair.master,
                child,
            }),
        })
    }
}

struct PtyHandle {
    master: Box<dyn MasterPty + Send>,
    child: Box<dyn Child + Send + Sync>,
}

impl ShellHandle for PtyHandle {
    fn resize(&self, size: TerminalSize) -> Result<()> {
        self.master
            .resize(pty_size(size))
            .map_err(|e| WorkspaceError::Terminal(format!("Failed to resize PTY: {}", e)))
    }

    fn terminate(&mut self) {
        // Kill the whole process group (shell plus anything it started)
        #[cfg(unix)]
        {
            if let Some(pid) = self.child.process_id() {
                unsafe {
                    libc::kill(-(pid as i32), libc::SIGTERM);
                }
                thread::sleep(std::time::Duration::from_millis(100));
                unsafe {
                    libc::kill(-(pid as i32), libc::SIGKILL);
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = self.child.kill();
        }

        // Wait for child to prevent zombies
        let _ = self.child.wait();
    }

    fn process_id(&self) -> Option<u32> {
        self.child.process_id()
    }
}

/// Observable session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalStatus {
    Uninitialized,
    Running { root: PathBuf, pid: Option<u32> },
}

type ShellWriter = Arc<Mutex<Box<dyn Write + Send>>>;

struct LiveShell {
    handle: Box<dyn ShellHandle>,
    /// Locked on its own so a stalled write never holds up a restart
    writer: ShellWriter,
    bound_root: PathBuf,
    /// Cleared on teardown. The pump checks it under this lock while broadcasting,
    /// so once teardown holds the lock the old shell can no longer reach clients.
    attached: Arc<Mutex<bool>>,
}

struct SessionState {
    live: Option<LiveShell>,
    size: TerminalSize,
}

/// The shared terminal
pub struct TerminalSession {
    launcher: Arc<dyn ShellLauncher>,
    gateway: Arc<dyn Broadcaster>,
    state: Mutex<SessionState>,
}

impl TerminalSession {
    pub fn new(
        launcher: Arc<dyn ShellLauncher>,
        gateway: Arc<dyn Broadcaster>,
        size: TerminalSize,
    ) -> Self {
        Self {
            launcher,
            gateway,
            state: Mutex::new(SessionState { live: None, size }),
        }
    }

    pub fn status(&self) -> TerminalStatus {
        match &self.state.lock().live {
            Some(live) => TerminalStatus::Running {
                root: live.bound_root.clone(),
                pid: live.handle.process_id(),
            },
            None => TerminalStatus::Uninitialized,
        }
    }

    /// Start a shell in `root` unless one is already running
    pub fn ensure_started(&self, root: &Path) -> Result<()> {
        let mut state = self.state.lock();
        if state.live.is_some() {
            return Ok(());
        }
        let live = self.spawn(root, state.size)?;
        state.live = Some(live);
        Ok(())
    }

    /// Replace the running shell with a new one bound to `root`
    pub fn restart(&self, root: &Path) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(old) = state.live.take() {
            log::info!(
                "Terminating shell bound to {} before restart",
                old.bound_root.display()
            );
            Self::teardown(old);
        }
        let live = self.spawn(root, state.size)?;
        state.live = Some(live);
        Ok(())
    }

    /// Write client input to the live shell (user input)
    pub fn write(&self, data: &[u8]) -> Result<()> {
        let writer = match &self.state.lock().live {
            Some(live) => live.writer.clone(),
            None => return Err(WorkspaceError::Terminal("No PTY session active".to_string())),
        };

        let mut writer = writer.lock();
        writer
            .write_all(data)
            .map_err(|e| WorkspaceError::Terminal(format!("Failed to write to PTY: {}", e)))?;
        writer
            .flush()
            .map_err(|e| WorkspaceError::Terminal(format!("Failed to flush PTY: {}", e)))?;
        Ok(())
    }

    /// Resize the live shell; the size is kept for later restarts
    pub fn resize(&self, size: TerminalSize) -> Result<()> {
        let size = normalize_terminal_size(size);
        let mut state = self.state.lock();
        state.size = size;
        match &state.live {
            Some(live) => live.handle.resize(size),
            None => Ok(()),
        }
    }

    /// Terminate the shell, e.g. on service exit
    pub fn shutdown(&self) {
        if let Some(live) = self.state.lock().live.take() {
            Self::teardown(live);
        }
    }

    fn teardown(mut live: LiveShell) {
        // Detach first so nothing the dying shell prints reaches clients
        *live.attached.lock() = false;
        // Killing the process also fails any write still pending on the old writer
        live.handle.terminate();
    }

    fn spawn(&self, root: &Path, size: TerminalSize) -> Result<LiveShell> {
        let shell = self.launcher.launch(root, size)?;
        let attached = Arc::new(Mutex::new(true));

        let pump_attached = attached.clone();
        let gateway = self.gateway.clone();
        let reader = shell.reader;
        thread::Builder::new()
            .name("terminal-output".to_string())
            .spawn(move || pump_output(reader, pump_attached, gateway))
            .map_err(|e| WorkspaceError::Terminal(format!("Failed to start output thread: {}", e)))?;

        log::info!(
            "Shell started in {} (pid {:?})",
            root.display(),
            shell.handle.process_id()
        );

        Ok(LiveShell {
            handle: shell.handle,
            writer: Arc::new(Mutex::new(shell.writer)),
            bound_root: root.to_path_buf(),
            attached,
        })
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Clamp both dimensions into the range a PTY accepts
pub fn normalize_terminal_size(size: TerminalSize) -> TerminalSize {
    TerminalSize {
        cols: size.cols.clamp(MIN_TERMINAL_DIMENSION, MAX_TERMINAL_DIMENSION),
        rows: size.rows.clamp(MIN_TERMINAL_DIMENSION, MAX_TERMINAL_DIMENSION),
    }
}

/// Read shell output and mirror it to every client until EOF or detach
fn pump_output(
    mut reader: Box<dyn Read + Send>,
    attached: Arc<Mutex<bool>>,
    gateway: Arc<dyn Broadcaster>,
) {
    let mut buf = [0u8; 8192];
    let mut decoder = Utf8Decoder::default();

    loop {
        match reader.read(&mut buf) {
            Ok(0) => break, // EOF
            Ok(n) => {
                let text = decoder.push(&buf[..n]);
                let attached = attached.lock();
                if !*attached {
                    return;
                }
                if !text.is_empty() {
                    gateway.broadcast(ServerEvent::TerminalOutput(text));
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }

    if *attached.lock() {
        // No respawn: the terminal stays silent until the next root change
        log::info!("Shell exited on its own; terminal output stopped");
    }
}

/// Turns a byte stream into text without splitting multi-byte characters across chunks
#[derive(Default)]
pub(crate) struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub(crate) fn push(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                        // incomplete sequence at the end; wait for the next chunk
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }

        out
    }
}

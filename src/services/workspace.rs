//! Workspace session
//! The one object owning the root, the shared terminal and the path to clients.
//! Every client event ends up in one of these methods.

use crate::error::{Result, WorkspaceError};
use crate::gateway::Broadcaster;
use crate::models::{ClientId, FileNode, ServerEvent, TerminalSize};
use crate::services::mutations::{Mutation, MutationCoordinator};
use crate::services::pty::{ShellLauncher, TerminalSession, TerminalStatus};
use crate::services::root::WorkspaceRoot;
use crate::services::tree::TreeBuilder;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct Workspace {
    root: WorkspaceRoot,
    terminal: TerminalSession,
    gateway: Arc<dyn Broadcaster>,
    /// Serializes whole root changes: commit, terminal restart, broadcast
    root_change: Mutex<()>,
}

impl Workspace {
    pub fn new(
        initial_root: impl AsRef<Path>,
        launcher: Arc<dyn ShellLauncher>,
        gateway: Arc<dyn Broadcaster>,
        terminal_size: TerminalSize,
    ) -> Result<Self> {
        let root = WorkspaceRoot::new(initial_root)?;
        log::info!("Workspace root: {}", root.current().display());
        Ok(Self {
            root,
            terminal: TerminalSession::new(launcher, gateway.clone(), terminal_size),
            gateway,
            root_change: Mutex::new(()),
        })
    }

    pub fn root(&self) -> PathBuf {
        self.root.current()
    }

    pub fn terminal_status(&self) -> TerminalStatus {
        self.terminal.status()
    }

    /// Current tree below the root
    pub fn tree(&self) -> Result<Vec<FileNode>> {
        let root = self.root.current();
        TreeBuilder::new(&root).build(&root)
    }

    /// Eagerly start the shell in the current root
    pub fn start_terminal(&self) -> Result<()> {
        self.terminal.ensure_started(&self.root.current())
    }

    /// `get-files`: the tree, to the requester only
    pub fn list_files(&self, client: ClientId) {
        match self.tree() {
            Ok(tree) => self.gateway.send_to(client, ServerEvent::FileList(tree)),
            Err(e) => self.report(client, e),
        }
    }

    /// `read-file`
    pub fn read_file(&self, client: ClientId, path: &str) {
        let content = self
            .root
            .resolve_entry(path)
            .and_then(|full| fs::read_to_string(&full).map_err(|e| WorkspaceError::io(full, e)));

        match content {
            Ok(content) => self.gateway.send_to(
                client,
                ServerEvent::FileContent {
                    path: path.to_string(),
                    content,
                },
            ),
            Err(e) => self.report(client, e),
        }
    }

    /// `set-project-path`: validate, commit, restart the shell, broadcast the new tree.
    /// On a bad path nothing changes and only the requester hears about it.
    pub fn set_project_path(&self, client: ClientId, candidate: &str) {
        let _guard = self.root_change.lock();

        let validated = match WorkspaceRoot::validate(Path::new(candidate)) {
            Ok(path) => path,
            Err(e) => {
                log::warn!("{client} asked for an invalid root {candidate:?}");
                self.gateway.send_to(client, ServerEvent::error(e.to_string()));
                return;
            }
        };

        let previous = self.root.commit(validated.clone());
        log::info!(
            "Workspace root changed: {} -> {}",
            previous.display(),
            validated.display()
        );

        if let Err(e) = self.terminal.restart(&validated) {
            log::error!("Terminal restart in {} failed: {}", validated.display(), e);
            self.gateway.send_to(client, ServerEvent::error(e.to_string()));
        }

        match TreeBuilder::new(&validated).build(&validated) {
            Ok(tree) => self.gateway.broadcast(ServerEvent::FileList(tree)),
            Err(e) => self.report(client, e),
        }
    }

    /// create/delete/rename/save
    pub fn mutate(&self, client: ClientId, mutation: Mutation) {
        MutationCoordinator::new(&self.root, self.gateway.as_ref()).submit(client, mutation);
    }

    /// Raw input from any client into the shared shell
    pub fn terminal_input(&self, data: &[u8]) -> Result<()> {
        // Lazy start covers a failed eager start
        self.terminal.ensure_started(&self.root.current())?;
        self.terminal.write(data)
    }

    pub fn terminal_resize(&self, size: TerminalSize) -> Result<()> {
        self.terminal.resize(size)
    }

    pub fn shutdown(&self) {
        log::info!("Shutting down workspace - terminating shell");
        self.terminal.shutdown();
    }

    fn report(&self, client: ClientId, error: WorkspaceError) {
        log::warn!("{client}: {error}");
        self.gateway.send_to(client, ServerEvent::error(error.to_string()));
    }
}

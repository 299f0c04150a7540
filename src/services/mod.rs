//! Services module
//! Business logic for the workspace: tree building, root management,
//! file mutations and the shared terminal

pub mod mutations;
pub mod pty;
pub mod root;
pub mod tree;
pub mod workspace;

pub use mutations::{Mutation, MutationCoordinator};
pub use pty::{
    PtyLauncher, ShellHandle, ShellLauncher, SpawnedShell, TerminalSession, TerminalStatus,
};
pub use root::WorkspaceRoot;
pub use tree::TreeBuilder;
pub use workspace::Workspace;

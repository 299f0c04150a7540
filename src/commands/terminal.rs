//! Terminal commands
//! Input and resize for the shared shell

use crate::models::{ClientId, TerminalSize};
use crate::services::Workspace;

/// `terminal-input`: bytes from any client go straight to the one shell
pub fn terminal_input(workspace: &Workspace, client: ClientId, data: &[u8]) {
    if let Err(e) = workspace.terminal_input(data) {
        log::warn!("{client} terminal input dropped: {e}");
    }
}

/// `terminal-resize`
pub fn terminal_resize(workspace: &Workspace, client: ClientId, size: TerminalSize) {
    if let Err(e) = workspace.terminal_resize(size) {
        log::warn!("{client} terminal resize to {}x{} failed: {e}", size.cols, size.rows);
    }
}

/// `run-code`: accepted, but execution lives outside this service
pub fn run_code(client: ClientId, code: &str) {
    log::info!("{client} submitted {} bytes of code; execution is not handled here", code.len());
}

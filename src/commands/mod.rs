//! Commands module
//! Handlers for every client event. Commands are the boundary between the
//! transport and the workspace services: they unpack payloads and call in.

pub mod files;
pub mod project;
pub mod terminal;

use crate::models::{ClientEvent, ClientId};
use crate::services::Workspace;

/// Route one decoded client event to its handler
pub fn dispatch(workspace: &Workspace, client: ClientId, event: ClientEvent) {
    match event {
        ClientEvent::GetFiles => files::get_files(workspace, client),
        ClientEvent::ReadFile(path) => files::read_file(workspace, client, &path),
        ClientEvent::SaveFile(request) => files::save_file(workspace, client, request),
        ClientEvent::CreateFile(request) => files::create_file(workspace, client, request),
        ClientEvent::CreateFolder(request) => files::create_folder(workspace, client, request),
        ClientEvent::DeleteItem(path) => files::delete_item(workspace, client, path),
        ClientEvent::RenameItem(request) => files::rename_item(workspace, client, request),
        ClientEvent::SetProjectPath(path) => project::set_project_path(workspace, client, &path),
        ClientEvent::TerminalInput(data) => {
            terminal::terminal_input(workspace, client, data.as_bytes())
        }
        ClientEvent::TerminalResize(size) => terminal::terminal_resize(workspace, client, size),
        ClientEvent::RunCode(code) => terminal::run_code(client, &code),
    }
}

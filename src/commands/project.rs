use crate::models::ClientId;
use crate::services::Workspace;

/// `set-project-path`
pub fn set_project_path(workspace: &Workspace, client: ClientId, path: &str) {
    log::info!("{client} requested project path {path:?}");
    workspace.set_project_path(client, path);
}

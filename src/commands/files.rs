//! File commands
//! Tree listing, reads and the create/delete/rename/save mutations

use crate::models::{ClientId, CreateItemRequest, RenameItemRequest, SaveFileRequest};
use crate::services::{Mutation, Workspace};

/// `get-files`
pub fn get_files(workspace: &Workspace, client: ClientId) {
    workspace.list_files(client);
}

/// `read-file`
pub fn read_file(workspace: &Workspace, client: ClientId, path: &str) {
    workspace.read_file(client, path);
}

/// `save-file`: acknowledged to the requester only
pub fn save_file(workspace: &Workspace, client: ClientId, request: SaveFileRequest) {
    workspace.mutate(
        client,
        Mutation::SaveFile {
            path: request.path,
            content: request.content,
        },
    );
}

pub fn create_file(workspace: &Workspace, client: ClientId, request: CreateItemRequest) {
    workspace.mutate(
        client,
        Mutation::CreateFile {
            name: request.name,
            parent_path: request.parent_path.unwrap_or_default(),
        },
    );
}

pub fn create_folder(workspace: &Workspace, client: ClientId, request: CreateItemRequest) {
    workspace.mutate(
        client,
        Mutation::CreateFolder {
            name: request.name,
            parent_path: request.parent_path.unwrap_or_default(),
        },
    );
}

pub fn delete_item(workspace: &Workspace, client: ClientId, path: String) {
    workspace.mutate(client, Mutation::DeleteItem { path });
}

pub fn rename_item(workspace: &Workspace, client: ClientId, request: RenameItemRequest) {
    workspace.mutate(
        client,
        Mutation::RenameItem {
            old_path: request.old_path,
            new_name: request.new_name,
        },
    );
}

//! Mutation coordinator
//! Runs file and folder CRUD against the workspace and decides who hears about it:
//! structural changes go to every client as a fresh tree, saves are acknowledged
//! to the requester alone, failures only ever reach the requester.

use crate::error::{Result, WorkspaceError};
use crate::gateway::Broadcaster;
use crate::models::{ClientId, ServerEvent};
use crate::services::root::{normalize_relative, WorkspaceRoot};
use crate::services::tree::TreeBuilder;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::Path;

/// A requested change to the workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateFile { name: String, parent_path: String },
    CreateFolder { name: String, parent_path: String },
    DeleteItem { path: String },
    RenameItem { old_path: String, new_name: String },
    SaveFile { path: String, content: String },
}

/// What applying a mutation did to the filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Changed,
    /// Precondition unmet; nothing to do and nothing to report
    Unchanged,
}

impl Mutation {
    /// Create/delete/rename change the shape of the tree
    pub fn is_structural(&self) -> bool {
        !matches!(self, Mutation::SaveFile { .. })
    }

    /// Perform the filesystem operation under the current root
    pub fn apply(&self, root: &WorkspaceRoot) -> Result<Applied> {
        match self {
            Mutation::CreateFile { name, parent_path } => {
                let target = root.resolve(parent_path)?.join(normalize_relative(name)?);
                create_file(&target)
            }
            Mutation::CreateFolder { name, parent_path } => {
                let target = root.resolve(parent_path)?.join(normalize_relative(name)?);
                create_folder(&target)
            }
            Mutation::DeleteItem { path } => delete_item(&root.resolve_entry(path)?),
            Mutation::RenameItem { old_path, new_name } => {
                let source = root.resolve_entry(old_path)?;
                // Nothing to rename is a silent no-op, whatever the new name
                if !exists(&source)? {
                    return Ok(Applied::Unchanged);
                }
                validate_name(new_name)?;
                let target = match source.parent() {
                    Some(parent) => parent.join(new_name),
                    None => return Err(WorkspaceError::OutsideRoot(old_path.clone())),
                };
                rename_item(&source, &target)
            }
            Mutation::SaveFile { path, content } => {
                let target = root.resolve_entry(path)?;
                fs::write(&target, content.as_bytes())
                    .map_err(|e| WorkspaceError::io(&target, e))?;
                Ok(Applied::Changed)
            }
        }
    }
}

fn exists(path: &Path) -> Result<bool> {
    // symlink_metadata so a dangling link still counts as present
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(WorkspaceError::io(path, e)),
    }
}

fn create_file(target: &Path) -> Result<Applied> {
    match OpenOptions::new().write(true).create_new(true).open(target) {
        Ok(_) => Ok(Applied::Changed),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(Applied::Unchanged),
        Err(e) => Err(WorkspaceError::io(target, e)),
    }
}

fn create_folder(target: &Path) -> Result<Applied> {
    if exists(target)? {
        return Ok(Applied::Unchanged);
    }
    fs::create_dir_all(target).map_err(|e| WorkspaceError::io(target, e))?;
    Ok(Applied::Changed)
}

fn delete_item(target: &Path) -> Result<Applied> {
    let metadata = match fs::symlink_metadata(target) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Applied::Unchanged),
        Err(e) => return Err(WorkspaceError::io(target, e)),
    };

    let removed = if metadata.is_dir() {
        fs::remove_dir_all(target)
    } else {
        fs::remove_file(target)
    };

    match removed {
        Ok(()) => Ok(Applied::Changed),
        // lost a race with another deleter
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Applied::Unchanged),
        Err(e) => Err(WorkspaceError::io(target, e)),
    }
}

fn rename_item(source: &Path, target: &Path) -> Result<Applied> {
    fs::rename(source, target).map_err(|e| WorkspaceError::io(source, e))?;
    Ok(Applied::Changed)
}

/// A rename keeps the item in its parent, so the new name is a single segment
fn validate_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || name.contains('/')
        || name.contains(std::path::MAIN_SEPARATOR)
    {
        return Err(WorkspaceError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Applies mutations and routes the resulting events
pub struct MutationCoordinator<'a> {
    root: &'a WorkspaceRoot,
    gateway: &'a dyn Broadcaster,
}

impl<'a> MutationCoordinator<'a> {
    pub fn new(root: &'a WorkspaceRoot, gateway: &'a dyn Broadcaster) -> Self {
        Self { root, gateway }
    }

    pub fn submit(&self, client: ClientId, mutation: Mutation) {
        let outcome = mutation.apply(self.root);

        match (&mutation, outcome) {
            (Mutation::SaveFile { path, .. }, Ok(_)) => {
                log::debug!("{client} saved {path}");
                self.gateway.send_to(
                    client,
                    ServerEvent::SaveSuccess { path: path.clone() },
                );
            }
            (Mutation::SaveFile { path, .. }, Err(e)) => {
                log::warn!("{client} failed to save {path}: {e}");
                self.gateway.send_to(
                    client,
                    ServerEvent::SaveError {
                        message: e.to_string(),
                    },
                );
            }
            (_, Ok(Applied::Unchanged)) => {
                log::debug!("{client} {mutation:?} skipped, nothing to do");
            }
            (_, Ok(Applied::Changed)) => {
                log::info!("{client} applied {mutation:?}");
                self.broadcast_tree(client);
            }
            (_, Err(e)) => {
                log::warn!("{client} {mutation:?} failed: {e}");
                self.gateway.send_to(client, ServerEvent::error(e.to_string()));
            }
        }
    }

    /// Rebuild the whole tree and push it to every client
    fn broadcast_tree(&self, client: ClientId) {
        let root = self.root.current();
        match TreeBuilder::new(&root).build(&root) {
            Ok(tree) => self.gateway.broadcast(ServerEvent::FileList(tree)),
            Err(e) => {
                log::warn!("Tree rebuild after mutation failed: {e}");
                self.gateway.send_to(client, ServerEvent::error(e.to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::RecordingBroadcaster;

    fn setup() -> (tempfile::TempDir, WorkspaceRoot) {
        let dir = tempfile::tempdir().unwrap();
        let root = WorkspaceRoot::new(dir.path()).unwrap();
        (dir, root)
    }

    #[test]
    fn create_file_is_a_noop_when_target_exists() {
        let (_dir, root) = setup();
        fs::write(root.current().join("x.txt"), "keep").unwrap();

        let applied = Mutation::CreateFile {
            name: "x.txt".into(),
            parent_path: String::new(),
        }
        .apply(&root)
        .unwrap();

        assert_eq!(applied, Applied::Unchanged);
        assert_eq!(fs::read_to_string(root.current().join("x.txt")).unwrap(), "keep");
    }

    #[test]
    fn create_folder_makes_intermediate_directories() {
        let (_dir, root) = setup();
        let applied = Mutation::CreateFolder {
            name: "c".into(),
            parent_path: "a/b".into(),
        }
        .apply(&root)
        .unwrap();

        assert_eq!(applied, Applied::Changed);
        assert!(root.current().join("a/b/c").is_dir());
    }

    #[test]
    fn delete_removes_directories_recursively() {
        let (_dir, root) = setup();
        fs::create_dir_all(root.current().join("sub/deep")).unwrap();
        fs::write(root.current().join("sub/deep/f.txt"), "").unwrap();

        let applied = Mutation::DeleteItem { path: "sub".into() }.apply(&root).unwrap();
        assert_eq!(applied, Applied::Changed);
        assert!(!root.current().join("sub").exists());
    }

    #[test]
    fn delete_and_rename_of_missing_items_are_skipped() {
        let (_dir, root) = setup();
        assert_eq!(
            Mutation::DeleteItem { path: "nope".into() }.apply(&root).unwrap(),
            Applied::Unchanged
        );
        assert_eq!(
            Mutation::RenameItem {
                old_path: "nope".into(),
                new_name: "still-nope".into(),
            }
            .apply(&root)
            .unwrap(),
            Applied::Unchanged
        );
    }

    #[test]
    fn rename_stays_in_the_same_parent() {
        let (_dir, root) = setup();
        fs::create_dir(root.current().join("sub")).unwrap();
        fs::write(root.current().join("sub/a.txt"), "a").unwrap();

        Mutation::RenameItem {
            old_path: "sub/a.txt".into(),
            new_name: "b.txt".into(),
        }
        .apply(&root)
        .unwrap();

        assert!(!root.current().join("sub/a.txt").exists());
        assert_eq!(fs::read_to_string(root.current().join("sub/b.txt")).unwrap(), "a");
    }

    #[test]
    fn rename_rejects_names_with_separators() {
        let (_dir, root) = setup();
        fs::write(root.current().join("a.txt"), "").unwrap();
        let result = Mutation::RenameItem {
            old_path: "a.txt".into(),
            new_name: "../b.txt".into(),
        }
        .apply(&root);
        assert!(matches!(result, Err(WorkspaceError::InvalidName(_))));
    }

    #[test]
    fn rename_of_a_missing_item_is_skipped_before_the_name_is_checked() {
        let (_dir, root) = setup();
        let gateway = RecordingBroadcaster::default();
        MutationCoordinator::new(&root, &gateway).submit(
            ClientId(4),
            Mutation::RenameItem {
                old_path: "gone.txt".into(),
                new_name: "a/b".into(),
            },
        );
        assert!(gateway.events().is_empty());
    }

    #[test]
    fn save_overwrites_or_creates() {
        let (_dir, root) = setup();
        let save = |content: &str| Mutation::SaveFile {
            path: "notes.md".into(),
            content: content.into(),
        };
        save("first").apply(&root).unwrap();
        save("second").apply(&root).unwrap();
        assert_eq!(
            fs::read_to_string(root.current().join("notes.md")).unwrap(),
            "second"
        );
    }

    #[test]
    fn skipped_structural_mutation_sends_nothing() {
        let (_dir, root) = setup();
        let gateway = RecordingBroadcaster::default();
        MutationCoordinator::new(&root, &gateway).submit(
            ClientId(1),
            Mutation::DeleteItem {
                path: "missing.txt".into(),
            },
        );
        assert!(gateway.events().is_empty());
    }

    #[test]
    fn escaping_paths_are_reported_to_the_requester() {
        let (_dir, root) = setup();
        let gateway = RecordingBroadcaster::default();
        MutationCoordinator::new(&root, &gateway).submit(
            ClientId(3),
            Mutation::CreateFile {
                name: "evil.txt".into(),
                parent_path: "../..".into(),
            },
        );
        let events = gateway.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, Some(ClientId(3)));
        assert!(matches!(events[0].1, ServerEvent::Error { .. }));
    }

    #[test]
    fn failed_save_reports_save_error_without_broadcast() {
        let (_dir, root) = setup();
        let gateway = RecordingBroadcaster::default();
        MutationCoordinator::new(&root, &gateway).submit(
            ClientId(2),
            Mutation::SaveFile {
                path: "missing-dir/file.txt".into(),
                content: "x".into(),
            },
        );

        let events = gateway.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, Some(ClientId(2)));
        assert!(matches!(events[0].1, ServerEvent::SaveError { .. }));
    }
}

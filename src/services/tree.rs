//! Tree builder
//! Materializes a directory subtree into [`FileNode`]s.
//!
//! The walk is iterative: directories are expanded from an explicit stack into a
//! flat arena, then the arena is folded back into nested nodes. Excluded names are
//! dropped before descent, so their contents are never read.

use crate::error::{Result, WorkspaceError};
use crate::models::FileNode;
use crate::services::root::to_client_path;
use std::fs;
use std::path::{Path, PathBuf};

/// Entries that never appear in the tree
pub const EXCLUDED_NAMES: [&str; 3] = ["node_modules", ".git", ".next"];

pub fn is_excluded(name: &str) -> bool {
    EXCLUDED_NAMES.contains(&name)
}

struct ArenaEntry {
    name: String,
    path: String,
    /// `Some` for directories, holding arena indices of the children in listing order
    children: Option<Vec<usize>>,
}

pub struct TreeBuilder {
    root: PathBuf,
}

impl TreeBuilder {
    /// `root` is the workspace root every node path is made relative to
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Build the tree below `directory`, which must lie inside the root
    pub fn build(&self, directory: &Path) -> Result<Vec<FileNode>> {
        let base = to_client_path(&self.root, directory)?;

        // Only the requested directory must be readable; anything below is fail-soft
        let top = fs::read_dir(directory).map_err(|e| WorkspaceError::io(directory, e))?;

        let mut arena: Vec<ArenaEntry> = Vec::new();
        let mut stack: Vec<(usize, PathBuf)> = Vec::new();
        let top_level = self.list_into(&mut arena, &mut stack, top, directory, &base);

        while let Some((index, dir)) = stack.pop() {
            let children = match fs::read_dir(&dir) {
                Ok(entries) => {
                    let parent = arena[index].path.clone();
                    self.list_into(&mut arena, &mut stack, entries, &dir, &parent)
                }
                Err(e) => {
                    log::warn!("Listing {} failed, showing it empty: {}", dir.display(), e);
                    Vec::new()
                }
            };
            arena[index].children = Some(children);
        }

        Ok(fold(arena, &top_level))
    }

    /// Append the entries of one directory to the arena, queueing subdirectories
    fn list_into(
        &self,
        arena: &mut Vec<ArenaEntry>,
        stack: &mut Vec<(usize, PathBuf)>,
        entries: fs::ReadDir,
        dir: &Path,
        parent: &str,
    ) -> Vec<usize> {
        let mut indices = Vec::new();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            if is_excluded(&name) {
                continue;
            }

            // file_type() does not follow symlinks, so links are leaves
            let is_directory = match entry.file_type() {
                Ok(file_type) => file_type.is_dir(),
                Err(e) => {
                    log::warn!("Skipping {}: {}", entry.path().display(), e);
                    continue;
                }
            };

            let path = if parent.is_empty() {
                name.clone()
            } else {
                format!("{parent}/{name}")
            };

            let index = arena.len();
            arena.push(ArenaEntry {
                name,
                path,
                children: if is_directory { Some(Vec::new()) } else { None },
            });
            if is_directory {
                stack.push((index, entry.path()));
            }
            indices.push(index);
        }

        indices
    }
}

/// Children always sit at higher arena indices than their parent, so a reverse
/// sweep finishes every child before its parent needs it.
fn fold(arena: Vec<ArenaEntry>, top_level: &[usize]) -> Vec<FileNode> {
    let mut built: Vec<Option<FileNode>> = Vec::with_capacity(arena.len());
    built.resize_with(arena.len(), || None);

    for (index, entry) in arena.into_iter().enumerate().rev() {
        let children = entry.children.map(|indices| {
            indices
                .into_iter()
                .filter_map(|child| built[child].take())
                .collect()
        });
        built[index] = Some(FileNode {
            name: entry.name,
            path: entry.path,
            is_directory: children.is_some(),
            children,
        });
    }

    top_level
        .iter()
        .filter_map(|&index| built[index].take())
        .collect()
}

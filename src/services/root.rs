//! Workspace root
//! The single absolute directory every client path and the shared shell are bound to

use crate::error::{Result, WorkspaceError};
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};

pub struct WorkspaceRoot {
    path: RwLock<PathBuf>,
}

impl WorkspaceRoot {
    /// Create the root from a validated directory
    pub fn new(initial: impl AsRef<Path>) -> Result<Self> {
        let path = Self::validate(initial.as_ref())?;
        Ok(Self {
            path: RwLock::new(path),
        })
    }

    /// Absolute path of the current root
    pub fn current(&self) -> PathBuf {
        self.path.read().clone()
    }

    /// Check that `candidate` exists and is a directory; returns its canonical absolute form
    pub fn validate(candidate: &Path) -> Result<PathBuf> {
        let canonical = fs::canonicalize(candidate)
            .map_err(|_| WorkspaceError::InvalidRoot(candidate.to_path_buf()))?;
        if !canonical.is_dir() {
            return Err(WorkspaceError::InvalidRoot(candidate.to_path_buf()));
        }
        Ok(canonical)
    }

    /// Replace the root with an already validated path. Returns the previous root.
    pub fn commit(&self, validated: PathBuf) -> PathBuf {
        std::mem::replace(&mut *self.path.write(), validated)
    }

    /// Join a client path onto the current root
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let root = self.current();
        Ok(root.join(normalize_relative(relative)?))
    }

    /// Like [`resolve`](Self::resolve) but refuses paths that name the root itself
    pub fn resolve_entry(&self, relative: &str) -> Result<PathBuf> {
        let normalized = normalize_relative(relative)?;
        if normalized.as_os_str().is_empty() {
            return Err(WorkspaceError::OutsideRoot(relative.to_string()));
        }
        Ok(self.current().join(normalized))
    }
}

/// Turn a `/`-separated client path into a relative host path.
/// Empty and `.` segments are skipped; `..` or an absolute path is rejected.
pub fn normalize_relative(value: &str) -> Result<PathBuf> {
    if value.starts_with('/') || Path::new(value).has_root() {
        return Err(WorkspaceError::OutsideRoot(value.to_string()));
    }

    let mut normalized = PathBuf::new();
    for segment in value.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(WorkspaceError::OutsideRoot(value.to_string())),
            part => {
                // a segment like `C:` would re-anchor the join on Windows
                if Path::new(part).is_absolute() || Path::new(part).has_root() {
                    return Err(WorkspaceError::OutsideRoot(value.to_string()));
                }
                normalized.push(part);
            }
        }
    }

    Ok(normalized)
}

/// Render a host path relative to `root` with `/` separators
pub fn to_client_path(root: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| WorkspaceError::NotUnderRoot {
            dir: path.to_path_buf(),
            root: root.to_path_buf(),
        })?;

    let parts: Vec<String> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

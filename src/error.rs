//! Error types
//! Every failure a workspace operation can report back to a client

use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, WorkspaceError>;

#[derive(thiserror::Error, Debug)]
pub enum WorkspaceError {
    /// Candidate root does not exist or is not a directory
    #[error("Invalid project directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    /// Client path is absolute or climbs out of the workspace root
    #[error("Path is outside the workspace: {0}")]
    OutsideRoot(String),

    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    /// A directory that cannot be expressed relative to the workspace root
    #[error("{} is not inside workspace root {}", dir.display(), root.display())]
    NotUnderRoot { dir: PathBuf, root: PathBuf },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Terminal error: {0}")]
    Terminal(String),
}

impl WorkspaceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        WorkspaceError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_message_names_the_path() {
        let err = WorkspaceError::io(
            "/tmp/project/a.txt",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "/tmp/project/a.txt: denied");
    }

    #[test]
    fn invalid_root_message_is_client_readable() {
        let err = WorkspaceError::InvalidRoot(PathBuf::from("/nope"));
        assert_eq!(err.to_string(), "Invalid project directory: /nope");
    }
}

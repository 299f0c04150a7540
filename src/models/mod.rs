//! Models module
//! Shared data types exchanged with connected clients.
//! Every event travels as one JSON frame: `{"event": "<name>", "data": <payload>}`

use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of the materialized project tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub name: String,
    /// Relative to the workspace root, always `/`-separated
    pub path: String,
    pub is_directory: bool,
    /// Present only for directories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileNode>>,
}

impl FileNode {
    #[cfg(test)]
    pub fn file(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_directory: false,
            children: None,
        }
    }

    pub fn directory(
        name: impl Into<String>,
        path: impl Into<String>,
        children: Vec<FileNode>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_directory: true,
            children: Some(children),
        }
    }
}

/// Identity of one connection at the broadcast gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Terminal dimensions in character cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSize {
    pub cols: u16,
    pub rows: u16,
}

impl Default for TerminalSize {
    fn default() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFileRequest {
    pub path: String,
    pub content: String,
}

/// Payload of `create-file` and `create-folder`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub name: String,
    #[serde(default)]
    pub parent_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameItemRequest {
    pub old_path: String,
    pub new_name: String,
}

/// Client → server events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    GetFiles,
    SetProjectPath(String),
    ReadFile(String),
    SaveFile(SaveFileRequest),
    CreateFile(CreateItemRequest),
    CreateFolder(CreateItemRequest),
    DeleteItem(String),
    RenameItem(RenameItemRequest),
    TerminalInput(String),
    TerminalResize(TerminalSize),
    RunCode(String),
}

/// Server → client events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    FileList(Vec<FileNode>),
    FileContent { path: String, content: String },
    SaveSuccess { path: String },
    SaveError { message: String },
    Error { message: String },
    TerminalOutput(String),
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }

    /// Wire name of the event, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::FileList(_) => "file-list",
            ServerEvent::FileContent { .. } => "file-content",
            ServerEvent::SaveSuccess { .. } => "save-success",
            ServerEvent::SaveError { .. } => "save-error",
            ServerEvent::Error { .. } => "error",
            ServerEvent::TerminalOutput(_) => "terminal-output",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_nodes_omit_children_for_files() {
        let tree = vec![FileNode::directory(
            "src",
            "src",
            vec![FileNode::file("main.rs", "src/main.rs")],
        )];
        let value = serde_json::to_value(&ServerEvent::FileList(tree)).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "file-list",
                "data": [{
                    "name": "src",
                    "path": "src",
                    "isDirectory": true,
                    "children": [
                        {"name": "main.rs", "path": "src/main.rs", "isDirectory": false}
                    ]
                }]
            })
        );
    }

    #[test]
    fn parses_client_events_in_wire_shape() {
        let get: ClientEvent = serde_json::from_str(r#"{"event":"get-files"}"#).unwrap();
        assert_eq!(get, ClientEvent::GetFiles);

        let create: ClientEvent = serde_json::from_value(json!({
            "event": "create-file",
            "data": {"name": "x.txt", "parentPath": "src"}
        }))
        .unwrap();
        assert_eq!(
            create,
            ClientEvent::CreateFile(CreateItemRequest {
                name: "x.txt".into(),
                parent_path: Some("src".into()),
            })
        );

        let rename: ClientEvent = serde_json::from_value(json!({
            "event": "rename-item",
            "data": {"oldPath": "a.txt", "newName": "b.txt"}
        }))
        .unwrap();
        assert!(matches!(rename, ClientEvent::RenameItem(ref r) if r.new_name == "b.txt"));

        let delete: ClientEvent =
            serde_json::from_str(r#"{"event":"delete-item","data":"sub/x.txt"}"#).unwrap();
        assert_eq!(delete, ClientEvent::DeleteItem("sub/x.txt".into()));
    }

    #[test]
    fn parent_path_is_optional() {
        let create: ClientEvent = serde_json::from_value(json!({
            "event": "create-folder",
            "data": {"name": "docs"}
        }))
        .unwrap();
        assert_eq!(
            create,
            ClientEvent::CreateFolder(CreateItemRequest {
                name: "docs".into(),
                parent_path: None,
            })
        );
    }

    #[test]
    fn unknown_events_are_rejected() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"event":"format-disk"}"#).is_err());
    }

    #[test]
    fn server_event_names_match_wire_tags() {
        let events = [
            ServerEvent::FileList(Vec::new()),
            ServerEvent::SaveSuccess { path: "a".into() },
            ServerEvent::error("boom"),
            ServerEvent::TerminalOutput("$ ".into()),
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["event"], event.name());
        }
    }
}

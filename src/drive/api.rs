//! Wire types and query syntax for the drive file-resource API.

use super::{ChildFilter, ResourceKind, FOLDER_MIME_TYPE};
use serde::{Deserialize, Serialize};

/// Link to a parent folder in file metadata.
#[derive(Debug, Serialize)]
pub struct ParentRef {
    pub kind: &'static str,
    pub id: String,
}

impl ParentRef {
    pub fn new(id: &str) -> Self {
        Self {
            kind: "drive#fileLink",
            id: id.to_string(),
        }
    }
}

/// Metadata sent when creating a folder or file resource.
#[derive(Debug, Serialize)]
pub struct FileMetadata {
    pub title: String,
    pub parents: Vec<ParentRef>,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl FileMetadata {
    pub fn folder(title: &str, parent: &str) -> Self {
        Self {
            title: title.to_string(),
            parents: vec![ParentRef::new(parent)],
            mime_type: Some(FOLDER_MIME_TYPE.to_string()),
        }
    }

    pub fn file(title: &str, parent: &str) -> Self {
        Self {
            title: title.to_string(),
            parents: vec![ParentRef::new(parent)],
            mime_type: None,
        }
    }
}

/// File resource descriptor returned by the API.
#[derive(Debug, Deserialize)]
pub struct FileResource {
    pub id: String,
    pub title: String,
}

/// One page of a file listing.
#[derive(Debug, Deserialize)]
pub struct FileList {
    #[serde(default)]
    pub items: Vec<FileResource>,
    #[serde(rename = "nextPageToken", default)]
    pub next_page_token: Option<String>,
}

/// Build the `q` filter string for listing direct children of `parent`.
pub(crate) fn child_query(parent: &str, filter: &ChildFilter) -> String {
    let mut q = format!("'{}' in parents and trashed=false", escape(parent));
    match filter.kind {
        Some(ResourceKind::Folder) => {
            q.push_str(&format!(" and mimeType='{FOLDER_MIME_TYPE}'"));
        }
        Some(ResourceKind::File) => {
            q.push_str(&format!(" and mimeType!='{FOLDER_MIME_TYPE}'"));
        }
        None => {}
    }
    if let Some(name) = &filter.name {
        q.push_str(&format!(" and title='{}'", escape(name)));
    }
    q
}

/// Escape a value embedded in a single-quoted query literal.
fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

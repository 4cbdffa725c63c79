//! Remote store collaborator.
//!
//! The pipeline talks to the remote drive through the [`RemoteStore`] trait so
//! the resolver, duplicate filter, and uploader can run against an in-memory
//! fake in tests. [`client::DriveClient`] is the HTTP implementation.

pub mod api;
pub mod auth;
pub mod client;

pub use auth::Session;
pub use client::DriveClient;

use crate::error::UploadError;
use crate::types::ResourceId;
use async_trait::async_trait;
use std::path::Path;

/// Parent alias the remote store understands for the hierarchy root.
pub const ROOT_ALIAS: &str = "root";

/// MIME type marking a remote resource as a folder.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Which kind of child resource a listing should match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Folder,
    File,
}

/// Descriptor of a remote resource as returned by list/create operations.
#[derive(Debug, Clone)]
pub struct RemoteResource {
    pub id: ResourceId,
    pub name: String,
    pub parent: Option<ResourceId>,
}

/// Filter for listing direct children of a folder.
///
/// Trashed resources never match, regardless of the filter.
#[derive(Debug, Clone, Default)]
pub struct ChildFilter {
    /// Restrict to resources with exactly this name.
    pub name: Option<String>,
    /// Restrict to folders, or to non-folder files.
    pub kind: Option<ResourceKind>,
}

impl ChildFilter {
    /// Folders with the given name.
    pub fn folder_named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            kind: Some(ResourceKind::Folder),
        }
    }

    /// All non-folder children.
    pub fn files() -> Self {
        Self {
            name: None,
            kind: Some(ResourceKind::File),
        }
    }
}

/// Operations the pipeline needs from the remote store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// List non-trashed direct children of `parent` matching `filter`.
    async fn list_children(
        &self,
        parent: &str,
        filter: &ChildFilter,
    ) -> Result<Vec<RemoteResource>, UploadError>;

    /// Create a folder named `name` under `parent`.
    async fn create_folder(&self, parent: &str, name: &str)
        -> Result<RemoteResource, UploadError>;

    /// Create a file named `name` under `parent`, streaming the content of
    /// the local file at `source`.
    async fn upload_file(
        &self,
        parent: &str,
        name: &str,
        source: &Path,
    ) -> Result<RemoteResource, UploadError>;
}

//! Error taxonomy for the upload pipeline.
//!
//! Resolver- and directory-level errors terminate the whole run; a failure
//! inside a single file's upload task is wrapped in [`UploadError::UploadFailure`]
//! and isolated to that file.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    /// More than one remote resource matched a unique-by-contract lookup.
    /// Indicates duplicated remote state; never auto-healed.
    #[error("ambiguous remote state: {count} resources named '{name}' under parent '{parent}'")]
    AmbiguousResource {
        parent: String,
        name: String,
        count: usize,
    },

    /// The well-known top-level remote folder does not exist.
    #[error("remote root folder '{0}' does not exist")]
    MissingRootFolder(String),

    /// An upload slot could not be acquired within the ceiling wait.
    #[error("timed out after {0:?} waiting for an upload slot")]
    PermitTimeout(Duration),

    /// A single file's upload or relocation failed. Sibling uploads and the
    /// walk continue; the local file stays in place for the next run.
    #[error("upload of {path:?} failed: {source}")]
    UploadFailure {
        path: PathBuf,
        #[source]
        source: Box<UploadError>,
    },

    /// Network-level failure talking to the remote store.
    #[error("remote transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The remote store answered with a non-success status.
    #[error("remote store rejected the request: status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    /// A path segment or file name was not valid UTF-8 where the remote
    /// store requires a textual name.
    #[error("path {0:?} contains a segment that is not valid UTF-8")]
    InvalidPath(PathBuf),

    /// Worker pool plumbing failure (closed semaphore, panicked task).
    #[error("worker pool failure: {0}")]
    Pool(String),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

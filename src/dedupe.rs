//! Duplicate detection by remote file name.
//!
//! Name equality is the only de-duplication signal: content hashes, sizes,
//! and modification times are ignored. A local file whose name already exists
//! in the corresponding remote folder is never uploaded again.

use crate::drive::{ChildFilter, RemoteStore};
use crate::error::UploadError;
use std::collections::HashSet;

/// A dot-prefixed name is invisible to the pipeline, both as a file and as a
/// directory.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Names of all non-folder, non-trashed direct children of `folder`.
pub async fn remote_file_names(
    store: &dyn RemoteStore,
    folder: &str,
) -> Result<HashSet<String>, UploadError> {
    let children = store.list_children(folder, &ChildFilter::files()).await?;
    Ok(children.into_iter().map(|child| child.name).collect())
}

/// Local file names not yet present remotely, hidden names excluded, in the
/// caller's enumeration order.
pub fn candidate_files(local: &[String], remote: &HashSet<String>) -> Vec<String> {
    local
        .iter()
        .filter(|name| !is_hidden(name) && !remote.contains(*name))
        .cloned()
        .collect()
}

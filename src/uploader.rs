//! Upload worker: push one file to the remote store, then relocate it into
//! the mirrored "uploaded" tree.
//!
//! A failed upload leaves the local file exactly where it was, so the next
//! run retries it via the duplicate-name filter.

use crate::drive::RemoteStore;
use crate::error::UploadError;
use crate::types::ResourceId;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Everything one upload needs, owned by the task, so submitted work never
/// captures shared loop state.
#[derive(Debug, Clone)]
pub struct UploadTask {
    /// Remote folder the file is uploaded into.
    pub remote_folder: ResourceId,
    /// Absolute path of the local file.
    pub source: PathBuf,
    /// Mirrored directory under the uploaded root the file moves to.
    pub dest_dir: PathBuf,
}

/// Upload `task.source` and, on success, move it into `task.dest_dir`.
pub async fn run(store: &dyn RemoteStore, task: &UploadTask) -> Result<(), UploadError> {
    let name = task
        .source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| UploadError::InvalidPath(task.source.clone()))?;

    info!(file = %name, folder_id = %task.remote_folder, "uploading");
    store
        .upload_file(&task.remote_folder, name, &task.source)
        .await?;

    tokio::fs::create_dir_all(&task.dest_dir).await?;
    let dest = task.dest_dir.join(name);
    move_file(&task.source, &dest).await?;
    debug!(from = ?task.source, to = ?dest, "relocated uploaded file");
    Ok(())
}

/// Move a file, falling back to copy-then-remove when the rename crosses a
/// filesystem boundary. Any other rename failure is returned as-is.
async fn move_file(source: &Path, dest: &Path) -> Result<(), UploadError> {
    match tokio::fs::rename(source, dest).await {
        Ok(()) => Ok(()),
        Err(rename_err) if crosses_devices(&rename_err) => {
            debug!(
                from = ?source,
                to = ?dest,
                "rename crossed filesystems, copying instead"
            );
            tokio::fs::copy(source, dest).await?;
            tokio::fs::remove_file(source).await?;
            Ok(())
        }
        Err(rename_err) => Err(rename_err.into()),
    }
}

fn crosses_devices(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::CrossesDevices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::{ChildFilter, RemoteResource};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Records uploads; optionally fails them all.
    #[derive(Default)]
    struct RecordingStore {
        uploads: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl RemoteStore for RecordingStore {
        async fn list_children(
            &self,
            _parent: &str,
            _filter: &ChildFilter,
        ) -> Result<Vec<RemoteResource>, UploadError> {
            Ok(Vec::new())
        }

        async fn create_folder(
            &self,
            parent: &str,
            name: &str,
        ) -> Result<RemoteResource, UploadError> {
            Ok(RemoteResource {
                id: "folder".to_string(),
                name: name.to_string(),
                parent: Some(parent.to_string()),
            })
        }

        async fn upload_file(
            &self,
            parent: &str,
            name: &str,
            source: &Path,
        ) -> Result<RemoteResource, UploadError> {
            if self.fail {
                return Err(UploadError::Api {
                    status: 503,
                    body: "backend unavailable".to_string(),
                });
            }
            // Read the source to mimic streaming its content.
            let _bytes = tokio::fs::read(source).await?;
            self.uploads
                .lock()
                .push((parent.to_string(), name.to_string()));
            Ok(RemoteResource {
                id: "file".to_string(),
                name: name.to_string(),
                parent: Some(parent.to_string()),
            })
        }
    }

    fn task(source: &Path, dest_dir: &Path) -> UploadTask {
        UploadTask {
            remote_folder: "folder-1".to_string(),
            source: source.to_path_buf(),
            dest_dir: dest_dir.to_path_buf(),
        }
    }

    #[tokio::test]
    async fn uploads_then_moves_into_dest_tree() {
        let src_dir = tempfile::tempdir().unwrap();
        let dest_root = tempfile::tempdir().unwrap();
        let source = src_dir.path().join("clip1.mp4");
        std::fs::write(&source, b"frames").unwrap();
        let dest_dir = dest_root.path().join("trip");

        let store = RecordingStore::default();
        run(&store, &task(&source, &dest_dir)).await.unwrap();

        assert_eq!(
            *store.uploads.lock(),
            vec![("folder-1".to_string(), "clip1.mp4".to_string())]
        );
        assert!(!source.exists());
        let moved = dest_dir.join("clip1.mp4");
        assert_eq!(std::fs::read(moved).unwrap(), b"frames");
    }

    #[tokio::test]
    async fn failed_upload_leaves_the_file_in_place() {
        let src_dir = tempfile::tempdir().unwrap();
        let dest_root = tempfile::tempdir().unwrap();
        let source = src_dir.path().join("clip1.mp4");
        std::fs::write(&source, b"frames").unwrap();
        let dest_dir = dest_root.path().join("trip");

        let store = RecordingStore {
            fail: true,
            ..RecordingStore::default()
        };
        let err = run(&store, &task(&source, &dest_dir)).await.unwrap_err();

        assert!(matches!(err, UploadError::Api { status: 503, .. }));
        assert!(source.exists());
        assert!(!dest_dir.join("clip1.mp4").exists());
    }

    #[tokio::test]
    async fn move_file_renames_within_one_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("a.mp4");
        let to = dir.path().join("b.mp4");
        std::fs::write(&from, b"x").unwrap();

        move_file(&from, &to).await.unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"x");
    }

    #[test]
    fn only_cross_device_errors_trigger_the_copy_fallback() {
        use std::io::{Error, ErrorKind};

        assert!(crosses_devices(&Error::new(
            ErrorKind::CrossesDevices,
            "EXDEV"
        )));
        assert!(!crosses_devices(&Error::new(
            ErrorKind::PermissionDenied,
            "EACCES"
        )));
        assert!(!crosses_devices(&Error::new(ErrorKind::NotFound, "ENOENT")));
    }

    #[tokio::test]
    async fn move_file_surfaces_rename_errors_without_copying() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("missing.mp4");
        let to = dir.path().join("b.mp4");

        let err = move_file(&from, &to).await.unwrap_err();
        assert!(matches!(
            err,
            UploadError::Io(ref io) if io.kind() == std::io::ErrorKind::NotFound
        ));
        assert!(!to.exists());
    }
}

//! Bounded dispatcher: walks the local tree and fans uploads out to a
//! fixed-size worker pool.
//!
//! The walk, remote resolution, and duplicate filtering all run on the
//! single-threaded control path; only uploads run concurrently. A semaphore
//! bounds the number of in-flight uploads, and each task owns its permit so
//! the slot is released when the task ends, success or failure.

use crate::config::Settings;
use crate::dedupe;
use crate::drive::RemoteStore;
use crate::error::UploadError;
use crate::resolver::DirResolver;
use crate::uploader::{self, UploadTask};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Outcome tallies for one run.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Directories that had at least one visible direct file.
    pub directories: usize,
    /// Upload tasks submitted to the pool.
    pub submitted: usize,
    /// Uploads that completed and were relocated.
    pub uploaded: usize,
    /// Uploads that failed; their files stay in place for the next run.
    pub failed: usize,
    /// Local files skipped because the name already exists remotely.
    pub skipped_existing: usize,
    /// Highest number of uploads observed running at once.
    pub max_in_flight: usize,
}

/// Tracks the number of concurrently running upload tasks and the high-water
/// mark, for the run summary and for asserting the concurrency bound in tests.
#[derive(Clone, Default)]
struct InFlightGauge {
    inner: Arc<GaugeInner>,
}

#[derive(Default)]
struct GaugeInner {
    current: AtomicUsize,
    max: AtomicUsize,
}

struct InFlightSlot {
    inner: Arc<GaugeInner>,
}

impl InFlightGauge {
    fn enter(&self) -> InFlightSlot {
        let now = self.inner.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max.fetch_max(now, Ordering::SeqCst);
        InFlightSlot {
            inner: Arc::clone(&self.inner),
        }
    }

    fn max(&self) -> usize {
        self.inner.max.load(Ordering::SeqCst)
    }
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.inner.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Drives one mirror run: walk, resolve, filter, dispatch, drain.
pub struct Dispatcher {
    store: Arc<dyn RemoteStore>,
    root_folder: String,
    worker_count: usize,
    permit_timeout: Duration,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn RemoteStore>, settings: &Settings) -> Self {
        Self {
            store,
            root_folder: settings.root_folder.clone(),
            worker_count: settings.worker_count,
            permit_timeout: settings.permit_timeout(),
        }
    }

    /// Mirror `source_root` into the remote hierarchy, moving uploaded files
    /// under `dest_root`.
    ///
    /// Per-file upload failures are tallied in the returned stats; resolver,
    /// listing, and permit-timeout errors abort the run. In-flight uploads
    /// are always drained before returning, even on a fatal error.
    pub async fn run(
        &self,
        source_root: &Path,
        dest_root: &Path,
    ) -> Result<RunStats, UploadError> {
        let mut resolver = DirResolver::new(Arc::clone(&self.store));
        let semaphore = Arc::new(Semaphore::new(self.worker_count));
        let gauge = InFlightGauge::default();
        let mut pool: JoinSet<Result<(), UploadError>> = JoinSet::new();
        let mut stats = RunStats::default();

        tokio::fs::create_dir_all(dest_root).await?;

        let walk_result = self
            .walk_and_submit(
                source_root,
                dest_root,
                &mut resolver,
                &semaphore,
                &gauge,
                &mut pool,
                &mut stats,
            )
            .await;

        // Let everything already submitted finish, fatal error or not.
        while let Some(joined) = pool.join_next().await {
            record_outcome(joined, &mut stats);
        }
        stats.max_in_flight = gauge.max();

        walk_result?;

        info!(
            directories = stats.directories,
            uploaded = stats.uploaded,
            failed = stats.failed,
            skipped_existing = stats.skipped_existing,
            max_in_flight = stats.max_in_flight,
            cache_entries = resolver.cache().len(),
            cache_hits = resolver.cache().hits(),
            cache_misses = resolver.cache().misses(),
            "run complete"
        );
        Ok(stats)
    }

    #[allow(clippy::too_many_arguments)]
    async fn walk_and_submit(
        &self,
        source_root: &Path,
        dest_root: &Path,
        resolver: &mut DirResolver,
        semaphore: &Arc<Semaphore>,
        gauge: &InFlightGauge,
        pool: &mut JoinSet<Result<(), UploadError>>,
        stats: &mut RunStats,
    ) -> Result<(), UploadError> {
        let walker = WalkDir::new(source_root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden_entry(entry));

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let dir = entry.path();

            let files = direct_files(dir)?;
            if files.is_empty() {
                // No direct files: no remote folder is created for this
                // directory, but its subdirectories are still visited.
                debug!(dir = ?dir, "no direct files, skipping");
                continue;
            }
            stats.directories += 1;

            let relative = dir
                .strip_prefix(source_root)
                .map_err(|_| UploadError::InvalidPath(dir.to_path_buf()))?;
            let folder_id = resolver.resolve_path(&self.root_folder, relative).await?;

            let dest_dir = dest_root.join(relative);
            tokio::fs::create_dir_all(&dest_dir).await?;

            let remote_names = dedupe::remote_file_names(self.store.as_ref(), &folder_id).await?;
            let candidates = dedupe::candidate_files(&files, &remote_names);
            stats.skipped_existing += files.len() - candidates.len();
            debug!(
                dir = ?dir,
                folder_id = %folder_id,
                local = files.len(),
                candidates = candidates.len(),
                "dispatching directory"
            );

            for name in candidates {
                let permit = match timeout(
                    self.permit_timeout,
                    Arc::clone(semaphore).acquire_owned(),
                )
                .await
                {
                    Ok(Ok(permit)) => permit,
                    Ok(Err(_)) => {
                        return Err(UploadError::Pool("upload semaphore closed".to_string()))
                    }
                    Err(_) => return Err(UploadError::PermitTimeout(self.permit_timeout)),
                };

                let task = UploadTask {
                    remote_folder: folder_id.clone(),
                    source: dir.join(&name),
                    dest_dir: dest_dir.clone(),
                };
                let store = Arc::clone(&self.store);
                let gauge = gauge.clone();
                stats.submitted += 1;
                pool.spawn(async move {
                    // Both guards live until the task ends, success or
                    // failure: the permit frees the slot, the gauge slot
                    // records the concurrency high-water mark.
                    let _permit = permit;
                    let _slot = gauge.enter();
                    uploader::run(store.as_ref(), &task).await.map_err(|e| {
                        UploadError::UploadFailure {
                            path: task.source.clone(),
                            source: Box::new(e),
                        }
                    })
                });
            }

            // Harvest whatever has already finished so the pool stays small.
            while let Some(joined) = pool.try_join_next() {
                record_outcome(joined, stats);
            }
        }

        Ok(())
    }
}

fn record_outcome(joined: Result<Result<(), UploadError>, JoinError>, stats: &mut RunStats) {
    match joined {
        Ok(Ok(())) => stats.uploaded += 1,
        Ok(Err(e)) => {
            stats.failed += 1;
            error!(error = %e, "upload failed");
        }
        Err(e) => {
            stats.failed += 1;
            error!(error = %e, "upload task panicked");
        }
    }
}

fn is_hidden_entry(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(dedupe::is_hidden)
        .unwrap_or(false)
}

/// Visible direct file names of `dir`, sorted for a stable submission order.
fn direct_files(dir: &Path) -> Result<Vec<String>, UploadError> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => {
                if !dedupe::is_hidden(&name) {
                    names.push(name);
                }
            }
            Err(raw) => {
                // The remote store needs a textual title; such a file can
                // never be uploaded, so it is reported and left alone.
                warn!(name = ?raw, dir = ?dir, "skipping file with non-UTF-8 name");
            }
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauge_tracks_the_high_water_mark() {
        let gauge = InFlightGauge::default();
        let a = gauge.enter();
        let b = gauge.enter();
        drop(a);
        let c = gauge.enter();
        drop(b);
        drop(c);
        assert_eq!(gauge.max(), 2);
    }

    #[test]
    fn direct_files_are_sorted_and_visible_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.mp4"), b"").unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"").unwrap();
        std::fs::write(dir.path().join(".hidden.mp4"), b"").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let files = direct_files(dir.path()).unwrap();
        assert_eq!(files, vec!["a.mp4".to_string(), "b.mp4".to_string()]);
    }
}

//! Remote directory resolution with per-run memoization.
//!
//! [`DirResolver`] maps relative local directory paths onto remote folder
//! identifiers, creating missing folders on demand. Lookups are memoized in a
//! [`ResolverCache`] scoped to one run; the cache is never invalidated, so
//! renames or deletions performed by other agents during a run are not
//! observed. That is a documented limitation of the tool, not something the
//! resolver tries to repair.

use crate::drive::{ChildFilter, RemoteStore, ROOT_ALIAS};
use crate::error::UploadError;
use crate::types::ResourceId;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Memo of resolved `(parent, name)` lookups, scoped to one run.
///
/// Owned by the resolver and injectable for tests. Only ever touched from the
/// dispatcher's single-threaded control path, so no locking is needed.
#[derive(Debug, Default)]
pub struct ResolverCache {
    entries: HashMap<(ResourceId, String), ResourceId>,
    hits: u64,
    misses: u64,
}

impl ResolverCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&mut self, parent: &str, name: &str) -> Option<ResourceId> {
        let found = self
            .entries
            .get(&(parent.to_string(), name.to_string()))
            .cloned();
        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    fn insert(&mut self, parent: &str, name: &str, id: ResourceId) {
        self.entries
            .insert((parent.to_string(), name.to_string()), id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

/// Resolves relative directory paths into remote folder identifiers.
pub struct DirResolver {
    store: Arc<dyn RemoteStore>,
    cache: ResolverCache,
}

impl DirResolver {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self::with_cache(store, ResolverCache::new())
    }

    pub fn with_cache(store: Arc<dyn RemoteStore>, cache: ResolverCache) -> Self {
        Self { store, cache }
    }

    pub fn cache(&self) -> &ResolverCache {
        &self.cache
    }

    /// Resolve a folder named `name` under `parent`, creating it if absent.
    ///
    /// `None` parent means the hierarchy root. Exactly one existing match is
    /// returned as-is; more than one is [`UploadError::AmbiguousResource`].
    pub async fn resolve_or_create(
        &mut self,
        parent: Option<&str>,
        name: &str,
    ) -> Result<ResourceId, UploadError> {
        let parent_id = parent.unwrap_or(ROOT_ALIAS);
        if let Some(id) = self.cache.lookup(parent_id, name) {
            return Ok(id);
        }

        let id = match self.find_folder(parent_id, name).await? {
            Some(id) => id,
            None => {
                debug!(parent_id = %parent_id, name = %name, "creating missing remote folder");
                self.store.create_folder(parent_id, name).await?.id
            }
        };
        self.cache.insert(parent_id, name, id.clone());
        Ok(id)
    }

    /// Resolve the well-known root folder, which must already exist.
    pub async fn resolve_root(&mut self, name: &str) -> Result<ResourceId, UploadError> {
        if let Some(id) = self.cache.lookup(ROOT_ALIAS, name) {
            return Ok(id);
        }
        let id = self
            .find_folder(ROOT_ALIAS, name)
            .await?
            .ok_or_else(|| UploadError::MissingRootFolder(name.to_string()))?;
        self.cache.insert(ROOT_ALIAS, name, id.clone());
        Ok(id)
    }

    /// Resolve `relative` under the root folder, creating every missing
    /// intermediate folder segment by segment.
    pub async fn resolve_path(
        &mut self,
        root_folder: &str,
        relative: &Path,
    ) -> Result<ResourceId, UploadError> {
        let mut current = self.resolve_root(root_folder).await?;
        for component in relative.components() {
            if let std::path::Component::Normal(segment) = component {
                let segment = segment
                    .to_str()
                    .ok_or_else(|| UploadError::InvalidPath(relative.to_path_buf()))?;
                current = self.resolve_or_create(Some(&current), segment).await?;
            }
        }
        Ok(current)
    }

    /// Single-name lookup, filtered to folder-typed, non-trashed resources so
    /// a plain file sharing the name never matches.
    async fn find_folder(
        &self,
        parent: &str,
        name: &str,
    ) -> Result<Option<ResourceId>, UploadError> {
        let matches = self
            .store
            .list_children(parent, &ChildFilter::folder_named(name))
            .await?;
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.into_iter().next().map(|m| m.id)),
            count => Err(UploadError::AmbiguousResource {
                parent: parent.to_string(),
                name: name.to_string(),
                count,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::{RemoteResource, ResourceKind};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Folder {
        id: String,
        name: String,
        parent: String,
    }

    /// In-memory folder hierarchy with call counters.
    #[derive(Default)]
    struct FakeStore {
        folders: Mutex<Vec<Folder>>,
        next_id: AtomicUsize,
        list_calls: AtomicUsize,
        create_calls: AtomicUsize,
    }

    impl FakeStore {
        fn seed(&self, parent: &str, name: &str) -> String {
            let id = format!("f{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            self.folders.lock().push(Folder {
                id: id.clone(),
                name: name.to_string(),
                parent: parent.to_string(),
            });
            id
        }
    }

    #[async_trait]
    impl RemoteStore for FakeStore {
        async fn list_children(
            &self,
            parent: &str,
            filter: &ChildFilter,
        ) -> Result<Vec<RemoteResource>, UploadError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(filter.kind, Some(ResourceKind::Folder));
            let folders = self.folders.lock();
            Ok(folders
                .iter()
                .filter(|f| {
                    f.parent == parent
                        && filter.name.as_deref().map_or(true, |n| n == f.name)
                })
                .map(|f| RemoteResource {
                    id: f.id.clone(),
                    name: f.name.clone(),
                    parent: Some(f.parent.clone()),
                })
                .collect())
        }

        async fn create_folder(
            &self,
            parent: &str,
            name: &str,
        ) -> Result<RemoteResource, UploadError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            let id = self.seed(parent, name);
            Ok(RemoteResource {
                id,
                name: name.to_string(),
                parent: Some(parent.to_string()),
            })
        }

        async fn upload_file(
            &self,
            _parent: &str,
            _name: &str,
            _source: &Path,
        ) -> Result<RemoteResource, UploadError> {
            unimplemented!("resolver tests never upload")
        }
    }

    fn resolver(store: &Arc<FakeStore>) -> DirResolver {
        DirResolver::new(Arc::clone(store) as Arc<dyn RemoteStore>)
    }

    #[tokio::test]
    async fn returns_existing_folder_without_creating() {
        let store = Arc::new(FakeStore::default());
        let existing = store.seed(ROOT_ALIAS, "Videos");
        let mut resolver = resolver(&store);

        let id = resolver.resolve_or_create(None, "Videos").await.unwrap();
        assert_eq!(id, existing);
        assert_eq!(store.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn creates_folder_when_absent() {
        let store = Arc::new(FakeStore::default());
        let mut resolver = resolver(&store);

        let id = resolver.resolve_or_create(None, "trip").await.unwrap();
        assert_eq!(store.create_calls.load(Ordering::SeqCst), 1);
        let folders = store.folders.lock();
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].id, id);
        assert_eq!(folders[0].parent, ROOT_ALIAS);
    }

    #[tokio::test]
    async fn duplicate_matches_are_ambiguous() {
        let store = Arc::new(FakeStore::default());
        store.seed(ROOT_ALIAS, "Videos");
        store.seed(ROOT_ALIAS, "Videos");
        let mut resolver = resolver(&store);

        let err = resolver.resolve_or_create(None, "Videos").await.unwrap_err();
        assert!(matches!(
            err,
            UploadError::AmbiguousResource { count: 2, .. }
        ));
    }

    #[tokio::test]
    async fn repeated_resolution_hits_the_cache() {
        let store = Arc::new(FakeStore::default());
        store.seed(ROOT_ALIAS, "Videos");
        let mut resolver = resolver(&store);

        let first = resolver.resolve_or_create(None, "Videos").await.unwrap();
        let second = resolver.resolve_or_create(None, "Videos").await.unwrap();
        assert_eq!(first, second);
        // One remote round trip total; the second call is answered from memo.
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.cache().hits(), 1);
        assert_eq!(resolver.cache().misses(), 1);
    }

    #[tokio::test]
    async fn created_folders_are_memoized_too() {
        let store = Arc::new(FakeStore::default());
        let mut resolver = resolver(&store);

        let first = resolver.resolve_or_create(None, "trip").await.unwrap();
        let second = resolver.resolve_or_create(None, "trip").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_root_is_fatal() {
        let store = Arc::new(FakeStore::default());
        let mut resolver = resolver(&store);

        let err = resolver.resolve_root("Videos").await.unwrap_err();
        assert!(matches!(err, UploadError::MissingRootFolder(name) if name == "Videos"));
    }

    #[tokio::test]
    async fn resolve_path_creates_each_missing_segment_in_order() {
        let store = Arc::new(FakeStore::default());
        let root = store.seed(ROOT_ALIAS, "Videos");
        let mut resolver = resolver(&store);

        let leaf = resolver
            .resolve_path("Videos", &PathBuf::from("2024/trip"))
            .await
            .unwrap();

        let folders = store.folders.lock();
        let year = folders.iter().find(|f| f.name == "2024").unwrap();
        let trip = folders.iter().find(|f| f.name == "trip").unwrap();
        assert_eq!(year.parent, root);
        assert_eq!(trip.parent, year.id);
        assert_eq!(leaf, trip.id);
    }

    #[tokio::test]
    async fn resolve_path_of_empty_relative_is_the_root() {
        let store = Arc::new(FakeStore::default());
        let root = store.seed(ROOT_ALIAS, "Videos");
        let mut resolver = resolver(&store);

        let id = resolver
            .resolve_path("Videos", Path::new(""))
            .await
            .unwrap();
        assert_eq!(id, root);
        assert_eq!(store.create_calls.load(Ordering::SeqCst), 0);
    }
}

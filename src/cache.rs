//! Persistent content-addressed cache of file revisions
//!
//! Layout: `<root>/<repository>/<revision>/<relative path>`, each file holding
//! the raw bytes of that path at that revision. Downstream consumers rebuild
//! locations from the same three components, so the layout is stable.

use crate::error::{CacheError, ScrapeError};
use crate::git::Repository;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;

/// Write-once store of file contents keyed by (repository, revision, path)
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic location of a cache entry
    pub fn location(
        &self,
        repo_name: &str,
        revision: &str,
        file_path: &str,
    ) -> Result<PathBuf, CacheError> {
        ensure_single_component(repo_name)?;
        ensure_single_component(revision)?;
        ensure_relative(file_path)?;

        Ok(self.root.join(repo_name).join(revision).join(file_path))
    }

    /// Whether an entry has already been written
    pub fn contains(
        &self,
        repo_name: &str,
        revision: &str,
        file_path: &str,
    ) -> Result<bool, CacheError> {
        Ok(self.location(repo_name, revision, file_path)?.is_file())
    }

    /// Return the cached location of `file_path` at `revision`, fetching it first if needed
    ///
    /// Existing entries are returned without touching the repository. New
    /// entries are written to a temporary file beside the destination and
    /// renamed into place, so a location that exists is always complete.
    pub fn ensure_cached<R>(
        &self,
        repo: &R,
        repo_name: &str,
        revision: &str,
        file_path: &str,
    ) -> Result<PathBuf, ScrapeError>
    where
        R: Repository + ?Sized,
    {
        let location = self.location(repo_name, revision, file_path)?;

        if location.is_file() {
            tracing::debug!("Cache hit: {}", location.display());
            return Ok(location);
        }

        let content = repo.show(revision, file_path)?;
        self.write_atomic(&location, &content)?;

        tracing::debug!(
            "Cached {} bytes of {}@{} at {}",
            content.len(),
            file_path,
            revision,
            location.display()
        );
        Ok(location)
    }

    fn write_atomic(&self, location: &Path, content: &[u8]) -> Result<(), CacheError> {
        let parent = location
            .parent()
            .ok_or_else(|| CacheError::InvalidKey(location.display().to_string()))?;

        fs::create_dir_all(parent).map_err(|e| {
            CacheError::DirectoryCreationFailed(format!("{}: {}", parent.display(), e))
        })?;

        let write_failed = |e: std::io::Error| CacheError::WriteFailed {
            path: location.display().to_string(),
            reason: e.to_string(),
        };

        let mut staged = NamedTempFile::new_in(parent).map_err(write_failed)?;
        staged.write_all(content).map_err(write_failed)?;
        staged.as_file().sync_all().map_err(write_failed)?;
        staged.persist(location).map_err(|e| write_failed(e.error))?;

        Ok(())
    }
}

/// Reject anything that is not exactly one plain path segment
pub(crate) fn ensure_single_component(value: &str) -> Result<(), CacheError> {
    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(CacheError::InvalidKey(value.to_string())),
    }
}

/// Reject absolute paths and anything that could climb out of the entry directory
fn ensure_relative(value: &str) -> Result<(), CacheError> {
    let path = Path::new(value);
    let all_normal = path
        .components()
        .all(|component| matches!(component, Component::Normal(_)));

    if value.is_empty() || !all_normal {
        return Err(CacheError::InvalidKey(value.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GitError;
    use crate::git::fake::{FakeHistory, FakeRepository};
    use tempfile::TempDir;

    fn repo_with_metrics() -> (FakeRepository, String, String) {
        let mut history = FakeHistory::default();
        let rev1 = history.commit(100, &[("app/metrics.yaml", b"first\n")]);
        let rev2 = history.commit(200, &[("app/metrics.yaml", b"second\r\n\xff")]);
        (FakeRepository::new(history, Path::new(".")), rev1, rev2)
    }

    #[test]
    fn test_location_layout() {
        let store = ContentStore::new("/cache");
        let location = store.location("glean", "abc123", "app/metrics.yaml").unwrap();
        assert_eq!(location, PathBuf::from("/cache/glean/abc123/app/metrics.yaml"));
    }

    #[test]
    fn test_location_rejects_escaping_keys() {
        let store = ContentStore::new("/cache");
        assert!(store.location("..", "abc", "a.yaml").is_err());
        assert!(store.location("a/b", "abc", "a.yaml").is_err());
        assert!(store.location("glean", "", "a.yaml").is_err());
        assert!(store.location("glean", "abc", "../a.yaml").is_err());
        assert!(store.location("glean", "abc", "/etc/passwd").is_err());
        assert!(store.location("glean", "abc", "").is_err());
        assert!(store.location("glean", "abc", "./a.yaml").is_err());
    }

    #[test]
    fn test_ensure_cached_writes_exact_bytes() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let (repo, _, rev2) = repo_with_metrics();

        let location = store
            .ensure_cached(&repo, "glean", &rev2, "app/metrics.yaml")
            .unwrap();

        assert_eq!(
            location,
            dir.path().join("glean").join(&rev2).join("app/metrics.yaml")
        );
        assert_eq!(fs::read(&location).unwrap(), b"second\r\n\xff");
        assert!(store.contains("glean", &rev2, "app/metrics.yaml").unwrap());
    }

    #[test]
    fn test_ensure_cached_fetches_at_most_once() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let (repo, rev1, _) = repo_with_metrics();
        let stats = repo.stats();

        let first = store
            .ensure_cached(&repo, "glean", &rev1, "app/metrics.yaml")
            .unwrap();
        let bytes = fs::read(&first).unwrap();
        let second = store
            .ensure_cached(&repo, "glean", &rev1, "app/metrics.yaml")
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(fs::read(&second).unwrap(), bytes);
        assert_eq!(stats.show_count(), 1);
    }

    #[test]
    fn test_existing_entry_is_never_rewritten() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let (repo, rev1, _) = repo_with_metrics();
        let location = store.location("glean", &rev1, "app/metrics.yaml").unwrap();
        fs::create_dir_all(location.parent().unwrap()).unwrap();
        fs::write(&location, b"seeded").unwrap();

        store
            .ensure_cached(&repo, "glean", &rev1, "app/metrics.yaml")
            .unwrap();

        assert_eq!(fs::read(&location).unwrap(), b"seeded");
        assert_eq!(repo.stats().show_count(), 0);
    }

    #[test]
    fn test_retrieval_failure_leaves_no_entry() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let (repo, rev1, _) = repo_with_metrics();

        let result = store.ensure_cached(&repo, "glean", &rev1, "missing.yaml");

        assert!(matches!(
            result,
            Err(ScrapeError::Git(GitError::ContentRetrievalFailed { .. }))
        ));
        assert!(!store.contains("glean", &rev1, "missing.yaml").unwrap());
        assert!(!dir.path().join("glean").exists());
    }

    #[test]
    fn test_no_staging_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let (repo, rev1, _) = repo_with_metrics();

        let location = store
            .ensure_cached(&repo, "glean", &rev1, "app/metrics.yaml")
            .unwrap();

        let entries: Vec<_> = fs::read_dir(location.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("metrics.yaml")]);
    }
}

//! In-memory repository used by unit tests

use super::backend::{Repository, RepositoryBackend};
use crate::error::GitError;
use crate::types::Revision;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct FakeCommit {
    revision: Revision,
    files: HashMap<String, Vec<u8>>,
}

/// Linear commit history, oldest first
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeHistory {
    commits: Vec<FakeCommit>,
}

impl FakeHistory {
    /// Commit `files` on top of the previous snapshot and return the new id
    pub fn commit(&mut self, timestamp: i64, files: &[(&str, &[u8])]) -> String {
        let mut snapshot = self
            .commits
            .last()
            .map(|c| c.files.clone())
            .unwrap_or_default();
        for (path, content) in files {
            snapshot.insert(path.to_string(), content.to_vec());
        }
        self.push(timestamp, snapshot)
    }

    /// Commit the deletion of `path` and return the new id
    pub fn remove(&mut self, timestamp: i64, path: &str) -> String {
        let mut snapshot = self
            .commits
            .last()
            .map(|c| c.files.clone())
            .unwrap_or_default();
        snapshot.remove(path);
        self.push(timestamp, snapshot)
    }

    fn push(&mut self, timestamp: i64, files: HashMap<String, Vec<u8>>) -> String {
        let id = format!("{:040x}", self.commits.len() + 1);
        self.commits.push(FakeCommit {
            revision: Revision::new(id.clone(), timestamp),
            files,
        });
        id
    }

    fn find(&self, revision: &str) -> Option<&FakeCommit> {
        self.commits.iter().find(|c| c.revision.id == revision)
    }
}

/// Counters shared by every clone handed out by one [`FakeBackend`]
#[derive(Debug, Default)]
pub(crate) struct FakeStats {
    pub shows: AtomicUsize,
    pub restores: AtomicUsize,
    pub checkouts: Mutex<Vec<String>>,
}

impl FakeStats {
    pub fn show_count(&self) -> usize {
        self.shows.load(Ordering::SeqCst)
    }

    pub fn checkouts(&self) -> Vec<String> {
        self.checkouts.lock().unwrap().clone()
    }
}

pub(crate) struct FakeRepository {
    history: FakeHistory,
    workdir: PathBuf,
    stats: Arc<FakeStats>,
}

impl FakeRepository {
    pub fn new(history: FakeHistory, workdir: &Path) -> Self {
        Self {
            history,
            workdir: workdir.to_path_buf(),
            stats: Arc::new(FakeStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<FakeStats> {
        Arc::clone(&self.stats)
    }

    fn write_tree(&self, commit: &FakeCommit) -> Result<(), GitError> {
        let materialize_failed = |e: std::io::Error| GitError::MaterializationFailed {
            revision: commit.revision.id.clone(),
            reason: e.to_string(),
        };

        for entry in std::fs::read_dir(&self.workdir).map_err(materialize_failed)? {
            let path = entry.map_err(materialize_failed)?.path();
            if path.is_dir() {
                std::fs::remove_dir_all(&path).map_err(materialize_failed)?;
            } else {
                std::fs::remove_file(&path).map_err(materialize_failed)?;
            }
        }
        for (path, content) in &commit.files {
            let full_path = self.workdir.join(path);
            if let Some(parent) = full_path.parent() {
                std::fs::create_dir_all(parent).map_err(materialize_failed)?;
            }
            std::fs::write(full_path, content).map_err(materialize_failed)?;
        }
        Ok(())
    }
}

impl Repository for FakeRepository {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn head(&self) -> Result<Revision, GitError> {
        self.history
            .commits
            .last()
            .map(|c| c.revision.clone())
            .ok_or_else(|| GitError::HistoryQueryFailed {
                path: "HEAD".to_string(),
                reason: "empty history".to_string(),
            })
    }

    fn log(&self, path: &str) -> Result<Vec<Revision>, GitError> {
        let mut revisions = Vec::new();
        let mut previous: Option<&Vec<u8>> = None;
        for commit in &self.history.commits {
            let current = commit.files.get(path);
            if current != previous {
                revisions.push(commit.revision.clone());
            }
            previous = current;
        }
        revisions.reverse();
        Ok(revisions)
    }

    fn show(&self, revision: &str, path: &str) -> Result<Vec<u8>, GitError> {
        self.stats.shows.fetch_add(1, Ordering::SeqCst);
        self.history
            .find(revision)
            .and_then(|c| c.files.get(path))
            .cloned()
            .ok_or_else(|| GitError::ContentRetrievalFailed {
                revision: revision.to_string(),
                path: path.to_string(),
                reason: "not found".to_string(),
            })
    }

    fn checkout(&mut self, revision: &str) -> Result<(), GitError> {
        let commit = self
            .history
            .find(revision)
            .ok_or_else(|| GitError::InvalidRevision(revision.to_string()))?;
        self.write_tree(commit)?;
        self.stats
            .checkouts
            .lock()
            .unwrap()
            .push(revision.to_string());
        Ok(())
    }

    fn restore_head(&mut self) -> Result<(), GitError> {
        if let Some(head) = self.history.commits.last() {
            self.write_tree(head)?;
        }
        self.stats.restores.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Backend that "clones" a fixed history into a fresh directory
pub(crate) struct FakeBackend {
    pub history: FakeHistory,
    pub stats: Arc<FakeStats>,
    pub fail_clone: bool,
}

impl FakeBackend {
    pub fn new(history: FakeHistory) -> Self {
        Self {
            history,
            stats: Arc::new(FakeStats::default()),
            fail_clone: false,
        }
    }
}

impl RepositoryBackend for FakeBackend {
    type Repo = FakeRepository;

    fn clone_repository(&self, url: &str, dest: &Path) -> Result<FakeRepository, GitError> {
        let clone_failed = |reason: String| GitError::CloneFailed {
            url: url.to_string(),
            reason,
        };

        std::fs::create_dir_all(dest).map_err(|e| clone_failed(e.to_string()))?;
        if self.fail_clone {
            return Err(clone_failed("repository not found".to_string()));
        }

        let repo = FakeRepository {
            history: self.history.clone(),
            workdir: dest.to_path_buf(),
            stats: Arc::clone(&self.stats),
        };
        if let Some(head) = self.history.commits.last() {
            repo.write_tree(head)?;
        }
        Ok(repo)
    }
}

// Shared fixtures for integration tests
#![allow(dead_code)]

use git2::{Oid, Repository, Signature, Time};
use history_scraper::config::Config;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Git repository used as the clone source
pub struct SourceRepo {
    pub dir: TempDir,
    pub repo: Repository,
}

impl SourceRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();

        Self { dir, repo }
    }

    /// Clone URL of this repository
    pub fn url(&self) -> String {
        self.dir.path().to_string_lossy().into_owned()
    }

    /// Write `files` and commit them at `timestamp`, returning the commit id
    pub fn commit(&self, files: &[(&str, &[u8])], timestamp: i64) -> String {
        let mut index = self.repo.index().unwrap();

        for (path, content) in files {
            let full_path = self.dir.path().join(path);
            if let Some(parent) = full_path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(&full_path, content).unwrap();
            index.add_path(Path::new(path)).unwrap();
        }

        self.write_commit(&mut index, timestamp).to_string()
    }

    /// Delete `path` and commit at `timestamp`
    pub fn remove(&self, path: &str, timestamp: i64) -> String {
        let mut index = self.repo.index().unwrap();
        std::fs::remove_file(self.dir.path().join(path)).unwrap();
        index.remove_path(Path::new(path)).unwrap();

        self.write_commit(&mut index, timestamp).to_string()
    }

    fn write_commit(&self, index: &mut git2::Index, timestamp: i64) -> Oid {
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = self.repo.find_tree(tree_id).unwrap();

        let time = Time::new(timestamp, 0);
        let sig = Signature::new("Test User", "test@example.com", &time).unwrap();
        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, "commit", &tree, &parents)
            .unwrap()
    }
}

/// Scratch cache and checkout roots
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn cache_root(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    pub fn checkout_root(&self) -> PathBuf {
        self.dir.path().join("checkouts")
    }

    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.cache.root = self.cache_root();
        config.checkout.root = self.checkout_root();
        config
    }

    /// Entries left in the checkout root, ignoring the lock directory
    pub fn leftover_checkouts(&self) -> Vec<String> {
        match std::fs::read_dir(self.checkout_root()) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .filter(|name| name != ".locks")
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Epoch seconds for a UTC calendar date at midnight
pub fn utc_date(year: i32, month: u32, day: u32) -> i64 {
    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
        .timestamp()
}

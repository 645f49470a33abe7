use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Static description of one repository to scrape
///
/// Supplied by the caller and never mutated while scraping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    /// Stable identity key; also names the clone directory and the cache subtree
    pub name: String,

    /// Clone URL (remote URL or local path)
    pub url: String,

    /// Files whose every historical revision is cached, in processing order
    #[serde(default)]
    pub change_files: Vec<String>,

    /// Manifest files whose revisions are parsed into dependency records
    #[serde(default)]
    pub dependency_files: Vec<String>,

    /// Manifest format; dependency extraction is skipped when unset
    #[serde(default)]
    pub dependency_format: Option<String>,

    /// Revisions committed strictly before this instant (epoch seconds, UTC) are ignored
    #[serde(default)]
    pub min_inclusion_timestamp: Option<i64>,

    /// Addresses that receive failure notifications for this repository
    #[serde(default)]
    pub notification_emails: Vec<String>,
}

impl RepositoryDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            change_files: Vec::new(),
            dependency_files: Vec::new(),
            dependency_format: None,
            min_inclusion_timestamp: None,
            notification_emails: Vec::new(),
        }
    }

    pub fn with_change_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.change_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_dependencies<I, S>(mut self, format: impl Into<String>, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependency_format = Some(format.into());
        self.dependency_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_min_inclusion_timestamp(mut self, timestamp: i64) -> Self {
        self.min_inclusion_timestamp = Some(timestamp);
        self
    }

    pub fn with_notification_emails<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.notification_emails = addresses.into_iter().map(Into::into).collect();
        self
    }
}

/// A commit that touched a file, with its committer timestamp
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Revision {
    /// Full commit SHA (40 hex characters)
    pub id: String,
    /// Committer time, seconds since the Unix epoch (UTC)
    pub timestamp: i64,
}

impl Revision {
    pub fn new(id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            timestamp,
        }
    }
}

/// Parsed dependency manifest at one revision, opaque to the scraper
pub type DependencyRecord = serde_json::Value;

/// Everything extracted from one repository in a single scrape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    /// Revision id -> commit timestamp
    pub timestamps: HashMap<String, i64>,
    /// Revision id -> cached file locations, in tracked-file order
    pub files: HashMap<String, Vec<PathBuf>>,
    /// Revision id -> parsed dependency manifest
    pub dependencies: HashMap<String, DependencyRecord>,
}

impl ScrapeResult {
    /// Number of distinct revisions with cached content
    pub fn commit_count(&self) -> usize {
        self.files.len()
    }
}

/// A single failure report destined for a repository's owners
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub subject: String,
    pub message: String,
}

/// Notifications raised for one repository, with who should receive them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub addresses: Vec<String>,
    pub notifications: Vec<Notification>,
}

impl NotificationRecord {
    pub fn new(addresses: Vec<String>) -> Self {
        Self {
            addresses,
            notifications: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }
}

/// Aggregated output of a batch scrape, keyed by repository name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutput {
    pub timestamps: HashMap<String, HashMap<String, i64>>,
    pub files: HashMap<String, HashMap<String, Vec<PathBuf>>>,
    pub dependencies: HashMap<String, HashMap<String, DependencyRecord>>,
    pub notifications: HashMap<String, NotificationRecord>,
}

impl BatchOutput {
    /// Store a successful repository scrape under its name
    pub fn insert(&mut self, name: &str, result: ScrapeResult) {
        self.timestamps.insert(name.to_string(), result.timestamps);
        self.files.insert(name.to_string(), result.files);
        self.dependencies.insert(name.to_string(), result.dependencies);
    }

    /// Whether any repository produced a notification
    pub fn has_failures(&self) -> bool {
        self.notifications.values().any(|record| !record.is_empty())
    }
}

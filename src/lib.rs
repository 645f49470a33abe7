//! # History Scraper - Historical file extraction for git repositories
//!
//! Clones git repositories, finds every commit that changed a set of tracked
//! files, and stores the exact bytes of each file at each of those commits in
//! a persistent on-disk cache. Dependency manifests can additionally be parsed
//! at each revision that touched them.
//!
//! ## Overview
//!
//! Scraping a repository yields three maps keyed by revision id: commit
//! timestamps, cached file locations, and parsed dependency records. A batch
//! run collects these per repository together with any failure notifications.
//!
//! ## Architecture
//!
//! ```text
//! BatchScraper
//!      │  one descriptor at a time
//!      ▼
//! RepositoryScraper ── LocalClone (locked, removed on drop)
//!      │
//!      ├── enumerate_revisions ── Repository::log / head
//!      ├── ContentStore ───────── Repository::show
//!      └── extract_dependencies ─ WorkingTree ── ManifestParser
//! ```
//!
//! The cache layout is `<root>/<repository>/<revision>/<path>`. Entries are
//! written once and never rewritten, so repeated runs only read what is new.
//!
//! ## Modules
//!
//! - [`scraper`]: per-repository orchestration and batch runs
//! - [`git`]: repository backend traits, the git2 backend, revision enumeration
//! - [`cache`]: the persistent content store
//! - [`dependencies`]: manifest parsers and working tree materialization
//! - [`config`]: configuration management with environment variable support
//! - [`types`]: descriptors, revisions and result types
//! - [`error`]: error types
//! - [`paths`]: platform directories
//!
//! ## Usage Example
//!
//! ```no_run
//! use history_scraper::{BatchScraper, Config, RepositoryDescriptor};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::new()?;
//!     let batch = BatchScraper::from_config(&config)?;
//!
//!     let repos = vec![
//!         RepositoryDescriptor::new("glean", "https://github.com/mozilla/glean")
//!             .with_change_files(["glean-core/metrics.yaml"]),
//!     ];
//!     let output = batch.scrape(&repos)?;
//!
//!     for (name, files) in &output.files {
//!         println!("{}: {} revisions", name, files.len());
//!     }
//!     Ok(())
//! }
//! ```

/// Persistent content-addressed cache of file revisions
pub mod cache;

/// Configuration management with environment variable overrides
pub mod config;

/// Dependency manifest parsing at historical revisions
pub mod dependencies;

/// Error types and utilities
pub mod error;

/// Repository backends and revision enumeration
pub mod git;

/// Platform-specific directories
pub mod paths;

/// Repository and batch scraping
pub mod scraper;

/// Descriptors, revisions and scrape results
pub mod types;

pub use cache::ContentStore;
pub use config::{Config, FailurePolicy};
pub use dependencies::{ManifestParser, ManifestParsers};
pub use error::ScrapeError;
pub use git::{Git2Backend, GitRepository, Repository, RepositoryBackend};
pub use scraper::{BatchScraper, RepositoryScraper};
pub use types::{
    BatchOutput, DependencyRecord, Notification, NotificationRecord, RepositoryDescriptor,
    Revision, ScrapeResult,
};

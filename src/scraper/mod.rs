//! Per-repository and batch scraping
//!
//! [`RepositoryScraper`] owns one clone at a time: it clones, caches every
//! revision of the tracked files, parses dependency manifests, and removes the
//! clone again whatever happens. [`BatchScraper`] runs it over a list of
//! repositories and gathers the results.

mod batch;
mod local_clone;

pub use batch::BatchScraper;
pub use local_clone::LocalClone;

use crate::cache::ContentStore;
use crate::config::Config;
use crate::dependencies::{ManifestParser, ManifestParsers, extract_dependencies};
use crate::error::ScrapeError;
use crate::git::{Git2Backend, RepositoryBackend, enumerate_revisions, enumerate_revisions_for_all};
use crate::types::{RepositoryDescriptor, Revision, ScrapeResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Scrapes the history of one repository at a time
pub struct RepositoryScraper<B: RepositoryBackend = Git2Backend> {
    backend: B,
    store: ContentStore,
    checkout_root: PathBuf,
    min_dates: HashMap<String, i64>,
    parsers: ManifestParsers,
}

impl RepositoryScraper<Git2Backend> {
    /// Build a git2-backed scraper from configuration
    pub fn from_config(config: &Config) -> Result<Self, ScrapeError> {
        config.validate()?;

        let min_dates = config
            .min_dates
            .keys()
            .filter_map(|name| {
                config
                    .min_inclusion_timestamp(name)
                    .map(|ts| (name.clone(), ts))
            })
            .collect();

        Ok(Self::new(
            Git2Backend,
            ContentStore::new(&config.cache.root),
            &config.checkout.root,
        )
        .with_min_dates(min_dates))
    }
}

impl<B: RepositoryBackend> RepositoryScraper<B> {
    pub fn new(backend: B, store: ContentStore, checkout_root: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            store,
            checkout_root: checkout_root.into(),
            min_dates: HashMap::new(),
            parsers: ManifestParsers::new(),
        }
    }

    /// Cutoffs (epoch seconds) for repositories whose descriptor sets none
    pub fn with_min_dates(mut self, min_dates: HashMap<String, i64>) -> Self {
        self.min_dates = min_dates;
        self
    }

    /// Register the parser used for descriptors declaring `format`
    pub fn with_parser(
        mut self,
        format: impl Into<String>,
        parser: impl ManifestParser + 'static,
    ) -> Self {
        self.parsers.register(format, parser);
        self
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn parsers(&self) -> &ManifestParsers {
        &self.parsers
    }

    /// Directory a repository is cloned into while it is being scraped
    pub fn clone_path(&self, name: &str) -> PathBuf {
        self.checkout_root.join(name)
    }

    pub fn checkout_root(&self) -> &Path {
        &self.checkout_root
    }

    /// Earliest commit timestamp kept for `descriptor`
    ///
    /// The descriptor's own value wins over the configured table.
    pub fn min_inclusion_timestamp(&self, descriptor: &RepositoryDescriptor) -> Option<i64> {
        descriptor
            .min_inclusion_timestamp
            .or_else(|| self.min_dates.get(&descriptor.name).copied())
    }

    /// Clone `descriptor` and extract its file and dependency history
    ///
    /// The clone directory is gone when this returns, on success or failure.
    /// Cache entries written before a failure stay on disk.
    pub fn scrape_one(
        &self,
        descriptor: &RepositoryDescriptor,
    ) -> Result<ScrapeResult, ScrapeError> {
        let clone = LocalClone::acquire(&self.checkout_root, &descriptor.name)?;

        tracing::info!("Cloning {} into {}", descriptor.url, clone.path().display());
        let mut repo = self
            .backend
            .clone_repository(&descriptor.url, clone.path())?;

        let min_timestamp = self.min_inclusion_timestamp(descriptor);
        let mut result = ScrapeResult::default();

        tracing::info!("Getting commits for repository {}", descriptor.name);
        self.extract_files(&repo, descriptor, min_timestamp, &mut result)?;
        self.extract_dependency_records(&mut repo, descriptor, min_timestamp, &mut result)?;
        tracing::info!("Got {} commits", result.commit_count());

        // The working tree lives inside the clone directory
        drop(repo);
        drop(clone);

        Ok(result)
    }

    fn extract_files(
        &self,
        repo: &B::Repo,
        descriptor: &RepositoryDescriptor,
        min_timestamp: Option<i64>,
        result: &mut ScrapeResult,
    ) -> Result<(), ScrapeError> {
        for file in &descriptor.change_files {
            for revision in enumerate_revisions(repo, file)? {
                if !is_included(&revision, min_timestamp) {
                    continue;
                }

                let location = self
                    .store
                    .ensure_cached(repo, &descriptor.name, &revision.id, file)?;
                result
                    .files
                    .entry(revision.id.clone())
                    .or_default()
                    .push(location);
                result.timestamps.insert(revision.id, revision.timestamp);
            }
        }
        Ok(())
    }

    fn extract_dependency_records(
        &self,
        repo: &mut B::Repo,
        descriptor: &RepositoryDescriptor,
        min_timestamp: Option<i64>,
        result: &mut ScrapeResult,
    ) -> Result<(), ScrapeError> {
        let Some(format) = descriptor.dependency_format.as_deref() else {
            return Ok(());
        };
        let parser = self.parsers.get(format)?;

        let revisions: Vec<Revision> =
            enumerate_revisions_for_all(&*repo, &descriptor.dependency_files)?
                .into_iter()
                .filter(|revision| is_included(revision, min_timestamp))
                .collect();

        tracing::debug!(
            "Extracting {} dependencies at {} revisions of {}",
            format,
            revisions.len(),
            descriptor.name
        );

        for revision in revisions {
            let record = extract_dependencies(repo, &revision, descriptor, parser)?;
            result.dependencies.insert(revision.id, record);
        }
        Ok(())
    }
}

impl<B: RepositoryBackend> std::fmt::Debug for RepositoryScraper<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryScraper")
            .field("store", &self.store)
            .field("checkout_root", &self.checkout_root)
            .field("min_dates", &self.min_dates)
            .field("parsers", &self.parsers)
            .finish()
    }
}

/// Revisions committed strictly before the cutoff are dropped
fn is_included(revision: &Revision, min_timestamp: Option<i64>) -> bool {
    min_timestamp.is_none_or(|min| revision.timestamp >= min)
}

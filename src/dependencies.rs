//! Dependency manifest extraction at historical revisions
//!
//! Unlike tracked files, manifests are not read straight from object storage:
//! format parsers expect a real checkout, so each revision is materialized
//! into the clone's working tree before the parser runs.

use crate::error::{GitError, ManifestError, ScrapeError};
use crate::git::Repository;
use crate::types::{DependencyRecord, RepositoryDescriptor, Revision};
use std::collections::HashMap;
use std::path::Path;

/// Turns a materialized working tree into a dependency record
pub trait ManifestParser: Send + Sync {
    /// Parse `files` (relative to `workdir`) of repository `repo_name`
    fn parse(
        &self,
        workdir: &Path,
        repo_name: &str,
        files: &[String],
    ) -> Result<DependencyRecord, ManifestError>;
}

/// Manifest parsers keyed by format name
#[derive(Default)]
pub struct ManifestParsers {
    parsers: HashMap<String, Box<dyn ManifestParser>>,
}

impl ManifestParsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `parser` for `format`, replacing any previous one
    pub fn register(
        &mut self,
        format: impl Into<String>,
        parser: impl ManifestParser + 'static,
    ) {
        self.parsers.insert(format.into(), Box::new(parser));
    }

    pub fn get(&self, format: &str) -> Result<&dyn ManifestParser, ManifestError> {
        self.parsers
            .get(format)
            .map(|parser| parser.as_ref())
            .ok_or_else(|| ManifestError::UnknownFormat(format.to_string()))
    }

    pub fn formats(&self) -> Vec<&str> {
        let mut formats: Vec<&str> = self.parsers.keys().map(String::as_str).collect();
        formats.sort_unstable();
        formats
    }
}

impl std::fmt::Debug for ManifestParsers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestParsers")
            .field("formats", &self.formats())
            .finish()
    }
}

/// Working tree checked out at a historical revision
///
/// Holds the clone mutably for its whole lifetime and puts HEAD back when
/// dropped, whether or not the parser succeeded.
pub struct WorkingTree<'a, R: Repository + ?Sized> {
    repo: &'a mut R,
    revision: String,
}

impl<'a, R: Repository + ?Sized> WorkingTree<'a, R> {
    pub fn materialize(repo: &'a mut R, revision: &str) -> Result<Self, GitError> {
        repo.checkout(revision)?;
        Ok(Self {
            repo,
            revision: revision.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        self.repo.workdir()
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }
}

impl<R: Repository + ?Sized> Drop for WorkingTree<'_, R> {
    fn drop(&mut self) {
        if let Err(e) = self.repo.restore_head() {
            tracing::warn!(
                "Failed to restore working tree after {}: {}",
                self.revision,
                e
            );
        }
    }
}

/// Parse the descriptor's dependency manifests as of `revision`
pub fn extract_dependencies<R>(
    repo: &mut R,
    revision: &Revision,
    descriptor: &RepositoryDescriptor,
    parser: &dyn ManifestParser,
) -> Result<DependencyRecord, ScrapeError>
where
    R: Repository + ?Sized,
{
    let tree = WorkingTree::materialize(repo, &revision.id)?;
    tracing::debug!(
        "Parsing dependencies of {} at {}",
        descriptor.name,
        tree.revision()
    );

    let record = parser.parse(tree.path(), &descriptor.name, &descriptor.dependency_files)?;
    Ok(record)
}

//! Git repository operations for history extraction
//!
//! The scraper only talks to repositories through the [`Repository`] and
//! [`RepositoryBackend`] traits, so any backend able to clone, query history,
//! read a file at a revision and check a revision out can be substituted.

/// Backend traits and the git2 implementation
pub mod backend;
/// Revision enumeration for tracked paths
pub mod history;

#[cfg(test)]
pub(crate) mod fake;

pub use backend::{Git2Backend, GitRepository, Repository, RepositoryBackend};
pub use history::{enumerate_revisions, enumerate_revisions_for_all};

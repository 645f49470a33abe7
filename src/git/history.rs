use super::backend::Repository;
use crate::error::GitError;
use crate::types::Revision;
use std::collections::HashSet;

/// Every revision at which `path` changed, anchored by the current HEAD
///
/// HEAD comes first even when it did not touch `path`, so the latest state of
/// the file is always represented. The remaining revisions follow in log
/// order (newest first). Each id appears once.
pub fn enumerate_revisions<R>(repo: &R, path: &str) -> Result<Vec<Revision>, GitError>
where
    R: Repository + ?Sized,
{
    let changes = repo.log(path)?;
    let head = repo.head()?;

    let mut seen = HashSet::new();
    let revisions: Vec<Revision> = std::iter::once(head)
        .chain(changes)
        .filter(|revision| seen.insert(revision.id.clone()))
        .collect();

    tracing::debug!("Found {} revisions for {}", revisions.len(), path);
    Ok(revisions)
}

/// Union of [`enumerate_revisions`] over several paths, in first-seen order
pub fn enumerate_revisions_for_all<R, S>(repo: &R, paths: &[S]) -> Result<Vec<Revision>, GitError>
where
    R: Repository + ?Sized,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut revisions = Vec::new();

    for path in paths {
        for revision in enumerate_revisions(repo, path.as_ref())? {
            if seen.insert(revision.id.clone()) {
                revisions.push(revision);
            }
        }
    }

    Ok(revisions)
}

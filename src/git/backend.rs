use crate::error::GitError;
use crate::types::Revision;
use git2::build::CheckoutBuilder;
use git2::{Commit, ErrorCode, Oid};
use std::collections::{BinaryHeap, HashSet};
use std::path::{Path, PathBuf};

/// A live local clone
///
/// History and content queries read object storage directly and take
/// `&self`. Checkouts rewrite the working tree and therefore take `&mut self`,
/// which keeps them from overlapping with anything else on the same clone.
pub trait Repository {
    /// Root of the working tree
    fn workdir(&self) -> &Path;

    /// Most recent commit of the checked-out branch
    fn head(&self) -> Result<Revision, GitError>;

    /// Commits that changed `path`, newest first
    fn log(&self, path: &str) -> Result<Vec<Revision>, GitError>;

    /// Exact bytes of `path` as of `revision`, without touching the working tree
    fn show(&self, revision: &str, path: &str) -> Result<Vec<u8>, GitError>;

    /// Replace the working tree with the contents of `revision`
    fn checkout(&mut self, revision: &str) -> Result<(), GitError>;

    /// Put the working tree back on the commit that was checked out at clone time
    fn restore_head(&mut self) -> Result<(), GitError>;
}

/// Creates local clones
pub trait RepositoryBackend {
    type Repo: Repository;

    /// Clone `url` into `dest`, which must not exist yet
    fn clone_repository(&self, url: &str, dest: &Path) -> Result<Self::Repo, GitError>;
}

/// libgit2-backed repository backend
#[derive(Debug, Clone, Copy, Default)]
pub struct Git2Backend;

impl RepositoryBackend for Git2Backend {
    type Repo = GitRepository;

    fn clone_repository(&self, url: &str, dest: &Path) -> Result<GitRepository, GitError> {
        tracing::debug!("Cloning {} into {}", url, dest.display());

        let repo = git2::Repository::clone(url, dest).map_err(|e| GitError::CloneFailed {
            url: url.to_string(),
            reason: e.message().to_string(),
        })?;

        GitRepository::from_repository(repo)
    }
}

/// A git2 repository with a working tree
pub struct GitRepository {
    repo: git2::Repository,
    workdir: PathBuf,
    original_head: Option<Oid>,
    original_ref: Option<String>,
}

impl GitRepository {
    /// Open an existing non-bare repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GitError> {
        let path = path.as_ref();
        let repo = git2::Repository::open(path)
            .map_err(|e| GitError::OpenFailed(format!("{}: {}", path.display(), e.message())))?;
        Self::from_repository(repo)
    }

    fn from_repository(repo: git2::Repository) -> Result<Self, GitError> {
        let workdir = repo
            .workdir()
            .ok_or_else(|| {
                GitError::OpenFailed(format!("{} has no working tree", repo.path().display()))
            })?
            .to_path_buf();

        // An empty clone has no HEAD commit yet; it can still be opened
        let (original_head, original_ref) = match repo.head() {
            Ok(head) => {
                let reference = if head.is_branch() {
                    head.name().map(str::to_string)
                } else {
                    None
                };
                let commit = head.peel_to_commit().map_err(|e| {
                    GitError::OpenFailed(format!("HEAD is not a commit: {}", e.message()))
                })?;
                (Some(commit.id()), reference)
            }
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                (None, None)
            }
            Err(e) => {
                return Err(GitError::OpenFailed(format!(
                    "Failed to resolve HEAD: {}",
                    e.message()
                )));
            }
        };

        tracing::info!("Opened git repository at: {}", workdir.display());

        Ok(Self {
            repo,
            workdir,
            original_head,
            original_ref,
        })
    }

    fn find_commit(&self, revision: &str) -> Result<Commit<'_>, git2::Error> {
        let oid = Oid::from_str(revision)?;
        self.repo.find_commit(oid)
    }

    fn force_checkout(&self, oid: Oid) -> Result<(), git2::Error> {
        let commit = self.repo.find_commit(oid)?;
        let mut checkout = CheckoutBuilder::new();
        checkout.force().remove_untracked(true);
        self.repo.checkout_tree(commit.as_object(), Some(&mut checkout))?;
        self.repo.set_head_detached(oid)
    }
}

/// Blob id of `path` in the commit's tree, or `None` if it is absent
fn entry_id(commit: &Commit<'_>, path: &Path) -> Result<Option<Oid>, git2::Error> {
    match commit.tree()?.get_path(path) {
        Ok(entry) => Ok(Some(entry.id())),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Which parents the history walk continues into after `commit`
enum Step<'r> {
    /// The commit changed the path; walk every parent
    Changed(Vec<Commit<'r>>),
    /// The commit matches this parent for the path; walk only that parent
    Same(Commit<'r>),
    /// Root commit without the path
    Absent,
}

/// Classify `commit` for `path` using git's default history simplification
///
/// A commit that matches one of its parents for the path is not a change, and
/// only the first such parent is followed. Side branches whose changes a merge
/// threw away are therefore never visited.
fn simplify<'r>(commit: &Commit<'r>, path: &Path) -> Result<Step<'r>, git2::Error> {
    let current = entry_id(commit, path)?;
    if commit.parent_count() == 0 {
        return Ok(if current.is_some() {
            Step::Changed(Vec::new())
        } else {
            Step::Absent
        });
    }

    let mut parents = Vec::with_capacity(commit.parent_count());
    for parent in commit.parents() {
        if entry_id(&parent, path)? == current {
            return Ok(Step::Same(parent));
        }
        parents.push(parent);
    }
    Ok(Step::Changed(parents))
}

fn revision_of(commit: &Commit<'_>) -> Revision {
    Revision::new(commit.id().to_string(), commit.time().seconds())
}

impl Repository for GitRepository {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn head(&self) -> Result<Revision, GitError> {
        let commit = self
            .repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .map_err(|e| GitError::HistoryQueryFailed {
                path: "HEAD".to_string(),
                reason: e.message().to_string(),
            })?;
        Ok(revision_of(&commit))
    }

    fn log(&self, path: &str) -> Result<Vec<Revision>, GitError> {
        let query_failed = |e: git2::Error| GitError::HistoryQueryFailed {
            path: path.to_string(),
            reason: e.message().to_string(),
        };

        let head = self
            .repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .map_err(query_failed)?;

        let target = Path::new(path);
        let mut revisions = Vec::new();
        let mut seen = HashSet::from([head.id()]);
        // Newest commit first, like `git log`
        let mut pending = BinaryHeap::from([(head.time().seconds(), head.id())]);

        while let Some((_, oid)) = pending.pop() {
            let commit = self.repo.find_commit(oid).map_err(query_failed)?;

            let next = match simplify(&commit, target).map_err(query_failed)? {
                Step::Changed(parents) => {
                    revisions.push(revision_of(&commit));
                    parents
                }
                Step::Same(parent) => vec![parent],
                Step::Absent => Vec::new(),
            };

            for parent in next {
                if seen.insert(parent.id()) {
                    pending.push((parent.time().seconds(), parent.id()));
                }
            }
        }

        Ok(revisions)
    }

    fn show(&self, revision: &str, path: &str) -> Result<Vec<u8>, GitError> {
        let retrieval_failed = |e: git2::Error| GitError::ContentRetrievalFailed {
            revision: revision.to_string(),
            path: path.to_string(),
            reason: e.message().to_string(),
        };

        let commit = self.find_commit(revision).map_err(retrieval_failed)?;
        let blob = commit
            .tree()
            .and_then(|tree| tree.get_path(Path::new(path)))
            .and_then(|entry| entry.to_object(&self.repo))
            .and_then(|object| object.peel_to_blob())
            .map_err(retrieval_failed)?;

        Ok(blob.content().to_vec())
    }

    fn checkout(&mut self, revision: &str) -> Result<(), GitError> {
        let oid =
            Oid::from_str(revision).map_err(|_| GitError::InvalidRevision(revision.to_string()))?;

        self.force_checkout(oid).map_err(|e| GitError::MaterializationFailed {
            revision: revision.to_string(),
            reason: e.message().to_string(),
        })?;

        tracing::debug!("Checked out {} in {}", revision, self.workdir.display());
        Ok(())
    }

    fn restore_head(&mut self) -> Result<(), GitError> {
        let Some(original_head) = self.original_head else {
            return Ok(());
        };
        let restore_failed = |e: git2::Error| GitError::MaterializationFailed {
            revision: original_head.to_string(),
            reason: e.message().to_string(),
        };

        self.force_checkout(original_head).map_err(restore_failed)?;
        if let Some(reference) = &self.original_ref {
            self.repo.set_head(reference).map_err(restore_failed)?;
        }
        Ok(())
    }
}

#![forbid(unsafe_code)]

use gw_core::{Classify, ErrorKind, Interrupted};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GitError {
    #[error("nothing to commit")]
    NothingToCommit,
    #[error("author identity is required")]
    IdentityRequired,
    #[error("push rejected (non-fast-forward)")]
    NonFastForward,
    #[error("push rejected: {0}")]
    PushRejected(String),
    #[error("remote rejected the credentials")]
    AuthenticationFailed,
    #[error("merge conflict in {} file(s)", files.len())]
    MergeConflict { files: Vec<String> },
    #[error("branch not found: {0}")]
    BranchNotFound(String),
    #[error("nothing to merge: head is already contained in base")]
    NothingToMerge,
    #[error("branches share no history")]
    UnrelatedHistories,
    #[error("repository not found: {0}")]
    RepositoryNotFound(String),
    #[error("repository already exists: {0}")]
    RepositoryAlreadyExists(String),
    #[error("merging from a different repository is not supported")]
    ForkNotSupported,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Interrupted(#[from] Interrupted),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("git operation failed: {0}")]
    Git(#[from] git2::Error),
}

impl GitError {
    pub fn is_merge_conflict(&self) -> bool {
        matches!(self, Self::MergeConflict { .. })
    }
}

impl Classify for GitError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NothingToCommit
            | Self::IdentityRequired
            | Self::NothingToMerge
            | Self::UnrelatedHistories => ErrorKind::PreconditionFailed,
            Self::NonFastForward
            | Self::PushRejected(_)
            | Self::MergeConflict { .. }
            | Self::RepositoryAlreadyExists(_) => ErrorKind::Conflict,
            Self::AuthenticationFailed => ErrorKind::AuthenticationFailed,
            Self::BranchNotFound(_) | Self::RepositoryNotFound(_) => ErrorKind::NotFound,
            Self::ForkNotSupported | Self::InvalidArgument(_) => ErrorKind::MalformedRequest,
            Self::Interrupted(interrupted) => interrupted.kind(),
            Self::Io(_) | Self::Git(_) => ErrorKind::Internal,
        }
    }

    /// A content conflict stays a conflict no matter how often it is retried;
    /// a rejected push may succeed once the caller has rebased.
    fn is_retryable(&self) -> bool {
        match self {
            Self::MergeConflict { .. } | Self::RepositoryAlreadyExists(_) => false,
            Self::PushRejected(_) => false,
            other => other.kind().is_retryable(),
        }
    }
}

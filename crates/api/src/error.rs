#![forbid(unsafe_code)]

use gw_core::model::UnsupportedParentError;
use gw_core::{Classify, ErrorKind, Interrupted};
use gw_gitrpc::GitError;
use gw_storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("forbidden")]
    Forbidden,
    #[error("authentication required")]
    NotAuthenticated,
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    #[error(transparent)]
    UnsupportedParent(#[from] UnsupportedParentError),
    #[error("internal error: {0}")]
    Internal(String),
    #[error(transparent)]
    Interrupted(#[from] Interrupted),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Git(#[from] GitError),
    /// The Git repository exists but its metadata row could not be written.
    #[error("repository {uid} was created but its metadata was not saved: {source}")]
    PartialFailure {
        uid: String,
        #[source]
        source: StoreError,
    },
}

impl ApiError {
    /// Maps a store miss onto the named resource; everything else passes through.
    pub(crate) fn from_store(err: StoreError, resource: &'static str) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound(resource),
            other => Self::Store(other),
        }
    }

    pub fn is_partial_failure(&self) -> bool {
        matches!(self, Self::PartialFailure { .. })
    }
}

impl Classify for ApiError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Forbidden => ErrorKind::Forbidden,
            Self::NotAuthenticated => ErrorKind::NotAuthenticated,
            Self::MalformedRequest(_) => ErrorKind::MalformedRequest,
            Self::UnsupportedParent(_) => ErrorKind::UnsupportedParent,
            Self::Internal(_) | Self::PartialFailure { .. } => ErrorKind::Internal,
            Self::Interrupted(err) => err.kind(),
            Self::Store(err) => err.kind(),
            Self::Git(err) => err.kind(),
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Store(err) => err.is_retryable(),
            Self::Git(err) => err.is_retryable(),
            Self::PartialFailure { .. } => false,
            other => other.kind().is_retryable(),
        }
    }
}

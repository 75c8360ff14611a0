#![forbid(unsafe_code)]

use gw_core::model::{ParentColumnsError, UnsupportedParentError};
use gw_core::{Classify, ErrorKind, Interrupted};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("RESET_REQUIRED: {0}")]
    ResetRequired(&'static str),
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    /// The conditional write matched no row: another writer advanced the
    /// version first (or the row is gone). Re-fetch and retry.
    #[error("version conflict (id={id}, expected_version={expected_version})")]
    Conflict { id: i64, expected_version: i64 },
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    #[error(transparent)]
    UnsupportedParent(#[from] UnsupportedParentError),
    #[error("corrupt row (table={table}, id={id}): {reason}")]
    CorruptRow {
        table: &'static str,
        id: i64,
        reason: String,
    },
    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ResetRequired(_) => "RESET_REQUIRED",
            other => other.kind().as_str(),
        }
    }
}

impl From<ParentColumnsError> for StoreError {
    fn from(value: ParentColumnsError) -> Self {
        Self::ConstraintViolation(value.to_string())
    }
}

impl Classify for StoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound => ErrorKind::NotFound,
            Self::Conflict { .. } | Self::AlreadyExists => ErrorKind::Conflict,
            Self::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
            Self::UnsupportedParent(_) => ErrorKind::UnsupportedParent,
            Self::InvalidInput(_) => ErrorKind::MalformedRequest,
            Self::Interrupted(interrupted) => interrupted.kind(),
            Self::Io(_) | Self::Sql(_) | Self::ResetRequired(_) | Self::CorruptRow { .. } => {
                ErrorKind::Internal
            }
        }
    }
}

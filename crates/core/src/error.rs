#![forbid(unsafe_code)]

use serde::Serialize;

/// Closed classification every error is mapped to before it leaves a crate
/// boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    NotAuthenticated,
    MalformedRequest,
    /// Optimistic-concurrency violation, non-fast-forward push or merge
    /// content conflict. Callers disambiguate by the error's origin.
    Conflict,
    ConstraintViolation,
    UnsupportedParent,
    /// The operation cannot proceed in the current repository state
    /// (nothing staged, nothing to merge, missing author identity).
    PreconditionFailed,
    Timeout,
    Cancelled,
    AuthenticationFailed,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Forbidden => "FORBIDDEN",
            Self::NotAuthenticated => "NOT_AUTHENTICATED",
            Self::MalformedRequest => "MALFORMED_REQUEST",
            Self::Conflict => "CONFLICT",
            Self::ConstraintViolation => "CONSTRAINT_VIOLATION",
            Self::UnsupportedParent => "UNSUPPORTED_PARENT",
            Self::PreconditionFailed => "PRECONDITION_FAILED",
            Self::Timeout => "TIMEOUT",
            Self::Cancelled => "CANCELLED",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::Internal => "INTERNAL",
        }
    }

    /// Whether a caller may retry the same request unchanged and expect a
    /// different outcome. `Conflict` is retryable only after a re-fetch,
    /// which the caller owns.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Conflict | Self::Timeout)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait Classify {
    fn kind(&self) -> ErrorKind;

    fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

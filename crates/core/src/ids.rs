#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// Storage identity of a Git repository. Stable for the lifetime of the
/// repository and independent of its (renamable) path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoUid(String);

impl RepoUid {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, RepoUidError> {
        let value = value.into();
        validate_repo_uid(&value)?;
        Ok(Self(value))
    }
}

impl std::fmt::Display for RepoUid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RepoUidError {
    Empty,
    TooLong,
    InvalidChar { ch: char, index: usize },
}

impl RepoUidError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "repository uid must not be empty",
            Self::TooLong => "repository uid is too long",
            Self::InvalidChar { .. } => "repository uid contains an invalid character",
        }
    }
}

// The uid becomes a directory name, so anything that could escape the repos
// root is refused.
fn validate_repo_uid(value: &str) -> Result<(), RepoUidError> {
    if value.is_empty() {
        return Err(RepoUidError::Empty);
    }
    if value.len() > 128 {
        return Err(RepoUidError::TooLong);
    }
    for (index, ch) in value.chars().enumerate() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_') {
            continue;
        }
        return Err(RepoUidError::InvalidChar { ch, index });
    }
    Ok(())
}

/// Normalized slash-separated path of a space or repository, e.g. `acme/web/site`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourcePath(String);

impl ResourcePath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn try_new(value: impl AsRef<str>) -> Result<Self, ResourcePathError> {
        let trimmed = value.as_ref().trim().trim_matches('/');
        if trimmed.is_empty() {
            return Err(ResourcePathError::Empty);
        }
        if trimmed.len() > 256 {
            return Err(ResourcePathError::TooLong);
        }
        let mut segments = Vec::new();
        for segment in trimmed.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(ResourcePathError::InvalidSegment);
            }
            if segment.chars().any(|c| c.is_control() || c.is_whitespace()) {
                return Err(ResourcePathError::InvalidSegment);
            }
            segments.push(segment);
        }
        Ok(Self(segments.join("/")))
    }

    /// Splits `a/b/c` into (`a/b`, `c`). A single-segment path has no parent.
    pub fn split_leaf(&self) -> (Option<&str>, &str) {
        match self.0.rsplit_once('/') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, self.0.as_str()),
        }
    }

    /// True when `self` is `other` or nested below it.
    pub fn is_within(&self, other: &str) -> bool {
        self.0 == other
            || (self.0.len() > other.len()
                && self.0.starts_with(other)
                && self.0.as_bytes()[other.len()] == b'/')
    }

    pub fn child(&self, name: &str) -> Result<Self, ResourcePathError> {
        Self::try_new(format!("{}/{}", self.0, name))
    }
}

impl std::fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourcePathError {
    Empty,
    TooLong,
    InvalidSegment,
}

impl ResourcePathError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "path must not be empty",
            Self::TooLong => "path is too long",
            Self::InvalidSegment => "path contains an invalid segment",
        }
    }
}

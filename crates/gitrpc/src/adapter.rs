#![forbid(unsafe_code)]

use super::{GitError, MergeOutput};
use gw_core::{Identity, RequestContext};
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CloneOptions {
    /// Branch to check out instead of the remote HEAD.
    pub branch: Option<String>,
    /// Shallow clone depth. `None` fetches full history.
    pub depth: Option<u32>,
    /// Copy every ref (`+refs/*:refs/*`) into a bare repository.
    pub mirror: bool,
    pub bare: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitOptions {
    pub author: Identity,
    /// Defaults to the author.
    pub committer: Option<Identity>,
    pub message: String,
    /// Seconds since the Unix epoch. Defaults to now.
    pub timestamp: Option<i64>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushOptions {
    /// Configured remote name, or a URL/path used as an anonymous remote.
    pub remote: String,
    pub branch: String,
    pub force: bool,
    pub credentials: Option<Credentials>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeOptions {
    pub base_branch: String,
    pub head_branch: String,
    /// Ref moved to the merge commit; `None` is a dry run.
    pub ref_to_update: Option<String>,
    /// Required when a merge commit is written.
    pub author: Option<Identity>,
    pub message: String,
}

/// Primitive Git operations a backend executes on behalf of the service.
pub trait GitAdapter: Send + Sync {
    fn init_repository(&self, ctx: &RequestContext, path: &Path, bare: bool)
    -> Result<(), GitError>;

    /// Points HEAD at `refs/heads/<branch>`, which may not exist yet.
    fn set_default_branch(
        &self,
        ctx: &RequestContext,
        repo_path: &Path,
        branch: &str,
    ) -> Result<(), GitError>;

    fn clone_repository(
        &self,
        ctx: &RequestContext,
        from: &str,
        to: &Path,
        opts: &CloneOptions,
    ) -> Result<(), GitError>;

    /// Stages `files` (relative to the work tree), or every change when `all`.
    fn add_files(
        &self,
        ctx: &RequestContext,
        repo_path: &Path,
        all: bool,
        files: &[&str],
    ) -> Result<(), GitError>;

    /// Commits the index onto HEAD and returns the new commit id.
    fn commit(
        &self,
        ctx: &RequestContext,
        repo_path: &Path,
        opts: &CommitOptions,
    ) -> Result<String, GitError>;

    fn push(&self, ctx: &RequestContext, repo_path: &Path, opts: &PushOptions)
    -> Result<(), GitError>;

    fn merge(
        &self,
        ctx: &RequestContext,
        repo_path: &Path,
        opts: &MergeOptions,
    ) -> Result<MergeOutput, GitError>;
}

#![forbid(unsafe_code)]

use gw_core::Identity;
use gw_core::ids::RepoUid;
use std::collections::BTreeMap;

/// Request-scoped bundle identifying which repository a mutation targets and
/// on whose behalf. Built once per request and never changed afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteParams {
    repo_uid: RepoUid,
    actor: Identity,
    env_vars: BTreeMap<String, String>,
}

impl WriteParams {
    pub fn new(repo_uid: RepoUid, actor: Identity, env_vars: BTreeMap<String, String>) -> Self {
        Self {
            repo_uid,
            actor,
            env_vars,
        }
    }

    pub fn repo_uid(&self) -> &RepoUid {
        &self.repo_uid
    }

    pub fn actor(&self) -> &Identity {
        &self.actor
    }

    /// Environment handed to server-side hooks triggered by the mutation.
    /// Only backends that run hooks read it; the in-process [`GitService`]
    /// runs none and leaves it untouched.
    ///
    /// [`GitService`]: crate::GitService
    pub fn env_vars(&self) -> &BTreeMap<String, String> {
        &self.env_vars
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileUpload {
    pub path: String,
    pub content: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateRepositoryParams {
    pub uid: RepoUid,
    pub actor: Identity,
    pub default_branch: String,
    /// Seed content committed as the first commit. Empty → empty repository.
    pub files: Vec<FileUpload>,
    /// Hook environment, see [`WriteParams::env_vars`].
    pub env_vars: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeParams {
    pub write: WriteParams,
    pub base_branch: String,
    /// Repository holding `head_branch`. Only the base repository itself is
    /// accepted until forks are supported.
    pub head_repo_uid: RepoUid,
    pub head_branch: String,
    /// Ref moved to the merge result. `None` performs a dry run that only
    /// reports whether the branches merge.
    pub ref_to_update: Option<String>,
    pub message: Option<String>,
}

impl MergeParams {
    pub fn is_dry_run(&self) -> bool {
        self.ref_to_update.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeOutput {
    pub base_sha: String,
    pub head_sha: String,
    pub merge_base_sha: String,
    /// Commit written for a non-dry-run merge.
    pub merge_sha: Option<String>,
    /// The base branch is an ancestor of the head branch.
    pub fast_forward: bool,
}

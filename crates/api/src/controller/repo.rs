#![forbid(unsafe_code)]

use crate::auth::{self, Authorizer, Permission};
use crate::write_params::{assemble_write_params, hook_environment};
use crate::{ApiError, DiffPathParser, RepositoryStore, UrlProvider};
use gw_core::ids::{RepoUid, ResourcePath};
use gw_core::model::Repository;
use gw_core::{RequestContext, Session};
use gw_gitrpc::{CreateRepositoryParams, FileUpload, GitRpc, MergeParams};
use gw_storage::CreateRepositoryRowRequest;
use serde::{Deserialize, Serialize};
use sha2::Digest as _;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeCheck {
    pub mergeable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateRepositoryInput {
    /// Path of the owning space.
    pub parent_path: String,
    pub name: String,
    pub is_public: bool,
    /// Falls back to the controller default.
    pub default_branch: Option<String>,
    pub files: Vec<FileUpload>,
}

/// Repository operations of one request. Borrows its collaborators so the
/// caller decides how they are shared.
pub struct RepoController<'a> {
    repos: &'a dyn RepositoryStore,
    authorizer: &'a dyn Authorizer,
    urls: &'a dyn UrlProvider,
    diff_paths: &'a dyn DiffPathParser,
    git: &'a dyn GitRpc,
    default_branch: String,
}

impl<'a> RepoController<'a> {
    pub fn new(
        repos: &'a dyn RepositoryStore,
        authorizer: &'a dyn Authorizer,
        urls: &'a dyn UrlProvider,
        diff_paths: &'a dyn DiffPathParser,
        git: &'a dyn GitRpc,
    ) -> Self {
        Self {
            repos,
            authorizer,
            urls,
            diff_paths,
            git,
            default_branch: "main".to_string(),
        }
    }

    pub fn with_default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = branch.into();
        self
    }

    /// Reports whether `diff_path`'s head merges cleanly into its base
    /// without touching any ref.
    pub fn merge_check(
        &self,
        ctx: &RequestContext,
        session: &Session,
        repo_ref: &str,
        diff_path: &str,
    ) -> Result<MergeCheck, ApiError> {
        let repo = self.repos.resolve(ctx, repo_ref)?;
        auth::check_repo(
            ctx,
            self.authorizer,
            session,
            &repo,
            Permission::RepoView,
            false,
        )?;

        let info = self.diff_paths.parse(diff_path)?;
        let write = assemble_write_params(session, &repo, self.urls)?;
        let params = MergeParams {
            write,
            base_branch: info.base_ref,
            head_repo_uid: repo.uid.clone(),
            head_branch: info.head_ref,
            ref_to_update: None,
            message: None,
        };

        match self.git.merge(ctx, &params) {
            Ok(_) => Ok(MergeCheck { mergeable: true }),
            Err(err) if err.is_merge_conflict() => Ok(MergeCheck { mergeable: false }),
            Err(err) => Err(err.into()),
        }
    }

    /// Creates the Git repository first and its metadata row second. The two
    /// are not atomic: a failed row insert after a successful Git step is
    /// reported as [`ApiError::PartialFailure`].
    pub fn create_repository(
        &self,
        ctx: &RequestContext,
        session: &Session,
        input: CreateRepositoryInput,
    ) -> Result<Repository, ApiError> {
        let parent_path = ResourcePath::try_new(&input.parent_path)
            .map_err(|err| ApiError::MalformedRequest(err.message().to_string()))?;
        auth::check_space(
            ctx,
            self.authorizer,
            session,
            &parent_path,
            Permission::SpaceEdit,
        )?;

        if input.name.trim().is_empty() || input.name.contains('/') {
            return Err(ApiError::MalformedRequest(
                "repository name must be a single path segment".to_string(),
            ));
        }
        let space = self.repos.find_space_by_path(ctx, parent_path.as_str())?;
        let path = space
            .path
            .child(input.name.trim())
            .map_err(|err| ApiError::MalformedRequest(err.message().to_string()))?;

        let principal = session.principal().ok_or(ApiError::NotAuthenticated)?;
        let actor = session
            .identity()
            .ok_or_else(|| ApiError::Internal("session has no identity".to_string()))?;
        let default_branch = input
            .default_branch
            .filter(|branch| !branch.trim().is_empty())
            .unwrap_or_else(|| self.default_branch.clone());
        let uid = allocate_uid(&path, principal.id)?;

        let params = CreateRepositoryParams {
            uid: uid.clone(),
            actor,
            default_branch: default_branch.clone(),
            files: input.files,
            env_vars: hook_environment(&self.urls.internal_api_url(), None, principal.id),
        };
        self.git.create_repository(ctx, &params)?;

        let row = CreateRepositoryRowRequest {
            uid: uid.to_string(),
            space_id: space.id,
            path: path.as_str().to_string(),
            is_public: input.is_public,
            default_branch,
            created_by: principal.id,
            created_at_ms: now_ms(),
        };
        match self.repos.insert_repository(ctx, row) {
            Ok(repo) => {
                tracing::info!(repo_id = repo.id, uid = %repo.uid, path = %repo.path, "repository created");
                Ok(repo)
            }
            Err(source) => {
                tracing::warn!(
                    uid = %uid,
                    path = %path,
                    error = %source,
                    "git repository created but metadata insert failed"
                );
                Err(ApiError::PartialFailure {
                    uid: uid.into_string(),
                    source,
                })
            }
        }
    }
}

static UID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Storage UIDs are opaque and never derived from the (renamable) path alone.
fn allocate_uid(path: &ResourcePath, principal_id: i64) -> Result<RepoUid, ApiError> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    let sequence = UID_SEQUENCE.fetch_add(1, Ordering::Relaxed);

    let mut hasher = sha2::Sha256::new();
    hasher.update(path.as_str().as_bytes());
    hasher.update(principal_id.to_le_bytes());
    hasher.update(nanos.to_le_bytes());
    hasher.update(sequence.to_le_bytes());
    let digest = hasher.finalize();

    let mut out = String::with_capacity(32);
    for b in digest.iter().take(16) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    RepoUid::try_new(out).map_err(|err| ApiError::Internal(err.message().to_string()))
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

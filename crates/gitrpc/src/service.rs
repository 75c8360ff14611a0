#![forbid(unsafe_code)]

use super::adapter::{CloneOptions, CommitOptions, GitAdapter, MergeOptions, PushOptions};
use super::{CreateRepositoryParams, FileUpload, GitError, MergeOutput, MergeParams};
use gw_core::RequestContext;
use gw_core::ids::RepoUid;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::instrument;

/// Mutations exposed to request handlers. Implementations may run in-process
/// or forward to a remote Git service, which exports the request's hook
/// environment to the hooks it runs.
pub trait GitRpc: Send + Sync {
    fn create_repository(
        &self,
        ctx: &RequestContext,
        params: &CreateRepositoryParams,
    ) -> Result<(), GitError>;

    fn merge(&self, ctx: &RequestContext, params: &MergeParams) -> Result<MergeOutput, GitError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GitServiceConfig {
    /// Directory holding one bare repository per UID.
    pub repos_root: PathBuf,
    /// Scratch space for short-lived working copies.
    pub tmp_dir: PathBuf,
}

/// Executes [`GitRpc`] calls on repositories stored under
/// [`GitServiceConfig::repos_root`].
#[derive(Debug)]
pub struct GitService<A> {
    adapter: A,
    config: GitServiceConfig,
}

impl<A: GitAdapter> GitService<A> {
    pub fn new(adapter: A, config: GitServiceConfig) -> Self {
        Self { adapter, config }
    }

    pub fn config(&self) -> &GitServiceConfig {
        &self.config
    }

    pub fn repo_path(&self, uid: &RepoUid) -> PathBuf {
        self.config.repos_root.join(format!("{uid}.git"))
    }

    fn seed_repository(
        &self,
        ctx: &RequestContext,
        repo_path: &Path,
        params: &CreateRepositoryParams,
    ) -> Result<(), GitError> {
        fs::create_dir_all(&self.config.tmp_dir)?;
        let scratch = tempfile::Builder::new()
            .prefix("seed-")
            .tempdir_in(&self.config.tmp_dir)?;
        let work_tree = scratch.path().join("work");

        self.adapter.clone_repository(
            ctx,
            &repo_path.to_string_lossy(),
            &work_tree,
            &CloneOptions::default(),
        )?;
        self.adapter
            .set_default_branch(ctx, &work_tree, &params.default_branch)?;

        for file in &params.files {
            write_upload(&work_tree, file)?;
        }
        self.adapter.add_files(ctx, &work_tree, true, &[])?;
        self.adapter.commit(
            ctx,
            &work_tree,
            &CommitOptions {
                author: params.actor.clone(),
                committer: None,
                message: "initial commit".to_string(),
                timestamp: None,
            },
        )?;
        self.adapter.push(
            ctx,
            &work_tree,
            &PushOptions {
                remote: "origin".to_string(),
                branch: params.default_branch.clone(),
                force: false,
                credentials: None,
            },
        )
    }
}

impl<A: GitAdapter> GitRpc for GitService<A> {
    #[instrument(skip_all, fields(uid = %params.uid, files = params.files.len()))]
    fn create_repository(
        &self,
        ctx: &RequestContext,
        params: &CreateRepositoryParams,
    ) -> Result<(), GitError> {
        ctx.check()?;
        let repo_path = self.repo_path(&params.uid);
        if repo_path.exists() {
            return Err(GitError::RepositoryAlreadyExists(params.uid.to_string()));
        }
        fs::create_dir_all(&self.config.repos_root)?;

        let result = self
            .adapter
            .init_repository(ctx, &repo_path, true)
            .and_then(|()| {
                self.adapter
                    .set_default_branch(ctx, &repo_path, &params.default_branch)
            })
            .and_then(|()| {
                if params.files.is_empty() {
                    Ok(())
                } else {
                    self.seed_repository(ctx, &repo_path, params)
                }
            });

        if let Err(err) = result {
            if let Err(cleanup) = fs::remove_dir_all(&repo_path) {
                tracing::warn!(
                    path = %repo_path.display(),
                    error = %cleanup,
                    "failed to remove partially created repository"
                );
            }
            return Err(err);
        }

        tracing::info!(path = %repo_path.display(), "repository created");
        Ok(())
    }

    #[instrument(
        skip_all,
        fields(
            uid = %params.write.repo_uid(),
            base = %params.base_branch,
            head = %params.head_branch,
            dry_run = params.is_dry_run(),
        )
    )]
    fn merge(&self, ctx: &RequestContext, params: &MergeParams) -> Result<MergeOutput, GitError> {
        ctx.check()?;
        if params.head_repo_uid != *params.write.repo_uid() {
            return Err(GitError::ForkNotSupported);
        }

        let repo_path = self.repo_path(params.write.repo_uid());
        if !repo_path.exists() {
            return Err(GitError::RepositoryNotFound(
                params.write.repo_uid().to_string(),
            ));
        }

        let message = params.message.clone().unwrap_or_else(|| {
            format!(
                "Merge branch '{}' into {}",
                params.head_branch, params.base_branch
            )
        });
        let opts = MergeOptions {
            base_branch: params.base_branch.clone(),
            head_branch: params.head_branch.clone(),
            ref_to_update: params.ref_to_update.clone(),
            author: Some(params.write.actor().clone()),
            message,
        };

        match self.adapter.merge(ctx, &repo_path, &opts) {
            Ok(output) => {
                tracing::info!(
                    merge_sha = output.merge_sha.as_deref().unwrap_or("-"),
                    fast_forward = output.fast_forward,
                    "merge completed"
                );
                Ok(output)
            }
            Err(err) => {
                tracing::info!(error = %err, "merge did not complete");
                Err(err)
            }
        }
    }
}

fn write_upload(work_tree: &Path, file: &FileUpload) -> Result<(), GitError> {
    let relative = Path::new(file.path.trim_start_matches('/'));
    let escapes = relative
        .components()
        .any(|component| !matches!(component, Component::Normal(_)));
    if escapes || relative.as_os_str().is_empty() || relative.starts_with(".git") {
        return Err(GitError::InvalidArgument(format!(
            "invalid file path: {}",
            file.path
        )));
    }

    let target = work_tree.join(relative);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(target, &file.content)?;
    Ok(())
}

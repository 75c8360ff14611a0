#![forbid(unsafe_code)]

use super::adapter::{CloneOptions, CommitOptions, GitAdapter, MergeOptions, PushOptions};
use super::{GitError, MergeOutput};
use git2::build::RepoBuilder;
use git2::{
    Commit, ErrorClass, ErrorCode, FetchOptions, IndexAddOption, Oid, Reference, RemoteCallbacks,
    Repository, Signature, Time,
};
use gw_core::{Identity, RequestContext};
use std::cell::Cell;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::{Component, Path};

/// In-process backend executing every operation through libgit2.
#[derive(Clone, Copy, Debug, Default)]
pub struct Git2Adapter;

impl Git2Adapter {
    pub fn new() -> Self {
        Self
    }
}

impl GitAdapter for Git2Adapter {
    fn init_repository(
        &self,
        ctx: &RequestContext,
        path: &Path,
        bare: bool,
    ) -> Result<(), GitError> {
        ctx.check()?;
        if bare {
            Repository::init_bare(path)?;
        } else {
            Repository::init(path)?;
        }
        Ok(())
    }

    fn set_default_branch(
        &self,
        ctx: &RequestContext,
        repo_path: &Path,
        branch: &str,
    ) -> Result<(), GitError> {
        ctx.check()?;
        let repo = open_repository(repo_path)?;
        repo.set_head(&branch_ref(branch)?)?;
        Ok(())
    }

    fn clone_repository(
        &self,
        ctx: &RequestContext,
        from: &str,
        to: &Path,
        opts: &CloneOptions,
    ) -> Result<(), GitError> {
        ctx.check()?;

        let mut callbacks = RemoteCallbacks::new();
        callbacks.transfer_progress(|_| !ctx.is_done());
        callbacks.sideband_progress(|_| !ctx.is_done());

        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(callbacks);
        let mut shallow = false;
        if let Some(depth) = opts.depth {
            let depth = i32::try_from(depth)
                .map_err(|_| GitError::InvalidArgument("clone depth is too large".to_string()))?;
            // libgit2's local transport cannot negotiate shallow fetches.
            if is_local_source(from) {
                tracing::warn!(from, depth, "shallow clone of a local repository; fetching full history");
            } else {
                fetch.depth(depth);
                shallow = true;
            }
        }

        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch);
        builder.bare(opts.bare || opts.mirror);
        if let Some(branch) = opts.branch.as_deref() {
            branch_ref(branch)?;
            builder.branch(branch);
        }
        if opts.mirror {
            builder.remote_create(|repo, name, url| repo.remote_with_fetch(name, url, "+refs/*:refs/*"));
        }

        match builder.clone(from, to) {
            Ok(_) => Ok(()),
            Err(err) => match opts.branch.as_deref() {
                Some(branch)
                    if err.code() == ErrorCode::NotFound && err.message().contains(branch) =>
                {
                    Err(GitError::BranchNotFound(branch.to_string()))
                }
                _ if shallow && is_unsupported(&err) => Err(GitError::InvalidArgument(format!(
                    "shallow clone is not supported for {from}"
                ))),
                _ => Err(map_remote_error(err, ctx, false)),
            },
        }
    }

    fn add_files(
        &self,
        ctx: &RequestContext,
        repo_path: &Path,
        all: bool,
        files: &[&str],
    ) -> Result<(), GitError> {
        ctx.check()?;
        let repo = open_repository(repo_path)?;
        let Some(workdir) = repo.workdir().map(Path::to_path_buf) else {
            return Err(GitError::InvalidArgument(
                "cannot stage files in a bare repository".to_string(),
            ));
        };

        let mut index = repo.index()?;
        if all {
            index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
            index.update_all(["*"].iter(), None)?;
        } else {
            for file in files {
                let relative = Path::new(file);
                ensure_relative(relative)?;
                if workdir.join(relative).exists() {
                    index.add_path(relative)?;
                } else {
                    index.remove_path(relative)?;
                }
            }
        }
        index.write()?;
        Ok(())
    }

    fn commit(
        &self,
        ctx: &RequestContext,
        repo_path: &Path,
        opts: &CommitOptions,
    ) -> Result<String, GitError> {
        ctx.check()?;
        if !opts.author.is_complete() {
            return Err(GitError::IdentityRequired);
        }

        let repo = open_repository(repo_path)?;
        let mut index = repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = repo.find_tree(tree_id)?;

        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(err) if matches!(err.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
            Err(err) => return Err(err.into()),
        };
        let unchanged = match &parent {
            Some(parent) => parent.tree_id() == tree_id,
            None => index.is_empty(),
        };
        if unchanged {
            return Err(GitError::NothingToCommit);
        }

        let time = Time::new(opts.timestamp.unwrap_or_else(now_secs), 0);
        let author = signature(&opts.author, &time)?;
        let committer = match &opts.committer {
            Some(committer) => signature(committer, &time)?,
            None => author.clone(),
        };
        let parents: Vec<&Commit<'_>> = parent.iter().collect();

        let oid = repo.commit(
            Some("HEAD"),
            &author,
            &committer,
            &opts.message,
            &tree,
            &parents,
        )?;
        Ok(oid.to_string())
    }

    fn push(
        &self,
        ctx: &RequestContext,
        repo_path: &Path,
        opts: &PushOptions,
    ) -> Result<(), GitError> {
        ctx.check()?;
        let repo = open_repository(repo_path)?;
        let mut remote = match repo.find_remote(&opts.remote) {
            Ok(remote) => remote,
            Err(err) if err.code() == ErrorCode::NotFound => repo.remote_anonymous(&opts.remote)?,
            Err(err) => return Err(err.into()),
        };

        let branch = branch_ref(&opts.branch)?;
        let refspec = if opts.force {
            format!("+{branch}:{branch}")
        } else {
            format!("{branch}:{branch}")
        };

        let credential_attempts = Cell::new(0u32);
        let rejection: RefCell<Option<String>> = RefCell::new(None);
        let result = {
            let mut callbacks = RemoteCallbacks::new();
            callbacks.credentials(|_url, username_from_url, allowed| {
                credential_attempts.set(credential_attempts.get() + 1);
                // libgit2 asks again after every rejection; one try is enough.
                if credential_attempts.get() > 1 {
                    return Err(git2::Error::from_str("credentials rejected"));
                }
                match &opts.credentials {
                    Some(creds) if allowed.is_user_pass_plaintext() => {
                        git2::Cred::userpass_plaintext(&creds.username, &creds.password)
                    }
                    _ if allowed.is_username() => {
                        git2::Cred::username(username_from_url.unwrap_or("git"))
                    }
                    _ => git2::Cred::default(),
                }
            });
            callbacks.push_update_reference(|_refname, status| {
                if let Some(message) = status {
                    *rejection.borrow_mut() = Some(message.to_string());
                }
                Ok(())
            });
            callbacks.sideband_progress(|_| !ctx.is_done());

            let mut push_options = git2::PushOptions::new();
            push_options.remote_callbacks(callbacks);
            remote.push(&[refspec.as_str()], Some(&mut push_options))
        };

        if let Err(err) = result {
            return Err(map_remote_error(err, ctx, credential_attempts.get() > 1));
        }

        if let Some(message) = rejection.into_inner() {
            if is_non_fast_forward_message(&message) {
                return Err(GitError::NonFastForward);
            }
            return Err(GitError::PushRejected(message));
        }
        Ok(())
    }

    fn merge(
        &self,
        ctx: &RequestContext,
        repo_path: &Path,
        opts: &MergeOptions,
    ) -> Result<MergeOutput, GitError> {
        ctx.check()?;
        let repo = open_repository(repo_path)?;

        let base_ref = branch_ref(&opts.base_branch)?;
        let head_ref = branch_ref(&opts.head_branch)?;
        let base = find_branch_commit(&repo, &base_ref, &opts.base_branch)?;
        let head = find_branch_commit(&repo, &head_ref, &opts.head_branch)?;

        if base.id() == head.id() || repo.graph_descendant_of(base.id(), head.id())? {
            return Err(GitError::NothingToMerge);
        }

        let merge_base = match repo.merge_base(base.id(), head.id()) {
            Ok(oid) => oid,
            Err(err) if err.code() == ErrorCode::NotFound => {
                return Err(GitError::UnrelatedHistories);
            }
            Err(err) => return Err(err.into()),
        };
        let fast_forward = merge_base == base.id();

        ctx.check()?;
        let mut index = repo.merge_commits(&base, &head, None)?;
        if index.has_conflicts() {
            let mut files = BTreeSet::new();
            for conflict in index.conflicts()? {
                let conflict = conflict?;
                for entry in [conflict.our, conflict.their, conflict.ancestor]
                    .into_iter()
                    .flatten()
                {
                    files.insert(String::from_utf8_lossy(&entry.path).into_owned());
                }
            }
            return Err(GitError::MergeConflict {
                files: files.into_iter().collect(),
            });
        }

        let merge_sha = match opts.ref_to_update.as_deref() {
            None => None,
            Some(target) => {
                if !Reference::is_valid_name(target) {
                    return Err(GitError::InvalidArgument(format!("invalid ref name: {target}")));
                }
                let author = opts.author.as_ref().ok_or(GitError::IdentityRequired)?;
                if !author.is_complete() {
                    return Err(GitError::IdentityRequired);
                }
                ctx.check()?;

                let tree = repo.find_tree(index.write_tree_to(&repo)?)?;
                let time = Time::new(now_secs(), 0);
                let signature = signature(author, &time)?;
                let oid = repo.commit(None, &signature, &signature, &opts.message, &tree, &[&base, &head])?;
                update_ref(&repo, target, &base_ref, base.id(), oid)?;
                Some(oid.to_string())
            }
        };

        Ok(MergeOutput {
            base_sha: base.id().to_string(),
            head_sha: head.id().to_string(),
            merge_base_sha: merge_base.to_string(),
            merge_sha,
            fast_forward,
        })
    }
}

fn open_repository(path: &Path) -> Result<Repository, GitError> {
    Repository::open(path).map_err(|err| {
        if err.code() == ErrorCode::NotFound {
            GitError::RepositoryNotFound(path.display().to_string())
        } else {
            GitError::Git(err)
        }
    })
}

fn branch_ref(branch: &str) -> Result<String, GitError> {
    let name = format!("refs/heads/{}", branch.trim());
    if branch.trim().is_empty() || !Reference::is_valid_name(&name) {
        return Err(GitError::InvalidArgument(format!("invalid branch name: {branch}")));
    }
    Ok(name)
}

fn find_branch_commit<'r>(
    repo: &'r Repository,
    reference: &str,
    branch: &str,
) -> Result<Commit<'r>, GitError> {
    match repo.find_reference(reference) {
        Ok(reference) => Ok(reference.peel_to_commit()?),
        Err(err) if err.code() == ErrorCode::NotFound => {
            Err(GitError::BranchNotFound(branch.to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

// Moving the base branch is a compare-and-swap against the commit the merge
// was computed from, so a concurrent push makes this merge fail instead of
// being overwritten.
fn update_ref(
    repo: &Repository,
    target: &str,
    base_ref: &str,
    base_id: Oid,
    new_id: Oid,
) -> Result<(), GitError> {
    let message = "merge";
    let outcome = if target == base_ref {
        repo.reference_matching(target, new_id, true, base_id, message)
    } else {
        repo.reference(target, new_id, true, message)
    };
    match outcome {
        Ok(_) => Ok(()),
        Err(err) if err.code() == ErrorCode::Modified => Err(GitError::NonFastForward),
        Err(err) => Err(err.into()),
    }
}

fn ensure_relative(path: &Path) -> Result<(), GitError> {
    let escapes = path.components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes || path.as_os_str().is_empty() {
        return Err(GitError::InvalidArgument(format!(
            "path must stay inside the work tree: {}",
            path.display()
        )));
    }
    Ok(())
}

fn signature(identity: &Identity, time: &Time) -> Result<Signature<'static>, GitError> {
    if !identity.is_complete() {
        return Err(GitError::IdentityRequired);
    }
    Ok(Signature::new(&identity.name, &identity.email, time)?)
}

fn map_remote_error(err: git2::Error, ctx: &RequestContext, credentials_rejected: bool) -> GitError {
    if let Err(interrupted) = ctx.check() {
        return GitError::Interrupted(interrupted);
    }
    if credentials_rejected || err.code() == ErrorCode::Auth {
        return GitError::AuthenticationFailed;
    }
    let message = err.message().to_ascii_lowercase();
    if err.class() == ErrorClass::Http
        && (message.contains("401") || message.contains("authentication"))
    {
        return GitError::AuthenticationFailed;
    }
    if err.code() == ErrorCode::NotFastForward || is_non_fast_forward_message(&message) {
        return GitError::NonFastForward;
    }
    GitError::Git(err)
}

fn is_local_source(from: &str) -> bool {
    from.starts_with("file://") || Path::new(from).exists()
}

// GIT_ENOTSUPPORTED has no `ErrorCode` variant in git2.
fn is_unsupported(err: &git2::Error) -> bool {
    err.raw_code() == -39 || err.message().contains("not supported")
}

fn is_non_fast_forward_message(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("non-fast-forward")
        || message.contains("non-fastforwardable")
        || message.contains("fetch first")
}

fn now_secs() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => i64::try_from(duration.as_secs()).unwrap_or(i64::MAX),
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_names_are_validated_as_refs() {
        assert_eq!(branch_ref("main").unwrap(), "refs/heads/main");
        assert_eq!(branch_ref("feature/x").unwrap(), "refs/heads/feature/x");
        assert!(matches!(branch_ref(""), Err(GitError::InvalidArgument(_))));
        assert!(matches!(branch_ref("bad..name"), Err(GitError::InvalidArgument(_))));
    }

    #[test]
    fn staged_paths_must_stay_in_the_work_tree() {
        assert!(ensure_relative(Path::new("src/lib.rs")).is_ok());
        assert!(ensure_relative(Path::new("../outside")).is_err());
        assert!(ensure_relative(Path::new("/etc/passwd")).is_err());
    }

    #[test]
    fn authentication_failures_are_classified() {
        let ctx = RequestContext::background();

        let err = git2::Error::new(ErrorCode::Auth, ErrorClass::Http, "authentication required");
        assert!(matches!(
            map_remote_error(err, &ctx, false),
            GitError::AuthenticationFailed
        ));

        let err = git2::Error::new(
            ErrorCode::GenericError,
            ErrorClass::Http,
            "unexpected http status code: 401",
        );
        assert!(matches!(
            map_remote_error(err, &ctx, false),
            GitError::AuthenticationFailed
        ));

        let err = git2::Error::from_str("credentials rejected");
        assert!(matches!(
            map_remote_error(err, &ctx, true),
            GitError::AuthenticationFailed
        ));

        let err = git2::Error::new(ErrorCode::GenericError, ErrorClass::Net, "connection reset");
        assert!(matches!(map_remote_error(err, &ctx, false), GitError::Git(_)));
    }

    #[test]
    fn remote_errors_after_cancellation_are_interruptions() {
        let ctx = RequestContext::background();
        ctx.cancel_token().cancel();
        let err = git2::Error::new(ErrorCode::Auth, ErrorClass::Http, "authentication required");
        assert!(matches!(
            map_remote_error(err, &ctx, true),
            GitError::Interrupted(_)
        ));
    }

    #[test]
    fn non_fast_forward_code_is_classified() {
        let ctx = RequestContext::background();
        let err = git2::Error::new(ErrorCode::NotFastForward, ErrorClass::Reference, "rejected");
        assert!(matches!(
            map_remote_error(err, &ctx, false),
            GitError::NonFastForward
        ));
    }

    #[test]
    fn local_sources_are_detected() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(is_local_source(&dir.path().to_string_lossy()));
        assert!(is_local_source("file:///srv/git/site.git"));
        assert!(!is_local_source("https://git.example.com/acme/site.git"));
    }

    #[test]
    fn rejection_messages_are_recognised() {
        assert!(is_non_fast_forward_message("cannot push non-fastforwardable reference"));
        assert!(is_non_fast_forward_message("! [rejected] (fetch first)"));
        assert!(!is_non_fast_forward_message("pre-receive hook declined"));
    }
}

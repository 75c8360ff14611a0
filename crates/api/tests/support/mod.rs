#![forbid(unsafe_code)]
#![allow(dead_code)]

use gw_core::model::{Repository, Space};
use gw_core::{Principal, PrincipalKind, RequestContext, Session};
use gw_gitrpc::{CreateRepositoryParams, GitError, GitRpc, MergeOutput, MergeParams};
use gw_storage::{CreateRepositoryRowRequest, CreateSpaceRequest, SqliteStore};
use std::sync::Mutex;
use tempfile::TempDir;

pub(crate) const OWNER_ID: i64 = 7;
pub(crate) const STRANGER_ID: i64 = 8;

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub(crate) fn session(id: i64) -> Session {
    Session::authenticated(Principal {
        id,
        uid: format!("user-{id}"),
        kind: PrincipalKind::User,
        display_name: format!("User {id}"),
        email: format!("user{id}@example.com"),
        admin: false,
    })
}

/// Store with space `acme` holding repository `acme/site` (uid `repo-42`).
pub(crate) struct Fixture {
    pub(crate) dir: TempDir,
    pub(crate) store: SqliteStore,
    pub(crate) space: Space,
    pub(crate) repo: Repository,
}

impl Fixture {
    pub(crate) fn new(is_public: bool) -> Self {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path().join("db")).unwrap();
        let ctx = RequestContext::background();
        let space = store
            .create_space(
                &ctx,
                CreateSpaceRequest {
                    path: "acme".to_string(),
                    parent_id: None,
                    created_at_ms: 1,
                },
            )
            .unwrap();
        let repo = store
            .create_repository_row(
                &ctx,
                CreateRepositoryRowRequest {
                    uid: "repo-42".to_string(),
                    space_id: space.id,
                    path: "acme/site".to_string(),
                    is_public,
                    default_branch: "main".to_string(),
                    created_by: OWNER_ID,
                    created_at_ms: 2,
                },
            )
            .unwrap();
        Self {
            dir,
            store,
            space,
            repo,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MergeOutcome {
    Clean,
    Conflict,
    NothingToMerge,
}

/// Git RPC double that records every call and never touches disk.
pub(crate) struct RecordingGit {
    outcome: Mutex<MergeOutcome>,
    merges: Mutex<Vec<MergeParams>>,
    creates: Mutex<Vec<CreateRepositoryParams>>,
}

impl RecordingGit {
    pub(crate) fn new(outcome: MergeOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            merges: Mutex::new(Vec::new()),
            creates: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn merges(&self) -> Vec<MergeParams> {
        self.merges.lock().unwrap().clone()
    }

    pub(crate) fn creates(&self) -> Vec<CreateRepositoryParams> {
        self.creates.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.merges.lock().unwrap().len() + self.creates.lock().unwrap().len()
    }
}

impl GitRpc for RecordingGit {
    fn create_repository(
        &self,
        _ctx: &RequestContext,
        params: &CreateRepositoryParams,
    ) -> Result<(), GitError> {
        self.creates.lock().unwrap().push(params.clone());
        Ok(())
    }

    fn merge(&self, _ctx: &RequestContext, params: &MergeParams) -> Result<MergeOutput, GitError> {
        self.merges.lock().unwrap().push(params.clone());
        match *self.outcome.lock().unwrap() {
            MergeOutcome::Clean => Ok(MergeOutput {
                base_sha: "b".repeat(40),
                head_sha: "h".repeat(40),
                merge_base_sha: "m".repeat(40),
                merge_sha: None,
                fast_forward: false,
            }),
            MergeOutcome::Conflict => Err(GitError::MergeConflict {
                files: vec!["README.md".to_string()],
            }),
            MergeOutcome::NothingToMerge => Err(GitError::NothingToMerge),
        }
    }
}

#![forbid(unsafe_code)]

use super::{ApiError, UrlProvider};
use gw_core::Session;
use gw_core::model::Repository;
use gw_gitrpc::WriteParams;
use std::collections::BTreeMap;

pub const ENV_BASE_URL: &str = "GITWARD_BASE_URL";
pub const ENV_REPO_ID: &str = "GITWARD_REPO_ID";
pub const ENV_PRINCIPAL_ID: &str = "GITWARD_PRINCIPAL_ID";

/// Variables exported to server-side hooks. `repo_id` is absent while the
/// repository row does not exist yet.
pub fn hook_environment(
    base_url: &str,
    repo_id: Option<i64>,
    principal_id: i64,
) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    env.insert(ENV_BASE_URL.to_string(), base_url.to_string());
    if let Some(repo_id) = repo_id {
        env.insert(ENV_REPO_ID.to_string(), repo_id.to_string());
    }
    env.insert(ENV_PRINCIPAL_ID.to_string(), principal_id.to_string());
    env
}

/// Builds the parameters of a Git write issued by `session` against `repo`.
pub fn assemble_write_params(
    session: &Session,
    repo: &Repository,
    urls: &dyn UrlProvider,
) -> Result<WriteParams, ApiError> {
    let principal = session.principal().ok_or_else(|| {
        ApiError::Internal("write parameters require an authenticated principal".to_string())
    })?;
    let actor = session
        .identity()
        .ok_or_else(|| ApiError::Internal("session has no identity".to_string()))?;

    let base_url = urls.internal_api_url();
    if base_url.trim().is_empty() {
        return Err(ApiError::Internal("internal api url is not configured".to_string()));
    }

    Ok(WriteParams::new(
        repo.uid.clone(),
        actor,
        hook_environment(&base_url, Some(repo.id), principal.id),
    ))
}

#![forbid(unsafe_code)]

//! Services a controller consumes but does not own.

use super::ApiError;
use gw_core::model::{Repository, Space};
use gw_core::{CompareInfo, RequestContext, parse_diff_path};
use gw_storage::{CreateRepositoryRowRequest, SqliteStore, StoreError};

/// Turns a caller-supplied repository reference (numeric id or path) into
/// the stored repository.
pub trait RepositoryResolver {
    fn resolve(&self, ctx: &RequestContext, repo_ref: &str) -> Result<Repository, ApiError>;

    fn find_by_id(&self, ctx: &RequestContext, id: i64) -> Result<Repository, ApiError>;
}

impl RepositoryResolver for SqliteStore {
    fn resolve(&self, ctx: &RequestContext, repo_ref: &str) -> Result<Repository, ApiError> {
        // A reference that cannot name a repository resolves to nothing.
        self.find_repository_by_ref(ctx, repo_ref)
            .map_err(|err| match err {
                StoreError::InvalidInput(_) => ApiError::NotFound("repository"),
                other => ApiError::from_store(other, "repository"),
            })
    }

    fn find_by_id(&self, ctx: &RequestContext, id: i64) -> Result<Repository, ApiError> {
        self.find_repository(ctx, id)
            .map_err(|err| ApiError::from_store(err, "repository"))
    }
}

/// Metadata side of repository creation.
pub trait RepositoryStore: RepositoryResolver {
    fn find_space_by_path(&self, ctx: &RequestContext, path: &str) -> Result<Space, ApiError>;

    fn insert_repository(
        &self,
        ctx: &RequestContext,
        request: CreateRepositoryRowRequest,
    ) -> Result<Repository, StoreError>;
}

impl RepositoryStore for SqliteStore {
    fn find_space_by_path(&self, ctx: &RequestContext, path: &str) -> Result<Space, ApiError> {
        SqliteStore::find_space_by_path(self, ctx, path).map_err(|err| match err {
            StoreError::InvalidInput(reason) => ApiError::MalformedRequest(reason.to_string()),
            other => ApiError::from_store(other, "space"),
        })
    }

    fn insert_repository(
        &self,
        ctx: &RequestContext,
        request: CreateRepositoryRowRequest,
    ) -> Result<Repository, StoreError> {
        self.create_repository_row(ctx, request)
    }
}

/// Source of the externally reachable URLs handed to Git hooks.
pub trait UrlProvider {
    fn internal_api_url(&self) -> String;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticUrlProvider {
    base_url: String,
}

impl StaticUrlProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl UrlProvider for StaticUrlProvider {
    fn internal_api_url(&self) -> String {
        self.base_url.clone()
    }
}

pub trait DiffPathParser {
    fn parse(&self, diff_path: &str) -> Result<CompareInfo, ApiError>;
}

/// Accepts `base...head` and `base..head`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RefRangeParser;

impl DiffPathParser for RefRangeParser {
    fn parse(&self, diff_path: &str) -> Result<CompareInfo, ApiError> {
        parse_diff_path(diff_path).map_err(|err| ApiError::MalformedRequest(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_core::{Classify, ErrorKind};

    #[test]
    fn static_url_provider_drops_trailing_slash() {
        let urls = StaticUrlProvider::new("http://gitward.internal:3000/");
        assert_eq!(urls.internal_api_url(), "http://gitward.internal:3000");
    }

    #[test]
    fn malformed_diff_path_is_a_caller_error() {
        let parsed = RefRangeParser.parse("main...feature").unwrap();
        assert_eq!(parsed.base_ref, "main");
        assert_eq!(parsed.head_ref, "feature");
        assert!(!parsed.direct);

        let err = RefRangeParser.parse("main").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRequest);
    }
}

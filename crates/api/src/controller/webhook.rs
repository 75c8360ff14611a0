#![forbid(unsafe_code)]

use crate::auth::{self, Authorizer, Permission};
use crate::{ApiError, RepositoryResolver};
use gw_core::ids::ResourcePath;
use gw_core::model::{Pagination, Parent, ParentKind, Repository, Webhook, WebhookTrigger};
use gw_core::{RequestContext, Session};
use gw_storage::{CreateWebhookRequest, SqliteStore, StoreError};
use serde::Deserialize;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CreateWebhookInput {
    pub url: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub insecure: bool,
    #[serde(default)]
    pub triggers: Vec<String>,
}

/// Partial update. `None` leaves the field as stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateWebhookInput {
    /// Version the caller last read. Required: a mismatch fails with a
    /// conflict instead of overwriting a newer registration.
    pub version: i64,
    pub url: Option<String>,
    pub secret: Option<String>,
    pub enabled: Option<bool>,
    pub insecure: Option<bool>,
    pub triggers: Option<Vec<String>>,
}

pub struct WebhookController<'a> {
    store: &'a SqliteStore,
    authorizer: &'a dyn Authorizer,
}

impl<'a> WebhookController<'a> {
    pub fn new(store: &'a SqliteStore, authorizer: &'a dyn Authorizer) -> Self {
        Self { store, authorizer }
    }

    pub fn find(
        &self,
        ctx: &RequestContext,
        session: &Session,
        repo_ref: &str,
        webhook_id: i64,
    ) -> Result<Webhook, ApiError> {
        let repo = self.authorized_repo(ctx, session, repo_ref, Permission::RepoView)?;
        self.owned_webhook(ctx, &repo, webhook_id)
    }

    pub fn list(
        &self,
        ctx: &RequestContext,
        session: &Session,
        repo_ref: &str,
        pagination: Pagination,
    ) -> Result<Vec<Webhook>, ApiError> {
        let repo = self.authorized_repo(ctx, session, repo_ref, Permission::RepoView)?;
        Ok(self
            .store
            .list_webhooks(ctx, Parent::Repository(repo.id), pagination)?)
    }

    pub fn count(
        &self,
        ctx: &RequestContext,
        session: &Session,
        repo_ref: &str,
    ) -> Result<i64, ApiError> {
        let repo = self.authorized_repo(ctx, session, repo_ref, Permission::RepoView)?;
        Ok(self.store.count_webhooks(ctx, Parent::Repository(repo.id))?)
    }

    /// Lists by a caller-named parent type (`repo` or `space`).
    pub fn list_by_parent(
        &self,
        ctx: &RequestContext,
        session: &Session,
        parent_type: &str,
        parent_ref: &str,
        pagination: Pagination,
    ) -> Result<Vec<Webhook>, ApiError> {
        let parent = self.authorized_parent(ctx, session, parent_type, parent_ref)?;
        Ok(self.store.list_webhooks(ctx, parent, pagination)?)
    }

    pub fn count_by_parent(
        &self,
        ctx: &RequestContext,
        session: &Session,
        parent_type: &str,
        parent_ref: &str,
    ) -> Result<i64, ApiError> {
        let parent = self.authorized_parent(ctx, session, parent_type, parent_ref)?;
        Ok(self.store.count_webhooks(ctx, parent)?)
    }

    pub fn create(
        &self,
        ctx: &RequestContext,
        session: &Session,
        repo_ref: &str,
        input: CreateWebhookInput,
    ) -> Result<Webhook, ApiError> {
        let repo = self.authorized_repo(ctx, session, repo_ref, Permission::RepoEdit)?;
        let principal = session.principal().ok_or(ApiError::NotAuthenticated)?;

        let request = CreateWebhookRequest {
            repo_id: Some(repo.id),
            space_id: None,
            created_by: principal.id,
            url: validate_url(&input.url)?,
            secret: input.secret,
            enabled: input.enabled,
            insecure: input.insecure,
            triggers: parse_triggers(&input.triggers)?,
        };
        let hook = self.store.create_webhook(ctx, request)?;
        tracing::debug!(webhook_id = hook.id, repo_id = repo.id, "webhook created");
        Ok(hook)
    }

    pub fn update(
        &self,
        ctx: &RequestContext,
        session: &Session,
        repo_ref: &str,
        webhook_id: i64,
        input: UpdateWebhookInput,
    ) -> Result<Webhook, ApiError> {
        let repo = self.authorized_repo(ctx, session, repo_ref, Permission::RepoEdit)?;
        let mut hook = self.owned_webhook(ctx, &repo, webhook_id)?;

        if input.version != hook.version {
            return Err(StoreError::Conflict {
                id: hook.id,
                expected_version: input.version,
            }
            .into());
        }
        if let Some(url) = input.url {
            hook.url = validate_url(&url)?;
        }
        if let Some(secret) = input.secret {
            hook.secret = secret;
        }
        if let Some(enabled) = input.enabled {
            hook.enabled = enabled;
        }
        if let Some(insecure) = input.insecure {
            hook.insecure = insecure;
        }
        if let Some(triggers) = input.triggers {
            hook.triggers = parse_triggers(&triggers)?;
        }

        self.store.update_webhook(ctx, &mut hook)?;
        Ok(hook)
    }

    /// Deletes without a version check; a concurrent update is simply lost.
    pub fn delete(
        &self,
        ctx: &RequestContext,
        session: &Session,
        repo_ref: &str,
        webhook_id: i64,
    ) -> Result<(), ApiError> {
        let repo = self.authorized_repo(ctx, session, repo_ref, Permission::RepoEdit)?;
        self.owned_webhook(ctx, &repo, webhook_id)?;
        self.store.delete_webhook(ctx, webhook_id)?;
        Ok(())
    }

    fn authorized_repo(
        &self,
        ctx: &RequestContext,
        session: &Session,
        repo_ref: &str,
        permission: Permission,
    ) -> Result<Repository, ApiError> {
        let repo = self.store.resolve(ctx, repo_ref)?;
        auth::check_repo(ctx, self.authorizer, session, &repo, permission, false)?;
        Ok(repo)
    }

    fn authorized_parent(
        &self,
        ctx: &RequestContext,
        session: &Session,
        parent_type: &str,
        parent_ref: &str,
    ) -> Result<Parent, ApiError> {
        let kind: ParentKind = parent_type.parse()?;
        match kind {
            ParentKind::Repository => {
                let repo = self.authorized_repo(ctx, session, parent_ref, Permission::RepoView)?;
                Ok(Parent::Repository(repo.id))
            }
            ParentKind::Space => {
                let path = ResourcePath::try_new(parent_ref)
                    .map_err(|err| ApiError::MalformedRequest(err.message().to_string()))?;
                let space = self
                    .store
                    .find_space_by_path(ctx, path.as_str())
                    .map_err(|err| ApiError::from_store(err, "space"))?;
                auth::check_space(ctx, self.authorizer, session, &space.path, Permission::SpaceView)?;
                Ok(Parent::Space(space.id))
            }
        }
    }

    /// A hook registered on another parent is reported as missing.
    fn owned_webhook(
        &self,
        ctx: &RequestContext,
        repo: &Repository,
        webhook_id: i64,
    ) -> Result<Webhook, ApiError> {
        let hook = self
            .store
            .find_webhook(ctx, webhook_id)
            .map_err(|err| ApiError::from_store(err, "webhook"))?;
        if hook.parent != Parent::Repository(repo.id) {
            return Err(ApiError::NotFound("webhook"));
        }
        Ok(hook)
    }
}

fn validate_url(raw: &str) -> Result<String, ApiError> {
    let url = raw.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| ApiError::MalformedRequest("webhook url must use http or https".to_string()))?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || url.chars().any(char::is_whitespace) {
        return Err(ApiError::MalformedRequest("webhook url has no host".to_string()));
    }
    Ok(url.to_string())
}

/// Parses trigger names, keeping the first occurrence of each.
fn parse_triggers(raw: &[String]) -> Result<Vec<WebhookTrigger>, ApiError> {
    let mut triggers = Vec::with_capacity(raw.len());
    for name in raw {
        let trigger: WebhookTrigger = name
            .trim()
            .parse()
            .map_err(|_| ApiError::MalformedRequest(format!("unknown webhook trigger: {name}")))?;
        if !triggers.contains(&trigger) {
            triggers.push(trigger);
        }
    }
    Ok(triggers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_http_urls_with_a_host_are_accepted() {
        assert_eq!(
            validate_url(" https://hooks.example.com/ci ").unwrap(),
            "https://hooks.example.com/ci"
        );
        assert!(validate_url("http://localhost:8080").is_ok());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("https:///path").is_err());
        assert!(validate_url("https://exa mple.com").is_err());
    }

    #[test]
    fn duplicate_triggers_collapse_in_order() {
        let raw = ["tag_created", "branch_updated", "tag_created"].map(String::from);
        assert_eq!(
            parse_triggers(&raw).unwrap(),
            vec![WebhookTrigger::TagCreated, WebhookTrigger::BranchUpdated]
        );
        assert!(matches!(
            parse_triggers(&["nope".to_string()]),
            Err(ApiError::MalformedRequest(_))
        ));
    }
}

#![forbid(unsafe_code)]

mod support;

use gw_api::{
    ApiError, CreateWebhookInput, Permission, PermissionTable, UpdateWebhookInput,
    WebhookController,
};
use gw_core::model::{Pagination, Parent, WebhookTrigger};
use gw_core::{Classify, ErrorKind, RequestContext, Session};
use gw_storage::{CreateRepositoryRowRequest, CreateWebhookRequest};
use support::*;

fn table() -> PermissionTable {
    let mut table = PermissionTable::new();
    table
        .grant(OWNER_ID, "acme", &[Permission::RepoEdit, Permission::SpaceView])
        .unwrap();
    table
        .grant(STRANGER_ID, "acme", &[Permission::RepoView])
        .unwrap();
    table
}

fn hook_input(url: &str, triggers: &[&str]) -> CreateWebhookInput {
    CreateWebhookInput {
        url: url.to_string(),
        secret: "s3cret".to_string(),
        enabled: true,
        insecure: false,
        triggers: triggers.iter().map(|name| name.to_string()).collect(),
    }
}

#[test]
fn owner_creates_and_reads_repository_webhooks() {
    init_tracing();
    let fx = Fixture::new(false);
    let table = table();
    let controller = WebhookController::new(&fx.store, &table);
    let ctx = RequestContext::background();
    let owner = session(OWNER_ID);

    let hook = controller
        .create(
            &ctx,
            &owner,
            "acme/site",
            hook_input(
                "https://ci.example.com/hook",
                &["branch_created", "tag_deleted", "branch_created"],
            ),
        )
        .unwrap();
    assert_eq!(hook.version, 0);
    assert_eq!(hook.parent, Parent::Repository(fx.repo.id));
    assert_eq!(hook.created_by, OWNER_ID);
    assert_eq!(
        hook.triggers,
        vec![WebhookTrigger::BranchCreated, WebhookTrigger::TagDeleted]
    );

    let found = controller.find(&ctx, &owner, "acme/site", hook.id).unwrap();
    assert_eq!(found, hook);

    let json = serde_json::to_value(&found).unwrap();
    assert!(json.get("secret").is_none(), "secret must not be serialized");

    let reader = session(STRANGER_ID);
    let listed = controller
        .list(&ctx, &reader, "acme/site", Pagination::default())
        .unwrap();
    assert_eq!(listed, vec![hook]);
    assert_eq!(controller.count(&ctx, &reader, "acme/site").unwrap(), 1);
}

#[test]
fn writes_require_edit_permission() {
    let fx = Fixture::new(false);
    let table = table();
    let controller = WebhookController::new(&fx.store, &table);
    let ctx = RequestContext::background();

    let err = controller
        .create(
            &ctx,
            &session(STRANGER_ID),
            "acme/site",
            hook_input("https://ci.example.com", &[]),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = controller
        .list(&ctx, &Session::anonymous(), "acme/site", Pagination::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAuthenticated);

    let hook = controller
        .create(
            &ctx,
            &session(OWNER_ID),
            "acme/site",
            hook_input("https://ci.example.com", &[]),
        )
        .unwrap();
    let err = controller
        .delete(&ctx, &session(STRANGER_ID), "acme/site", hook.id)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(
        controller.count(&ctx, &session(OWNER_ID), "acme/site").unwrap(),
        1
    );
}

#[test]
fn invalid_input_is_malformed() {
    let fx = Fixture::new(false);
    let table = table();
    let controller = WebhookController::new(&fx.store, &table);
    let ctx = RequestContext::background();
    let owner = session(OWNER_ID);

    for input in [
        hook_input("ftp://ci.example.com", &[]),
        hook_input("https://", &[]),
        hook_input("https://ci.example.com", &["branch_renamed"]),
    ] {
        let err = controller
            .create(&ctx, &owner, "acme/site", input)
            .unwrap_err();
        assert!(matches!(err, ApiError::MalformedRequest(_)), "{err:?}");
    }
    assert_eq!(controller.count(&ctx, &owner, "acme/site").unwrap(), 0);
}

#[test]
fn update_checks_the_version_the_caller_read() {
    let fx = Fixture::new(false);
    let table = table();
    let controller = WebhookController::new(&fx.store, &table);
    let ctx = RequestContext::background();
    let owner = session(OWNER_ID);

    let hook = controller
        .create(
            &ctx,
            &owner,
            "acme/site",
            hook_input("https://ci.example.com", &["tag_created"]),
        )
        .unwrap();

    let updated = controller
        .update(
            &ctx,
            &owner,
            "acme/site",
            hook.id,
            UpdateWebhookInput {
                version: 0,
                enabled: Some(false),
                triggers: Some(Vec::new()),
                ..UpdateWebhookInput::default()
            },
        )
        .unwrap();
    assert_eq!(updated.version, 1);
    assert!(!updated.enabled);
    assert!(updated.triggers.is_empty());
    assert_eq!(updated.url, "https://ci.example.com");
    assert!(updated.updated >= hook.updated);

    let err = controller
        .update(
            &ctx,
            &owner,
            "acme/site",
            hook.id,
            UpdateWebhookInput {
                version: 0,
                url: Some("https://elsewhere.example.com".to_string()),
                ..UpdateWebhookInput::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(err.is_retryable());

    let stored = controller.find(&ctx, &owner, "acme/site", hook.id).unwrap();
    assert_eq!(stored, updated);
}

#[test]
fn update_payload_must_carry_the_observed_version() {
    let missing: Result<UpdateWebhookInput, _> =
        serde_json::from_str(r#"{"enabled": false}"#);
    assert!(missing.is_err());

    let input: UpdateWebhookInput =
        serde_json::from_str(r#"{"version": 3, "enabled": false}"#).unwrap();
    assert_eq!(input.version, 3);
    assert_eq!(input.enabled, Some(false));
    assert_eq!(input.url, None);
}

#[test]
fn webhooks_are_only_visible_through_their_own_parent() {
    let fx = Fixture::new(false);
    let table = table();
    let controller = WebhookController::new(&fx.store, &table);
    let ctx = RequestContext::background();
    let owner = session(OWNER_ID);

    fx.store
        .create_repository_row(
            &ctx,
            CreateRepositoryRowRequest {
                uid: "repo-43".to_string(),
                space_id: fx.space.id,
                path: "acme/other".to_string(),
                is_public: false,
                default_branch: "main".to_string(),
                created_by: OWNER_ID,
                created_at_ms: 3,
            },
        )
        .unwrap();
    let hook = controller
        .create(
            &ctx,
            &owner,
            "acme/site",
            hook_input("https://ci.example.com", &[]),
        )
        .unwrap();

    let err = controller
        .find(&ctx, &owner, "acme/other", hook.id)
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound("webhook")));
    let err = controller
        .delete(&ctx, &owner, "acme/other", hook.id)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    controller.delete(&ctx, &owner, "acme/site", hook.id).unwrap();
    assert_eq!(
        controller
            .find(&ctx, &owner, "acme/site", hook.id)
            .unwrap_err()
            .kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn listing_by_parent_type_name() {
    let fx = Fixture::new(false);
    let table = table();
    let controller = WebhookController::new(&fx.store, &table);
    let ctx = RequestContext::background();
    let owner = session(OWNER_ID);

    let space_hook = fx
        .store
        .create_webhook(
            &ctx,
            CreateWebhookRequest {
                repo_id: None,
                space_id: Some(fx.space.id),
                created_by: OWNER_ID,
                url: "https://org.example.com".to_string(),
                secret: String::new(),
                enabled: true,
                insecure: false,
                triggers: Vec::new(),
            },
        )
        .unwrap();
    controller
        .create(
            &ctx,
            &owner,
            "acme/site",
            hook_input("https://ci.example.com", &[]),
        )
        .unwrap();

    let by_space = controller
        .list_by_parent(&ctx, &owner, "space", "acme", Pagination::default())
        .unwrap();
    assert_eq!(by_space, vec![space_hook]);
    assert_eq!(
        controller
            .count_by_parent(&ctx, &owner, "repo", "acme/site")
            .unwrap(),
        1
    );

    let err = controller
        .list_by_parent(&ctx, &owner, "organization", "acme", Pagination::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedParent);

    let err = controller
        .list_by_parent(
            &ctx,
            &session(STRANGER_ID),
            "space",
            "acme",
            Pagination::default(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

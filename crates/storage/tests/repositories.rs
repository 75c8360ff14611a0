use gw_core::{Classify, ErrorKind, RequestContext};
use gw_storage::{CreateRepositoryRowRequest, CreateSpaceRequest, SqliteStore, StoreError};
use rusqlite::Connection;
use tempfile::TempDir;

fn repo_request(space_id: i64, uid: &str, path: &str) -> CreateRepositoryRowRequest {
    CreateRepositoryRowRequest {
        uid: uid.to_string(),
        space_id,
        path: path.to_string(),
        is_public: false,
        default_branch: "main".to_string(),
        created_by: 1,
        created_at_ms: 10,
    }
}

#[test]
fn storage_open_is_fail_closed_on_foreign_schema() {
    let dir = TempDir::new().unwrap();
    let conn = Connection::open(dir.path().join("gitward.db")).unwrap();
    conn.execute("CREATE TABLE legacy_hooks(id INTEGER PRIMARY KEY)", [])
        .unwrap();
    drop(conn);

    let err = SqliteStore::open(dir.path()).expect_err("foreign schema must be rejected");
    assert_eq!(err.code(), "RESET_REQUIRED");
    assert!(matches!(err, StoreError::ResetRequired(_)));
}

#[test]
fn reopening_an_existing_store_keeps_its_rows() {
    let dir = TempDir::new().unwrap();
    let ctx = RequestContext::background();
    let space_id = {
        let store = SqliteStore::open(dir.path()).unwrap();
        store
            .create_space(
                &ctx,
                CreateSpaceRequest {
                    path: "acme".to_string(),
                    parent_id: None,
                    created_at_ms: 1,
                },
            )
            .unwrap()
            .id
    };

    let store = SqliteStore::open(dir.path()).expect("store should reopen");
    assert_eq!(store.find_space(&ctx, space_id).unwrap().path.as_str(), "acme");
}

#[test]
fn repository_reference_resolves_by_id_or_path() {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::open(dir.path()).unwrap();
    let ctx = RequestContext::background();
    let space = store
        .create_space(
            &ctx,
            CreateSpaceRequest {
                path: "Acme".to_string(),
                parent_id: None,
                created_at_ms: 1,
            },
        )
        .unwrap();
    let repo = store
        .create_repository_row(&ctx, repo_request(space.id, "repo-42", "Acme/Site"))
        .unwrap();

    let by_id = store
        .find_repository_by_ref(&ctx, &repo.id.to_string())
        .unwrap();
    assert_eq!(by_id, repo);

    let by_path = store.find_repository_by_ref(&ctx, "/acme/site/").unwrap();
    assert_eq!(by_path.uid.as_str(), "repo-42");

    let err = store.find_repository_by_ref(&ctx, "acme/missing").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = store.find_repository_by_ref(&ctx, "  ").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedRequest);

    assert_eq!(
        store.find_space_by_path(&ctx, "ACME").unwrap().id,
        space.id
    );
}

#[test]
fn duplicate_uid_or_path_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::open(dir.path()).unwrap();
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
    store
        .create_repository_row(&ctx, repo_request(space.id, "repo-1", "acme/one"))
        .unwrap();

    assert!(matches!(
        store.create_repository_row(&ctx, repo_request(space.id, "repo-1", "acme/two")),
        Err(StoreError::AlreadyExists)
    ));
    assert!(matches!(
        store.create_repository_row(&ctx, repo_request(space.id, "repo-2", "ACME/one")),
        Err(StoreError::AlreadyExists)
    ));
    assert!(matches!(
        store.create_repository_row(&ctx, repo_request(space.id, "../escape", "acme/three")),
        Err(StoreError::InvalidInput(_))
    ));
    assert_eq!(
        store
            .create_repository_row(&ctx, repo_request(space.id + 99, "repo-3", "acme/three"))
            .unwrap_err()
            .kind(),
        ErrorKind::ConstraintViolation
    );
}

#![forbid(unsafe_code)]

use super::StoreError;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;

pub(super) const SCHEMA_VERSION: i64 = 1;

const REQUIRED_TABLES: [&str; 4] = ["store_state", "spaces", "repositories", "webhooks"];

/// Refuses to open a database written by a different layout instead of
/// migrating it in place.
pub(super) fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let mut rows = stmt.query([])?;
    let mut tables = BTreeSet::new();
    while let Some(row) = rows.next()? {
        tables.insert(row.get::<_, String>(0)?);
    }

    if tables.is_empty() {
        return Ok(());
    }

    let required: BTreeSet<&str> = REQUIRED_TABLES.into_iter().collect();

    if tables
        .iter()
        .any(|table| !required.contains(table.as_str()))
    {
        return Err(StoreError::ResetRequired("unsupported tables detected"));
    }

    for table in required {
        if !tables.contains(table) {
            return Err(StoreError::ResetRequired("required table is missing"));
        }
    }

    let version = conn
        .query_row(
            "SELECT schema_version FROM store_state WHERE singleton=1",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    match version {
        Some(v) if v == SCHEMA_VERSION => Ok(()),
        Some(_) => Err(StoreError::ResetRequired("schema version mismatch")),
        None => Err(StoreError::ResetRequired("schema state row is missing")),
    }
}

pub(super) fn install_schema(conn: &Connection, now_ms: i64) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS store_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS spaces (
          space_id INTEGER PRIMARY KEY AUTOINCREMENT,
          space_parent_id INTEGER,
          space_path TEXT NOT NULL COLLATE NOCASE UNIQUE,
          space_created INTEGER NOT NULL,
          FOREIGN KEY(space_parent_id) REFERENCES spaces(space_id) ON DELETE CASCADE,
          CHECK(space_parent_id IS NULL OR space_parent_id <> space_id)
        );

        CREATE TABLE IF NOT EXISTS repositories (
          repo_id INTEGER PRIMARY KEY AUTOINCREMENT,
          repo_uid TEXT NOT NULL UNIQUE,
          repo_space_id INTEGER NOT NULL,
          repo_path TEXT NOT NULL COLLATE NOCASE UNIQUE,
          repo_is_public INTEGER NOT NULL DEFAULT 0,
          repo_default_branch TEXT NOT NULL,
          repo_created_by INTEGER NOT NULL,
          repo_created INTEGER NOT NULL,
          FOREIGN KEY(repo_space_id) REFERENCES spaces(space_id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS webhooks (
          webhook_id INTEGER PRIMARY KEY AUTOINCREMENT,
          webhook_version INTEGER NOT NULL DEFAULT 0,
          webhook_repo_id INTEGER,
          webhook_space_id INTEGER,
          webhook_created_by INTEGER NOT NULL,
          webhook_created INTEGER NOT NULL,
          webhook_updated INTEGER NOT NULL,
          webhook_url TEXT NOT NULL,
          webhook_secret TEXT NOT NULL,
          webhook_enabled INTEGER NOT NULL,
          webhook_insecure INTEGER NOT NULL,
          webhook_triggers TEXT NOT NULL,
          FOREIGN KEY(webhook_repo_id) REFERENCES repositories(repo_id) ON DELETE CASCADE,
          FOREIGN KEY(webhook_space_id) REFERENCES spaces(space_id) ON DELETE CASCADE,
          CHECK((webhook_repo_id IS NULL) <> (webhook_space_id IS NULL)),
          CHECK(webhook_version >= 0)
        );

        CREATE INDEX IF NOT EXISTS idx_webhooks_repo
          ON webhooks(webhook_repo_id, webhook_id);

        CREATE INDEX IF NOT EXISTS idx_webhooks_space
          ON webhooks(webhook_space_id, webhook_id);
        "#,
    )?;

    conn.execute(
        "INSERT INTO store_state(singleton, schema_version, created_at_ms, updated_at_ms) \
         VALUES (1, ?1, ?2, ?2) \
         ON CONFLICT(singleton) DO UPDATE SET schema_version=excluded.schema_version, updated_at_ms=excluded.updated_at_ms",
        params![SCHEMA_VERSION, now_ms],
    )?;

    Ok(())
}

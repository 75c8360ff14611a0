#![forbid(unsafe_code)]

//! Storage engine shared by every parent-scoped, optimistically versioned
//! entity kind.
//!
//! A kind owns one table whose columns are named `<prefix>_<column>`. The
//! first seven columns are fixed (see [`HEADER_COLUMNS`]); the kind's payload
//! columns follow. Updates are a single conditional `UPDATE ... WHERE id AND
//! version` statement: the row count is the only conflict signal.

use super::{SqliteStore, StoreConfig, StoreError, classify_sql, now_ms, to_sqlite_i64};
use gw_core::RequestContext;
use gw_core::model::{Pagination, Parent, ParentKind};
use rusqlite::types::{FromSql, Value};
use rusqlite::{Row, params, params_from_iter};

pub const INITIAL_VERSION: i64 = 0;

const HEADER_COLUMNS: [&str; 7] = [
    "id",
    "version",
    "repo_id",
    "space_id",
    "created_by",
    "created",
    "updated",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityHeader {
    pub id: i64,
    pub version: i64,
    pub parent: Parent,
    pub created_by: i64,
    pub created: i64,
    pub updated: i64,
}

/// Payload columns of one result row, indexed from the first payload column.
pub struct PayloadRow<'a, 'stmt> {
    row: &'a Row<'stmt>,
}

impl PayloadRow<'_, '_> {
    pub fn get<T: FromSql>(&self, index: usize) -> rusqlite::Result<T> {
        self.row.get(HEADER_COLUMNS.len() + index)
    }
}

pub trait VersionedEntity: Sized {
    const TABLE: &'static str;
    const PREFIX: &'static str;
    const PAYLOAD_COLUMNS: &'static [&'static str];

    fn header(&self) -> EntityHeader;

    fn set_header(&mut self, header: EntityHeader);

    /// Values bound to [`Self::PAYLOAD_COLUMNS`], in the same order.
    fn payload_values(&self) -> Vec<Value>;

    fn from_row(
        header: EntityHeader,
        payload: PayloadRow<'_, '_>,
        config: &StoreConfig,
    ) -> Result<Self, StoreError>;
}

fn column<E: VersionedEntity>(name: &str) -> String {
    format!("{}_{}", E::PREFIX, name)
}

fn select_columns<E: VersionedEntity>() -> String {
    HEADER_COLUMNS
        .iter()
        .chain(E::PAYLOAD_COLUMNS.iter())
        .map(|name| column::<E>(name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn parent_column<E: VersionedEntity>(kind: ParentKind) -> String {
    match kind {
        ParentKind::Repository => column::<E>("repo_id"),
        ParentKind::Space => column::<E>("space_id"),
    }
}

fn read_entity<E: VersionedEntity>(row: &Row<'_>, config: &StoreConfig) -> Result<E, StoreError> {
    let id: i64 = row.get(0)?;
    let repo_id: Option<i64> = row.get(2)?;
    let space_id: Option<i64> = row.get(3)?;
    let parent = Parent::from_columns(repo_id, space_id).map_err(|err| StoreError::CorruptRow {
        table: E::TABLE,
        id,
        reason: err.to_string(),
    })?;

    let header = EntityHeader {
        id,
        version: row.get(1)?,
        parent,
        created_by: row.get(4)?,
        created: row.get(5)?,
        updated: row.get(6)?,
    };
    E::from_row(header, PayloadRow { row }, config)
}

impl SqliteStore {
    pub fn find<E: VersionedEntity>(&self, ctx: &RequestContext, id: i64) -> Result<E, StoreError> {
        self.begin(ctx)?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            select_columns::<E>(),
            E::TABLE,
            column::<E>("id"),
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let mut rows = stmt
            .query(params![id])
            .map_err(|err| classify_sql(err, ctx))?;
        match rows.next().map_err(|err| classify_sql(err, ctx))? {
            Some(row) => read_entity(row, &self.config),
            None => Err(StoreError::NotFound),
        }
    }

    /// Inserts `entity`, assigning its id, the initial version and both
    /// timestamps.
    pub fn create<E: VersionedEntity>(
        &self,
        ctx: &RequestContext,
        entity: &mut E,
    ) -> Result<(), StoreError> {
        self.begin(ctx)?;
        let mut header = entity.header();
        let now = now_ms();
        header.version = INITIAL_VERSION;
        header.created = now;
        header.updated = now;

        let insert_columns: Vec<String> = HEADER_COLUMNS[1..]
            .iter()
            .chain(E::PAYLOAD_COLUMNS.iter())
            .map(|name| column::<E>(name))
            .collect();
        let placeholders: Vec<String> = (1..=insert_columns.len())
            .map(|index| format!("?{index}"))
            .collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            E::TABLE,
            insert_columns.join(", "),
            placeholders.join(", "),
        );

        let (repo_id, space_id) = header.parent.to_columns();
        let mut values: Vec<Value> = vec![
            Value::from(header.version),
            Value::from(repo_id),
            Value::from(space_id),
            Value::from(header.created_by),
            Value::from(header.created),
            Value::from(header.updated),
        ];
        values.extend(entity.payload_values());

        let mut stmt = self.conn.prepare_cached(&sql)?;
        stmt.execute(params_from_iter(values))
            .map_err(|err| classify_sql(err, ctx))?;

        header.id = self.conn.last_insert_rowid();
        entity.set_header(header);
        Ok(())
    }

    /// Conditional write keyed on `(id, version)`. `entity` carries the
    /// version its caller last observed; on success it is advanced by one and
    /// its `updated` stamp refreshed. A concurrent writer that got there first
    /// turns this into [`StoreError::Conflict`].
    pub fn update<E: VersionedEntity>(
        &self,
        ctx: &RequestContext,
        entity: &mut E,
    ) -> Result<(), StoreError> {
        self.begin(ctx)?;
        let mut header = entity.header();
        let observed = header.version;
        let next = observed
            .checked_add(1)
            .ok_or(StoreError::InvalidInput("version overflow"))?;
        // Stamps never move backwards, even if the wall clock does.
        let updated = now_ms().max(header.updated);

        let mut assignments = vec![
            format!("{} = ?1", column::<E>("version")),
            format!("{} = ?2", column::<E>("updated")),
        ];
        for (offset, name) in E::PAYLOAD_COLUMNS.iter().enumerate() {
            assignments.push(format!("{} = ?{}", column::<E>(name), offset + 3));
        }
        let id_index = E::PAYLOAD_COLUMNS.len() + 3;
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{} AND {} = ?{}",
            E::TABLE,
            assignments.join(", "),
            column::<E>("id"),
            id_index,
            column::<E>("version"),
            id_index + 1,
        );

        let mut values = vec![Value::from(next), Value::from(updated)];
        values.extend(entity.payload_values());
        values.push(Value::from(header.id));
        values.push(Value::from(next - 1));

        let mut stmt = self.conn.prepare_cached(&sql)?;
        let count = stmt
            .execute(params_from_iter(values))
            .map_err(|err| classify_sql(err, ctx))?;

        if count == 0 {
            tracing::debug!(
                table = E::TABLE,
                id = header.id,
                observed,
                "conditional update lost the race"
            );
            return Err(StoreError::Conflict {
                id: header.id,
                expected_version: observed,
            });
        }

        header.version = next;
        header.updated = updated;
        entity.set_header(header);
        Ok(())
    }

    /// Removes the row regardless of its version. Deleting a missing id is
    /// not an error.
    pub fn delete<E: VersionedEntity>(&self, ctx: &RequestContext, id: i64) -> Result<(), StoreError> {
        self.begin(ctx)?;
        let sql = format!("DELETE FROM {} WHERE {} = ?1", E::TABLE, column::<E>("id"));
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let count = stmt
            .execute(params![id])
            .map_err(|err| classify_sql(err, ctx))?;
        if count == 0 {
            tracing::debug!(table = E::TABLE, id, "delete matched no row");
        }
        Ok(())
    }

    /// Entities owned by `parent`, oldest (lowest id) first.
    pub fn list<E: VersionedEntity>(
        &self,
        ctx: &RequestContext,
        parent: Parent,
        pagination: Pagination,
    ) -> Result<Vec<E>, StoreError> {
        self.begin(ctx)?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1 ORDER BY {} ASC LIMIT ?2 OFFSET ?3",
            select_columns::<E>(),
            E::TABLE,
            parent_column::<E>(parent.kind()),
            column::<E>("id"),
        );
        let limit = i64::from(pagination.limit());
        let offset = to_sqlite_i64(pagination.offset())?;

        let mut stmt = self.conn.prepare_cached(&sql)?;
        let mut rows = stmt
            .query(params![parent.id(), limit, offset])
            .map_err(|err| classify_sql(err, ctx))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|err| classify_sql(err, ctx))? {
            out.push(read_entity(row, &self.config)?);
        }
        Ok(out)
    }

    pub fn count<E: VersionedEntity>(
        &self,
        ctx: &RequestContext,
        parent: Parent,
    ) -> Result<i64, StoreError> {
        self.begin(ctx)?;
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ?1",
            E::TABLE,
            parent_column::<E>(parent.kind()),
        );
        self.conn
            .query_row(&sql, params![parent.id()], |row| row.get::<_, i64>(0))
            .map_err(|err| classify_sql(err, ctx))
    }
}

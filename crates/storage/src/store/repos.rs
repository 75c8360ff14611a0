#![forbid(unsafe_code)]

use super::{
    CreateRepositoryRowRequest, CreateSpaceRequest, SqliteStore, StoreError, classify_sql,
    is_unique_violation,
};
use gw_core::RequestContext;
use gw_core::ids::{RepoUid, ResourcePath};
use gw_core::model::{Repository, Space};
use rusqlite::{OptionalExtension, Row, params};

const REPO_COLUMNS: &str = "repo_id, repo_uid, repo_space_id, repo_path, repo_is_public, \
     repo_default_branch, repo_created_by, repo_created";

impl SqliteStore {
    pub fn create_space(
        &self,
        ctx: &RequestContext,
        request: CreateSpaceRequest,
    ) -> Result<Space, StoreError> {
        self.begin(ctx)?;
        let path = ResourcePath::try_new(&request.path)
            .map_err(|err| StoreError::InvalidInput(err.message()))?;

        let insert = self.conn.execute(
            "INSERT INTO spaces(space_parent_id, space_path, space_created) VALUES (?1, ?2, ?3)",
            params![request.parent_id, path.as_str(), request.created_at_ms],
        );
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::AlreadyExists);
            }
            return Err(classify_sql(err, ctx));
        }

        Ok(Space {
            id: self.conn.last_insert_rowid(),
            parent_id: request.parent_id,
            path,
            created: request.created_at_ms,
        })
    }

    pub fn find_space(&self, ctx: &RequestContext, id: i64) -> Result<Space, StoreError> {
        self.begin(ctx)?;
        let row = self
            .conn
            .query_row(
                "SELECT space_id, space_parent_id, space_path, space_created FROM spaces WHERE space_id=?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<i64>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(|err| classify_sql(err, ctx))?;

        let Some((id, parent_id, path, created)) = row else {
            return Err(StoreError::NotFound);
        };
        Ok(Space {
            id,
            parent_id,
            path: ResourcePath::try_new(path).map_err(|err| StoreError::CorruptRow {
                table: "spaces",
                id,
                reason: err.message().to_string(),
            })?,
            created,
        })
    }

    pub fn find_space_by_path(&self, ctx: &RequestContext, path: &str) -> Result<Space, StoreError> {
        self.begin(ctx)?;
        let path = ResourcePath::try_new(path).map_err(|err| StoreError::InvalidInput(err.message()))?;
        let id = self
            .conn
            .query_row(
                "SELECT space_id FROM spaces WHERE space_path=?1",
                params![path.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .map_err(|err| classify_sql(err, ctx))?
            .ok_or(StoreError::NotFound)?;
        self.find_space(ctx, id)
    }

    pub fn create_repository_row(
        &self,
        ctx: &RequestContext,
        request: CreateRepositoryRowRequest,
    ) -> Result<Repository, StoreError> {
        self.begin(ctx)?;
        let uid = RepoUid::try_new(request.uid).map_err(|err| StoreError::InvalidInput(err.message()))?;
        let path = ResourcePath::try_new(&request.path)
            .map_err(|err| StoreError::InvalidInput(err.message()))?;
        if request.default_branch.trim().is_empty() {
            return Err(StoreError::InvalidInput("default branch must not be empty"));
        }

        let insert = self.conn.execute(
            "INSERT INTO repositories(repo_uid, repo_space_id, repo_path, repo_is_public, \
             repo_default_branch, repo_created_by, repo_created) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                uid.as_str(),
                request.space_id,
                path.as_str(),
                request.is_public,
                request.default_branch,
                request.created_by,
                request.created_at_ms,
            ],
        );
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::AlreadyExists);
            }
            return Err(classify_sql(err, ctx));
        }

        Ok(Repository {
            id: self.conn.last_insert_rowid(),
            uid,
            space_id: request.space_id,
            path,
            is_public: request.is_public,
            default_branch: request.default_branch,
            created_by: request.created_by,
            created: request.created_at_ms,
        })
    }

    pub fn find_repository(&self, ctx: &RequestContext, id: i64) -> Result<Repository, StoreError> {
        self.begin(ctx)?;
        let sql = format!("SELECT {REPO_COLUMNS} FROM repositories WHERE repo_id=?1");
        self.query_repository(ctx, &sql, params![id])
    }

    /// Resolves a caller-supplied reference: a decimal id, otherwise a
    /// repository path (case-insensitive).
    pub fn find_repository_by_ref(
        &self,
        ctx: &RequestContext,
        repo_ref: &str,
    ) -> Result<Repository, StoreError> {
        let repo_ref = repo_ref.trim();
        if let Ok(id) = repo_ref.parse::<i64>() {
            return self.find_repository(ctx, id);
        }

        self.begin(ctx)?;
        let path =
            ResourcePath::try_new(repo_ref).map_err(|err| StoreError::InvalidInput(err.message()))?;
        let sql = format!("SELECT {REPO_COLUMNS} FROM repositories WHERE repo_path=?1");
        self.query_repository(ctx, &sql, params![path.as_str()])
    }

    fn query_repository(
        &self,
        ctx: &RequestContext,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Repository, StoreError> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let mut rows = stmt.query(params).map_err(|err| classify_sql(err, ctx))?;
        match rows.next().map_err(|err| classify_sql(err, ctx))? {
            Some(row) => read_repository(row),
            None => Err(StoreError::NotFound),
        }
    }
}

fn read_repository(row: &Row<'_>) -> Result<Repository, StoreError> {
    let id: i64 = row.get(0)?;
    let corrupt = |reason: &str| StoreError::CorruptRow {
        table: "repositories",
        id,
        reason: reason.to_string(),
    };
    let uid = RepoUid::try_new(row.get::<_, String>(1)?).map_err(|err| corrupt(err.message()))?;
    let path =
        ResourcePath::try_new(row.get::<_, String>(3)?).map_err(|err| corrupt(err.message()))?;

    Ok(Repository {
        id,
        uid,
        space_id: row.get(2)?,
        path,
        is_public: row.get(4)?,
        default_branch: row.get(5)?,
        created_by: row.get(6)?,
        created: row.get(7)?,
    })
}

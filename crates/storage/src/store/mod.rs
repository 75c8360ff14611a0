#![forbid(unsafe_code)]

mod entity;
mod error;
mod repos;
mod requests;
mod schema;
mod webhooks;

pub use entity::{EntityHeader, INITIAL_VERSION, PayloadRow, VersionedEntity};
pub use error::StoreError;
pub use requests::*;

use gw_core::RequestContext;
use rusqlite::{Connection, ErrorCode};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DB_FILE_NAME: &str = "gitward.db";
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Upper bound on waiting for a locked database. A request deadline can
    /// only shorten it.
    pub busy_timeout: Duration,
    /// Fail reads on trigger names this build does not know instead of
    /// dropping them with a warning.
    pub strict_triggers: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            strict_triggers: false,
        }
    }
}

/// Metadata store over one SQLite file. Every method issues at most one
/// writing statement, so several stores (one per request flow) may share the
/// same file.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
    config: StoreConfig,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with(storage_dir, StoreConfig::default())
    }

    pub fn open_with(storage_dir: impl AsRef<Path>, config: StoreConfig) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let conn = Connection::open(storage_dir.join(DB_FILE_NAME))?;
        conn.busy_timeout(config.busy_timeout)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        // Readers must not block the conditional writers of other request flows.
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))?;

        schema::preflight_gate(&conn)?;
        schema::install_schema(&conn, now_ms())?;

        tracing::debug!(dir = %storage_dir.display(), "metadata store opened");
        Ok(Self {
            conn,
            storage_dir,
            config,
        })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Fails fast on a finished context and bounds SQLite's lock wait by the
    /// time the request has left.
    fn begin(&self, ctx: &RequestContext) -> Result<(), StoreError> {
        ctx.check()?;
        let wait = match ctx.remaining() {
            Some(remaining) => remaining.min(self.config.busy_timeout),
            None => self.config.busy_timeout,
        };
        self.conn.busy_timeout(wait)?;
        Ok(())
    }
}

/// Maps a SQLite failure raised while `ctx` was running. Lock waits cut short
/// by the request deadline surface as `Timeout`, not as a raw busy error.
fn classify_sql(err: rusqlite::Error, ctx: &RequestContext) -> StoreError {
    if is_busy(&err)
        && let Err(interrupted) = ctx.check()
    {
        return StoreError::Interrupted(interrupted);
    }
    if is_constraint_violation(&err) {
        return StoreError::ConstraintViolation(err.to_string());
    }
    StoreError::Sql(err)
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(code, _)
            if matches!(code.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, message) => {
            code.code == ErrorCode::ConstraintViolation
                || message.as_deref().is_some_and(|value| {
                    value.contains("UNIQUE constraint failed")
                        || value.contains("FOREIGN KEY constraint failed")
                        || value.contains("CHECK constraint failed")
                })
        }
        _ => false,
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, message) => message.as_deref().is_some_and(|value| {
            value.contains("UNIQUE constraint failed")
                || value.contains("PRIMARY KEY constraint failed")
        }),
        _ => false,
    }
}

fn to_sqlite_i64(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::InvalidInput("numeric overflow"))
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration,
        Err(_) => return 0,
    };

    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

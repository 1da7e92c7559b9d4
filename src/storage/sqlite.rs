//! SQLite backend.
//!
//! The campaign is a single row pinned to `id = 1`. Dedications keep their
//! list order through a `position` column. An empty dedications table reads
//! as "not stored yet", which is sound because dedications are never deleted.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::StorageError;
use crate::model::{CampaignRecord, Dedication, DedicationStatus};

use super::{RecordKind, RecordStore};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS campaign (
    id           INTEGER PRIMARY KEY CHECK (id = 1),
    goal         TEXT NOT NULL,
    raised       TEXT NOT NULL,
    last_updated TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS dedications (
    id       INTEGER PRIMARY KEY,
    title    TEXT NOT NULL,
    amount   TEXT NOT NULL,
    status   TEXT NOT NULL,
    phase    INTEGER NOT NULL,
    position INTEGER NOT NULL
);
";

/// Record store backed by a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and ensure the tables exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StorageError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, StorageError> {
            let conn = Connection::open(&path)?;
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })?;
            conn.execute_batch(SCHEMA)?;
            debug!(path = %path.display(), "SQLite schema ready");
            Ok(conn)
        })
        .await??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut guard)
        })
        .await?
    }
}

fn malformed(record: RecordKind, reason: impl Into<String>) -> StorageError {
    StorageError::Malformed {
        record,
        reason: reason.into(),
    }
}

fn parse_amount(text: &str) -> Result<Decimal, StorageError> {
    Decimal::from_str(text)
        .map_err(|e| malformed(RecordKind::Campaign, format!("bad amount '{}': {}", text, e)))
}

fn read_campaign(conn: &mut Connection) -> Result<Option<CampaignRecord>, StorageError> {
    let row = conn
        .query_row(
            "SELECT goal, raised, last_updated FROM campaign WHERE id = 1",
            [],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;

    match row {
        None => Ok(None),
        Some((goal, raised, last_updated)) => Ok(Some(CampaignRecord {
            goal: parse_amount(&goal)?,
            raised: parse_amount(&raised)?,
            last_updated,
        })),
    }
}

fn write_campaign(conn: &mut Connection, record: &CampaignRecord) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO campaign (id, goal, raised, last_updated) VALUES (1, ?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET
             goal = excluded.goal,
             raised = excluded.raised,
             last_updated = excluded.last_updated",
        params![
            record.goal.to_string(),
            record.raised.to_string(),
            record.last_updated
        ],
    )?;
    Ok(())
}

fn read_dedications(conn: &mut Connection) -> Result<Option<Vec<Dedication>>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT id, title, amount, status, phase FROM dedications ORDER BY position, id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, i64>(4)?,
        ))
    })?;

    let mut dedications = Vec::new();
    for row in rows {
        let (id, title, amount, status, phase) = row?;
        let kind = RecordKind::Dedications;
        dedications.push(Dedication {
            id: u64::try_from(id).map_err(|_| malformed(kind, format!("negative id {}", id)))?,
            title,
            amount,
            status: DedicationStatus::from_str(&status)
                .map_err(|_| malformed(kind, format!("unknown status '{}'", status)))?,
            phase: u32::try_from(phase)
                .map_err(|_| malformed(kind, format!("phase {} out of range", phase)))?,
        });
    }

    if dedications.is_empty() {
        Ok(None)
    } else {
        Ok(Some(dedications))
    }
}

fn write_dedications(
    conn: &mut Connection,
    dedications: &[Dedication],
) -> Result<(), StorageError> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM dedications", [])?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO dedications (id, title, amount, status, phase, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for (position, d) in dedications.iter().enumerate() {
            let id = i64::try_from(d.id)
                .map_err(|_| malformed(RecordKind::Dedications, format!("id {} too large", d.id)))?;
            stmt.execute(params![
                id,
                d.title,
                d.amount,
                d.status.to_string(),
                i64::from(d.phase),
                position as i64
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

#[async_trait]
impl RecordStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn load_campaign(&self) -> Result<Option<CampaignRecord>, StorageError> {
        self.with_conn(read_campaign).await
    }

    async fn save_campaign(&self, record: &CampaignRecord) -> Result<(), StorageError> {
        let record = record.clone();
        self.with_conn(move |conn| write_campaign(conn, &record)).await
    }

    async fn load_dedications(&self) -> Result<Option<Vec<Dedication>>, StorageError> {
        self.with_conn(read_dedications).await
    }

    async fn save_dedications(&self, dedications: &[Dedication]) -> Result<(), StorageError> {
        let dedications = dedications.to_vec();
        self.with_conn(move |conn| write_dedications(conn, &dedications))
            .await
    }
}

//! Storage layer for the campaign record and dedication collection.
//!
//! This module handles:
//! - The [`RecordStore`] contract every backend implements
//! - File, JSONBin, SQLite and in-memory backends
//! - [`StorageAdapter`]: seeding, id allocation and write serialization
//! - Backend selection with in-memory fallback

pub mod adapter;
pub mod file;
pub mod jsonbin;
pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use strum::Display;
use tracing::{info, warn};

use crate::config::{BackendKind, Config};
use crate::error::StorageError;
use crate::model::{CampaignRecord, Dedication};

pub use adapter::StorageAdapter;
pub use file::FileStore;
pub use jsonbin::JsonBinStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// The two logical records a backend persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
pub enum RecordKind {
    /// The campaign singleton.
    Campaign,
    /// The dedication collection.
    Dedications,
}

/// Raw persistence for one backend.
///
/// Loads return `Ok(None)` when nothing has been stored yet; seeding is the
/// caller's job. Saves always replace the full record.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn name(&self) -> &'static str;

    /// Read the campaign record, if one has been stored.
    async fn load_campaign(&self) -> Result<Option<CampaignRecord>, StorageError>;

    /// Replace the campaign record.
    async fn save_campaign(&self, record: &CampaignRecord) -> Result<(), StorageError>;

    /// Read the dedication collection, if one has been stored.
    async fn load_dedications(&self) -> Result<Option<Vec<Dedication>>, StorageError>;

    /// Replace the dedication collection.
    async fn save_dedications(&self, dedications: &[Dedication]) -> Result<(), StorageError>;
}

/// Build the configured backend, falling back to memory when it cannot be
/// constructed.
pub async fn build_store(config: &Config) -> Arc<dyn RecordStore> {
    let kind = match config.backend() {
        Ok(kind) => kind,
        Err(e) => {
            warn!("{}; using in-memory storage", e);
            return Arc::new(MemoryStore::new());
        }
    };

    match try_build_store(kind, config).await {
        Ok(store) => {
            info!(backend = store.name(), "Storage backend ready");
            store
        }
        Err(e) => {
            warn!(
                backend = %kind,
                error = %e,
                "Configured storage unavailable; falling back to in-memory storage"
            );
            Arc::new(MemoryStore::new())
        }
    }
}

/// Build exactly the requested backend, without fallback.
pub async fn try_build_store(
    kind: BackendKind,
    config: &Config,
) -> Result<Arc<dyn RecordStore>, StorageError> {
    let store: Arc<dyn RecordStore> = match kind {
        BackendKind::File => Arc::new(FileStore::open(&config.data_dir).await?),
        BackendKind::JsonBin => Arc::new(JsonBinStore::from_config(config)?),
        BackendKind::Sqlite => Arc::new(SqliteStore::open(&config.sqlite_path).await?),
        BackendKind::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}

//! Flat JSON file backend.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::StorageError;
use crate::model::{CampaignRecord, Dedication};

use super::{RecordKind, RecordStore};

/// Campaign file name inside the data directory.
pub const CAMPAIGN_FILE: &str = "campaign-data.json";

/// Dedications file name inside the data directory.
pub const DEDICATIONS_FILE: &str = "dedications-data.json";

/// Stores each record as a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StorageError::Io {
                path: dir.clone(),
                source,
            })?;
        Ok(Self { dir })
    }

    fn path_for(&self, kind: RecordKind) -> PathBuf {
        match kind {
            RecordKind::Campaign => self.dir.join(CAMPAIGN_FILE),
            RecordKind::Dedications => self.dir.join(DEDICATIONS_FILE),
        }
    }

    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    async fn read<T: DeserializeOwned>(&self, kind: RecordKind) -> Result<Option<T>, StorageError> {
        let path = self.path_for(kind);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No file yet");
                return Ok(None);
            }
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| StorageError::Malformed {
                record: kind,
                reason: e.to_string(),
            })
    }

    #[instrument(skip(self, value), fields(dir = %self.dir.display()))]
    async fn write<T: Serialize + ?Sized + Sync>(
        &self,
        kind: RecordKind,
        value: &T,
    ) -> Result<(), StorageError> {
        let path = self.path_for(kind);
        let body = serde_json::to_string_pretty(value)
            .map_err(|source| StorageError::Encode { record: kind, source })?;

        // Write beside the target and rename so readers never see a torn file.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|source| StorageError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| StorageError::Io { path, source })?;

        debug!(record = %kind, "File written");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn load_campaign(&self) -> Result<Option<CampaignRecord>, StorageError> {
        self.read(RecordKind::Campaign).await
    }

    async fn save_campaign(&self, record: &CampaignRecord) -> Result<(), StorageError> {
        self.write(RecordKind::Campaign, record).await
    }

    async fn load_dedications(&self) -> Result<Option<Vec<Dedication>>, StorageError> {
        self.read(RecordKind::Dedications).await
    }

    async fn save_dedications(&self, dedications: &[Dedication]) -> Result<(), StorageError> {
        self.write(RecordKind::Dedications, dedications).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DedicationStatus;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn missing_files_read_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        assert!(store.load_campaign().await.unwrap().is_none());
        assert!(store.load_dedications().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn writes_pretty_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        let record = CampaignRecord {
            goal: dec!(2000000),
            raised: dec!(1000000),
            last_updated: "2024-01-01".to_string(),
        };
        store.save_campaign(&record).await.unwrap();

        let text = std::fs::read_to_string(dir.path().join(CAMPAIGN_FILE)).unwrap();
        assert!(text.contains("\"lastUpdated\": \"2024-01-01\""));
        assert!(text.contains("\"goal\": 2000000"));
        assert_eq!(store.load_campaign().await.unwrap(), Some(record));
        assert!(!dir.path().join("campaign-data.json.tmp").exists());
    }

    #[tokio::test]
    async fn dedications_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let items = vec![Dedication {
            id: 3,
            title: "Basketball Court".to_string(),
            amount: "$250,000".to_string(),
            status: DedicationStatus::Available,
            phase: 1,
        }];
        store.save_dedications(&items).await.unwrap();

        let reopened = FileStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.load_dedications().await.unwrap(), Some(items));
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEDICATIONS_FILE), "{not json").unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        let err = store.load_dedications().await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Malformed {
                record: RecordKind::Dedications,
                ..
            }
        ));
    }
}

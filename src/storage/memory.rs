//! In-memory backend. Contents are lost when the process exits.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::model::{CampaignRecord, Dedication};

use super::RecordStore;

/// Process-local record store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    campaign: RwLock<Option<CampaignRecord>>,
    dedications: RwLock<Option<Vec<Dedication>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with records.
    pub fn with_records(
        campaign: Option<CampaignRecord>,
        dedications: Option<Vec<Dedication>>,
    ) -> Self {
        Self {
            campaign: RwLock::new(campaign),
            dedications: RwLock::new(dedications),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load_campaign(&self) -> Result<Option<CampaignRecord>, StorageError> {
        Ok(self.campaign.read().await.clone())
    }

    async fn save_campaign(&self, record: &CampaignRecord) -> Result<(), StorageError> {
        *self.campaign.write().await = Some(record.clone());
        Ok(())
    }

    async fn load_dedications(&self) -> Result<Option<Vec<Dedication>>, StorageError> {
        Ok(self.dedications.read().await.clone())
    }

    async fn save_dedications(&self, dedications: &[Dedication]) -> Result<(), StorageError> {
        *self.dedications.write().await = Some(dedications.to_vec());
        Ok(())
    }
}

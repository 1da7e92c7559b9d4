//! Uniform data-access operations over any [`RecordStore`].

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::error::StorageError;
use crate::metrics;
use crate::model::{
    next_dedication_id, CampaignRecord, Dedication, DedicationUpdate, NewDedication, SeedData,
};

use super::RecordStore;

/// Data-access layer shared by all request handlers.
///
/// Each logical record has its own write lock: read-modify-write sequences
/// (seeding, id allocation, replacement by id) run one at a time per record,
/// while the campaign and the dedications never block each other.
#[derive(Clone)]
pub struct StorageAdapter {
    store: Arc<dyn RecordStore>,
    seed: Arc<SeedData>,
    campaign_lock: Arc<Mutex<()>>,
    dedications_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for StorageAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageAdapter")
            .field("backend", &self.store.name())
            .field("seed_dedications", &self.seed.dedications.len())
            .finish()
    }
}

impl StorageAdapter {
    /// Wrap a backend with the given seed data.
    pub fn new(store: Arc<dyn RecordStore>, seed: SeedData) -> Self {
        Self {
            store,
            seed: Arc::new(seed),
            campaign_lock: Arc::new(Mutex::new(())),
            dedications_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Name of the underlying backend.
    pub fn backend_name(&self) -> &'static str {
        self.store.name()
    }

    /// Current campaign record, seeding the default on first access.
    #[instrument(skip(self), fields(backend = self.store.name()))]
    pub async fn get_campaign(&self) -> Result<CampaignRecord, StorageError> {
        let _guard = self.campaign_lock.lock().await;
        let start = Instant::now();

        let result = match self.store.load_campaign().await? {
            Some(record) => record,
            None => {
                let record = self.seed.campaign();
                self.store.save_campaign(&record).await?;
                info!("Campaign record seeded with defaults");
                record
            }
        };

        metrics::record_storage_latency(start, "get_campaign");
        Ok(result)
    }

    /// Replace the campaign record wholesale.
    #[instrument(skip(self, record), fields(backend = self.store.name()))]
    pub async fn set_campaign(
        &self,
        record: CampaignRecord,
    ) -> Result<CampaignRecord, StorageError> {
        let _guard = self.campaign_lock.lock().await;
        let start = Instant::now();

        self.store.save_campaign(&record).await?;

        metrics::record_storage_latency(start, "set_campaign");
        debug!(goal = %record.goal, raised = %record.raised, "Campaign replaced");
        Ok(record)
    }

    /// Full dedication collection, seeding the default list on first access.
    #[instrument(skip(self), fields(backend = self.store.name()))]
    pub async fn list_dedications(&self) -> Result<Vec<Dedication>, StorageError> {
        let _guard = self.dedications_lock.lock().await;
        let start = Instant::now();

        let result = self.load_or_seed_dedications().await?;

        metrics::record_storage_latency(start, "list_dedications");
        Ok(result)
    }

    /// Replace the dedication with id `id`, all under one lock hold.
    ///
    /// Returns `None` without writing when no entry has that id. An omitted
    /// phase keeps the stored one.
    #[instrument(skip(self, update), fields(backend = self.store.name()))]
    pub async fn replace_dedication(
        &self,
        id: u64,
        update: DedicationUpdate,
    ) -> Result<Option<Dedication>, StorageError> {
        let _guard = self.dedications_lock.lock().await;
        let start = Instant::now();

        let mut dedications = self.load_or_seed_dedications().await?;
        let replaced = match dedications.iter_mut().find(|d| d.id == id) {
            Some(slot) => {
                *slot = update.apply_to(slot);
                let replaced = slot.clone();
                self.store.save_dedications(&dedications).await?;
                debug!("Dedication replaced");
                Some(replaced)
            }
            None => {
                debug!("Dedication id not present; nothing written");
                None
            }
        };

        metrics::record_storage_latency(start, "replace_dedication");
        Ok(replaced)
    }

    /// Append a dedication under a freshly allocated id.
    #[instrument(skip(self, new), fields(backend = self.store.name()))]
    pub async fn add_dedication(&self, new: NewDedication) -> Result<Dedication, StorageError> {
        let _guard = self.dedications_lock.lock().await;
        let start = Instant::now();

        let mut dedications = self.load_or_seed_dedications().await?;
        let dedication = new.with_id(next_dedication_id(&dedications));
        dedications.push(dedication.clone());
        self.store.save_dedications(&dedications).await?;

        metrics::record_storage_latency(start, "add_dedication");
        debug!(id = dedication.id, "Dedication appended");
        Ok(dedication)
    }

    /// Caller must hold `dedications_lock`.
    async fn load_or_seed_dedications(&self) -> Result<Vec<Dedication>, StorageError> {
        match self.store.load_dedications().await? {
            Some(dedications) => Ok(dedications),
            None => {
                let dedications = self.seed.dedications.clone();
                self.store.save_dedications(&dedications).await?;
                info!(count = dedications.len(), "Dedications seeded with defaults");
                Ok(dedications)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DedicationStatus;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn adapter() -> (StorageAdapter, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let adapter = StorageAdapter::new(store.clone(), SeedData::builtin().unwrap());
        (adapter, store)
    }

    fn new_item(title: &str) -> NewDedication {
        NewDedication {
            title: title.to_string(),
            amount: "$50,000".to_string(),
            status: DedicationStatus::Available,
            phase: 1,
        }
    }

    #[tokio::test]
    async fn get_campaign_seeds_and_persists() {
        let (adapter, store) = adapter();
        let first = adapter.get_campaign().await.unwrap();
        assert_eq!(first.goal, dec!(1800000));
        assert_eq!(store.load_campaign().await.unwrap(), Some(first.clone()));
        assert_eq!(adapter.get_campaign().await.unwrap(), first);
    }

    #[tokio::test]
    async fn set_campaign_replaces_wholesale() {
        let (adapter, _) = adapter();
        let record = CampaignRecord {
            goal: dec!(2000000),
            raised: dec!(1000000),
            last_updated: "2024-01-01".to_string(),
        };
        assert_eq!(adapter.set_campaign(record.clone()).await.unwrap(), record);
        assert_eq!(adapter.get_campaign().await.unwrap(), record);
    }

    #[tokio::test]
    async fn list_seeds_fifteen_items() {
        let (adapter, store) = adapter();
        let items = adapter.list_dedications().await.unwrap();
        assert_eq!(items.len(), 15);
        assert_eq!(store.load_dedications().await.unwrap().unwrap().len(), 15);
    }

    #[tokio::test]
    async fn add_allocates_max_plus_one() {
        let (adapter, _) = adapter();
        let added = adapter.add_dedication(new_item("Test")).await.unwrap();
        assert_eq!(added.id, 16);
        assert_eq!(added.phase, 1);

        let items = adapter.list_dedications().await.unwrap();
        assert_eq!(items.len(), 16);
        assert_eq!(items.last(), Some(&added));
    }

    #[tokio::test]
    async fn add_on_empty_collection_starts_at_one() {
        let store = Arc::new(MemoryStore::with_records(None, Some(vec![])));
        let adapter = StorageAdapter::new(store, SeedData::builtin().unwrap());
        let added = adapter.add_dedication(new_item("First")).await.unwrap();
        assert_eq!(added.id, 1);
    }

    fn update(status: DedicationStatus, phase: Option<u32>) -> DedicationUpdate {
        DedicationUpdate {
            title: "Gymnasium".to_string(),
            amount: "$4,000,000".to_string(),
            status,
            phase,
        }
    }

    #[tokio::test]
    async fn replace_updates_matching_entry() {
        let (adapter, _) = adapter();
        let replaced = adapter
            .replace_dedication(15, update(DedicationStatus::Pending, None))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(replaced.id, 15);
        assert_eq!(replaced.title, "Gymnasium");
        assert_eq!(replaced.phase, 2);

        let items = adapter.list_dedications().await.unwrap();
        assert_eq!(items.len(), 15);
        assert_eq!(items.iter().find(|d| d.id == 15), Some(&replaced));
    }

    #[tokio::test]
    async fn replace_unknown_id_writes_nothing() {
        let (adapter, store) = adapter();
        let before = adapter.list_dedications().await.unwrap();

        let result = adapter
            .replace_dedication(9999, update(DedicationStatus::Sold, Some(1)))
            .await
            .unwrap();
        assert_eq!(result, None);
        assert_eq!(store.load_dedications().await.unwrap(), Some(before));
    }

    #[tokio::test]
    async fn concurrent_replaces_never_restore_a_stale_phase() {
        let (adapter, _) = adapter();
        let set_phase = adapter.clone();
        let keep_phase = adapter.clone();

        let explicit = tokio::spawn(async move {
            set_phase
                .replace_dedication(15, update(DedicationStatus::Sold, Some(3)))
                .await
        });
        let omitted = tokio::spawn(async move {
            keep_phase
                .replace_dedication(15, update(DedicationStatus::Pending, None))
                .await
        });
        explicit.await.unwrap().unwrap();
        omitted.await.unwrap().unwrap();

        // Whichever ran second, the phase-3 write is never undone.
        let gym = adapter
            .list_dedications()
            .await
            .unwrap()
            .into_iter()
            .find(|d| d.id == 15)
            .unwrap();
        assert_eq!(gym.phase, 3);
    }

    #[tokio::test]
    async fn concurrent_adds_get_distinct_ids() {
        let (adapter, _) = adapter();
        let mut handles = Vec::new();
        for i in 0..20 {
            let adapter = adapter.clone();
            handles.push(tokio::spawn(async move {
                adapter.add_dedication(new_item(&format!("Item {i}"))).await
            }));
        }

        let mut ids = HashSet::new();
        for handle in handles {
            let added = handle.await.unwrap().unwrap();
            assert!(ids.insert(added.id), "duplicate id {}", added.id);
        }
        assert_eq!(ids, (16..=35).collect::<HashSet<u64>>());

        let items = adapter.list_dedications().await.unwrap();
        assert_eq!(items.len(), 35);
        assert!(items.iter().all(|d| d.phase >= 1));
    }

    /// Store whose writes always fail.
    struct ReadOnlyStore {
        writes: AtomicUsize,
    }

    #[async_trait]
    impl RecordStore for ReadOnlyStore {
        fn name(&self) -> &'static str {
            "read-only"
        }

        async fn load_campaign(&self) -> Result<Option<CampaignRecord>, StorageError> {
            Ok(None)
        }

        async fn save_campaign(&self, _record: &CampaignRecord) -> Result<(), StorageError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(StorageError::Unconfigured("read-only".to_string()))
        }

        async fn load_dedications(&self) -> Result<Option<Vec<Dedication>>, StorageError> {
            Ok(None)
        }

        async fn save_dedications(&self, _dedications: &[Dedication]) -> Result<(), StorageError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(StorageError::Unconfigured("read-only".to_string()))
        }
    }

    #[tokio::test]
    async fn failed_writes_surface_once() {
        let store = Arc::new(ReadOnlyStore {
            writes: AtomicUsize::new(0),
        });
        let adapter = StorageAdapter::new(store.clone(), SeedData::builtin().unwrap());

        assert!(adapter.get_campaign().await.is_err());
        assert!(adapter.add_dedication(new_item("X")).await.is_err());
        assert_eq!(store.writes.load(Ordering::SeqCst), 2);
    }
}

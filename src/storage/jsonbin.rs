//! JSONBin.io backend: each record lives in its own bin.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::StorageError;
use crate::metrics;
use crate::model::{CampaignRecord, Dedication};

use super::{RecordKind, RecordStore};

/// Header carrying the account key.
const MASTER_KEY_HEADER: &str = "X-Master-Key";
/// Header asking for the bare record without metadata wrapper.
const BIN_META_HEADER: &str = "X-Bin-Meta";
/// Header naming a bin on creation.
const BIN_NAME_HEADER: &str = "X-Bin-Name";
/// Longest error body kept in a [`StorageError::Status`].
const MAX_ERROR_BODY: usize = 256;

/// Response to a bin creation request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBinResponse {
    /// Bin metadata.
    pub metadata: BinMetadata,
}

/// Metadata JSONBin returns for a bin.
#[derive(Debug, Clone, Deserialize)]
pub struct BinMetadata {
    /// Bin id.
    pub id: String,
}

/// JSONBin v3 client storing the campaign and dedications in two bins.
#[derive(Debug, Clone)]
pub struct JsonBinStore {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// API base URL, without trailing slash.
    base_url: String,
    /// Account master key.
    api_key: String,
    /// Bin holding the campaign record.
    campaign_bin: String,
    /// Bin holding the dedication list.
    dedications_bin: String,
}

impl JsonBinStore {
    /// Create a store from explicit settings.
    pub fn new(
        base_url: &str,
        api_key: &str,
        campaign_bin: &str,
        dedications_bin: &str,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(2))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            campaign_bin: campaign_bin.to_string(),
            dedications_bin: dedications_bin.to_string(),
        })
    }

    /// Create a store from configuration; fails if key or bin ids are missing.
    pub fn from_config(config: &Config) -> Result<Self, StorageError> {
        if !config.jsonbin_configured() {
            return Err(StorageError::Unconfigured(
                "JSONBIN_API_KEY, JSONBIN_CAMPAIGN_BIN_ID and JSONBIN_DEDICATIONS_BIN_ID are required"
                    .to_string(),
            ));
        }

        Self::new(
            &config.jsonbin_base_url,
            config.jsonbin_api_key.as_deref().unwrap_or_default(),
            config.jsonbin_campaign_bin_id.as_deref().unwrap_or_default(),
            config.jsonbin_dedications_bin_id.as_deref().unwrap_or_default(),
            Duration::from_millis(config.http_timeout_ms),
        )
    }

    fn bin_for(&self, kind: RecordKind) -> &str {
        match kind {
            RecordKind::Campaign => &self.campaign_bin,
            RecordKind::Dedications => &self.dedications_bin,
        }
    }

    #[instrument(skip(self), fields(bin = %self.bin_for(kind)))]
    async fn fetch<T: DeserializeOwned>(
        &self,
        kind: RecordKind,
    ) -> Result<Option<T>, StorageError> {
        let url = format!("{}/b/{}/latest", self.base_url, self.bin_for(kind));
        let start = std::time::Instant::now();

        let response = self
            .http
            .get(&url)
            .header(MASTER_KEY_HEADER, &self.api_key)
            .header(BIN_META_HEADER, "false")
            .send()
            .await?;
        metrics::record_remote_latency(start, "get");

        if response.status() == StatusCode::NOT_FOUND {
            debug!(record = %kind, "Bin not found");
            return Ok(None);
        }
        let response = check_status(kind, response).await?;

        let value: Value = response.json().await.map_err(|e| StorageError::Malformed {
            record: kind,
            reason: e.to_string(),
        })?;
        decode_record(kind, value)
    }

    #[instrument(skip(self, value), fields(bin = %self.bin_for(kind)))]
    async fn put<T: Serialize + ?Sized + Sync>(
        &self,
        kind: RecordKind,
        value: &T,
    ) -> Result<(), StorageError> {
        let url = format!("{}/b/{}", self.base_url, self.bin_for(kind));
        let start = std::time::Instant::now();

        let response = self
            .http
            .put(&url)
            .header(MASTER_KEY_HEADER, &self.api_key)
            .json(value)
            .send()
            .await?;
        metrics::record_remote_latency(start, "put");

        check_status(kind, response).await?;
        debug!(record = %kind, "Bin updated");
        Ok(())
    }

    /// Create a new bin holding `value` and return its id.
    pub async fn create_bin<T: Serialize + ?Sized>(
        http: &reqwest::Client,
        base_url: &str,
        api_key: &str,
        name: &str,
        kind: RecordKind,
        value: &T,
    ) -> Result<String, StorageError> {
        let url = format!("{}/b", base_url.trim_end_matches('/'));
        let response = http
            .post(&url)
            .header(MASTER_KEY_HEADER, api_key)
            .header(BIN_NAME_HEADER, name)
            .json(value)
            .send()
            .await?;

        let response = check_status(kind, response).await?;
        let created: CreateBinResponse =
            response.json().await.map_err(|e| StorageError::Malformed {
                record: kind,
                reason: e.to_string(),
            })?;
        Ok(created.metadata.id)
    }
}

async fn check_status(
    kind: RecordKind,
    response: reqwest::Response,
) -> Result<reqwest::Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Err(StorageError::Status {
        record: kind,
        status: status.as_u16(),
        body,
    })
}

/// Decode a bin body. `null` means the bin holds nothing yet; a
/// metadata-wrapped `{"record": ...}` body is unwrapped.
fn decode_record<T: DeserializeOwned>(
    kind: RecordKind,
    value: Value,
) -> Result<Option<T>, StorageError> {
    let value = match value {
        Value::Null => return Ok(None),
        Value::Object(mut map) if map.contains_key("record") && map.contains_key("metadata") => {
            map.remove("record").unwrap_or(Value::Null)
        }
        other => other,
    };
    if value.is_null() {
        return Ok(None);
    }

    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| StorageError::Malformed {
            record: kind,
            reason: e.to_string(),
        })
}

#[async_trait]
impl RecordStore for JsonBinStore {
    fn name(&self) -> &'static str {
        "jsonbin"
    }

    async fn load_campaign(&self) -> Result<Option<CampaignRecord>, StorageError> {
        self.fetch(RecordKind::Campaign).await
    }

    async fn save_campaign(&self, record: &CampaignRecord) -> Result<(), StorageError> {
        self.put(RecordKind::Campaign, record).await
    }

    async fn load_dedications(&self) -> Result<Option<Vec<Dedication>>, StorageError> {
        self.fetch(RecordKind::Dedications).await
    }

    async fn save_dedications(&self, dedications: &[Dedication]) -> Result<(), StorageError> {
        self.put(RecordKind::Dedications, dedications).await
    }
}

//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use strum::{Display, EnumString};

use crate::error::AppError;
use crate::model::seed::{DEFAULT_GOAL, DEFAULT_RAISED};

/// Storage backend selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BackendKind {
    /// JSON files under `DATA_DIR`.
    File,
    /// JSONBin.io remote bins.
    #[strum(serialize = "jsonbin")]
    JsonBin,
    /// SQLite database at `SQLITE_PATH`.
    Sqlite,
    /// Process-local memory.
    Memory,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Server Configuration ===
    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins, comma-separated.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,

    // === Storage ===
    /// Backend name: file, jsonbin, sqlite or memory.
    #[serde(default = "default_backend")]
    pub storage_backend: String,

    /// Directory holding the JSON files of the file backend.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Database file of the sqlite backend.
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,

    // === JSONBin ===
    /// JSONBin master key.
    #[serde(default)]
    pub jsonbin_api_key: Option<String>,

    /// Bin holding the campaign record.
    #[serde(default)]
    pub jsonbin_campaign_bin_id: Option<String>,

    /// Bin holding the dedication list.
    #[serde(default)]
    pub jsonbin_dedications_bin_id: Option<String>,

    /// JSONBin API base URL.
    #[serde(default = "default_jsonbin_url")]
    pub jsonbin_base_url: String,

    /// Remote store request timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    // === Seed Data ===
    /// Optional JSON file replacing the built-in dedication list.
    #[serde(default)]
    pub dedications_seed_path: Option<PathBuf>,

    /// Goal of the seeded campaign record.
    #[serde(default = "default_seed_goal")]
    pub seed_goal: Decimal,

    /// Raised amount of the seeded campaign record.
    #[serde(default = "default_seed_raised")]
    pub seed_raised: Decimal,

    // === Logging ===
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Log output format: "text" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_port() -> u16 {
    3001
}

fn default_cors_origins() -> String {
    "https://campexpansion.com,http://localhost:3000".to_string()
}

fn default_backend() -> String {
    "file".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("campaign.db")
}

fn default_jsonbin_url() -> String {
    "https://api.jsonbin.io/v3".to_string()
}

fn default_http_timeout_ms() -> u64 {
    5000
}

fn default_seed_goal() -> Decimal {
    DEFAULT_GOAL
}

fn default_seed_raised() -> Decimal {
    DEFAULT_RAISED
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            cors_origins: default_cors_origins(),
            storage_backend: default_backend(),
            data_dir: default_data_dir(),
            sqlite_path: default_sqlite_path(),
            jsonbin_api_key: None,
            jsonbin_campaign_bin_id: None,
            jsonbin_dedications_bin_id: None,
            jsonbin_base_url: default_jsonbin_url(),
            http_timeout_ms: default_http_timeout_ms(),
            dedications_seed_path: None,
            seed_goal: default_seed_goal(),
            seed_raised: default_seed_raised(),
            rust_log: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Ok(envy::from_env()?)
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), AppError> {
        let invalid = |msg: String| Err(AppError::InvalidConfig(msg));

        if self.port == 0 {
            return invalid("PORT must be non-zero".to_string());
        }

        self.backend().map_err(AppError::InvalidConfig)?;

        if let Err(e) = url::Url::parse(&self.jsonbin_base_url) {
            return invalid(format!("JSONBIN_BASE_URL is not a valid URL: {}", e));
        }

        if self.http_timeout_ms == 0 {
            return invalid("HTTP_TIMEOUT_MS must be non-zero".to_string());
        }

        if !matches!(self.log_format.as_str(), "text" | "json") {
            return invalid("LOG_FORMAT must be text or json".to_string());
        }

        Ok(())
    }

    /// Parsed storage backend.
    pub fn backend(&self) -> Result<BackendKind, String> {
        BackendKind::from_str(self.storage_backend.trim()).map_err(|_| {
            format!(
                "STORAGE_BACKEND must be file, jsonbin, sqlite or memory (got '{}')",
                self.storage_backend
            )
        })
    }

    /// Whether logs should be emitted as JSON lines.
    pub fn json_logs(&self) -> bool {
        self.log_format == "json"
    }

    /// CORS origins as a list, ignoring blanks.
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Whether both JSONBin bin ids and the key are present.
    pub fn jsonbin_configured(&self) -> bool {
        [
            &self.jsonbin_api_key,
            &self.jsonbin_campaign_bin_id,
            &self.jsonbin_dedications_bin_id,
        ]
        .iter()
        .all(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

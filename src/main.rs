//! Campaign backend entry point.

use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use campaign_backend::api::{apply_http_layers, create_router, AppState};
use campaign_backend::config::{BackendKind, Config};
use campaign_backend::metrics;
use campaign_backend::model::{SeedData, DEFAULT_PHASE};
use campaign_backend::storage::{build_store, JsonBinStore, RecordKind, StorageAdapter};
use campaign_backend::utils::{mask_secret, shutdown_signal};

/// Campaign progress and dedication API.
#[derive(Parser, Debug)]
#[command(name = "campaign-backend")]
#[command(about = "HTTP API for campaign progress and dedications")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port (overrides PORT).
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve {
        /// HTTP server port (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,

        /// Storage backend (overrides STORAGE_BACKEND).
        #[arg(long)]
        backend: Option<String>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Create JSONBin bins seeded with the default records.
    SetupBins,

    /// Exercise a running server end to end.
    Smoke {
        /// Server base URL.
        #[arg(long, env = "TEST_URL", default_value = "http://localhost:3001")]
        url: String,

        /// Only issue GET requests.
        #[arg(long)]
        read_only: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging; load errors are reported again by each command.
    let log_config = Config::load().unwrap_or_default();
    let filter = if args.verbose {
        EnvFilter::new("campaign_backend=debug,info")
    } else {
        EnvFilter::try_new(&log_config.rust_log).unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let json_logs = log_config.json_logs();

    tracing_subscriber::registry()
        .with(json_logs.then(|| fmt::layer().json()))
        .with((!json_logs).then(|| fmt::layer()))
        .with(filter)
        .init();

    // Handle subcommands
    match args.command {
        Some(Command::Serve { port, backend }) => cmd_serve(port.or(args.port), backend).await,
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::SetupBins) => cmd_setup_bins().await,
        Some(Command::Smoke { url, read_only }) => cmd_smoke(&url, read_only).await,
        None => cmd_serve(args.port, None).await,
    }
}

/// Seed data from configuration.
fn load_seed(config: &Config) -> anyhow::Result<SeedData> {
    let seed = match &config.dedications_seed_path {
        Some(path) => {
            info!(path = %path.display(), "Loading dedication seed file");
            SeedData::from_file(path, config.seed_goal, config.seed_raised)?
        }
        None => SeedData {
            goal: config.seed_goal,
            raised: config.seed_raised,
            ..SeedData::builtin()?
        },
    };
    Ok(seed)
}

/// Run the HTTP server.
async fn cmd_serve(
    port_override: Option<u16>,
    backend_override: Option<String>,
) -> anyhow::Result<()> {
    // Load configuration
    info!("Loading configuration...");
    let mut config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    // Override with CLI args if provided
    if let Some(port) = port_override {
        config.port = port;
    }
    if let Some(backend) = backend_override {
        config.storage_backend = backend;
    }

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    let handle = match metrics::install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics recorder not installed: {}", e);
            None
        }
    };

    let seed = load_seed(&config)?;
    let store = build_store(&config).await;
    let storage = StorageAdapter::new(store, seed);
    info!(backend = storage.backend_name(), "Storage initialized");

    let mut app_state = AppState::new(storage);
    if let Some(handle) = handle {
        app_state = app_state.with_metrics(handle);
    }

    let router = apply_http_layers(create_router(app_state), &config.cors_origin_list());

    // Start HTTP server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("Server running on port {}", config.port);
    info!("API available at http://localhost:{}/api", config.port);
    info!("Health check: http://localhost:{}/api/health", config.port);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("CAMPAIGN BACKEND - CONFIGURATION CHECK");
    println!("======================================================================");

    // Load configuration
    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    // Validate configuration
    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    // Check seed data
    print!("Loading seed data... ");
    match load_seed(&config) {
        Ok(seed) => {
            println!("OK");
            println!("  Seed dedications: {}", seed.dedications.len());
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Seed data invalid"));
        }
    }

    let backend = config.backend().map_err(|e| anyhow::anyhow!(e))?;

    // Show configuration summary
    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Port: {}", config.port);
    println!("  Storage Backend: {}", backend);
    match backend {
        BackendKind::File => println!("  Data Dir: {}", config.data_dir.display()),
        BackendKind::Sqlite => println!("  SQLite Path: {}", config.sqlite_path.display()),
        BackendKind::JsonBin => {
            println!("  JSONBin URL: {}", config.jsonbin_base_url);
            println!(
                "  JSONBin Key: {}",
                config
                    .jsonbin_api_key
                    .as_deref()
                    .map(mask_secret)
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            if !config.jsonbin_configured() {
                println!("  WARNING: JSONBin is not fully configured; memory will be used!");
            }
        }
        BackendKind::Memory => println!("  WARNING: data is lost on restart"),
    }
    println!("  CORS Origins: {}", config.cors_origin_list().join(", "));
    println!("  Seed Goal: {}", config.seed_goal);
    println!("  Seed Raised: {}", config.seed_raised);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Create the two JSONBin bins and print their ids.
async fn cmd_setup_bins() -> anyhow::Result<()> {
    let config = Config::load()?;
    let api_key = config
        .jsonbin_api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("JSONBIN_API_KEY is required"))?;

    let seed = load_seed(&config)?;
    let http = reqwest::Client::new();

    println!("Setting up JSONBin bins...");
    let campaign_bin = JsonBinStore::create_bin(
        &http,
        &config.jsonbin_base_url,
        api_key,
        "Campaign Data",
        RecordKind::Campaign,
        &seed.campaign(),
    )
    .await?;
    println!("Created campaign bin with ID: {}", campaign_bin);

    let dedications_bin = JsonBinStore::create_bin(
        &http,
        &config.jsonbin_base_url,
        api_key,
        "Dedications Data",
        RecordKind::Dedications,
        &seed.dedications,
    )
    .await?;
    println!("Created dedications bin with ID: {}", dedications_bin);

    println!();
    println!("Add these to your environment:");
    println!("JSONBIN_CAMPAIGN_BIN_ID={}", campaign_bin);
    println!("JSONBIN_DEDICATIONS_BIN_ID={}", dedications_bin);
    Ok(())
}

/// Exercise a running server and report each step.
async fn cmd_smoke(base_url: &str, read_only: bool) -> anyhow::Result<()> {
    let base = base_url.trim_end_matches('/');
    let http = reqwest::Client::new();
    println!("Testing campaign API at {}", base);

    println!("\n1. Testing health endpoint...");
    let health: Value = http.get(format!("{base}/api/health")).send().await?.json().await?;
    expect_success(&health, "health")?;
    println!("OK Health check: {}", health["message"]);

    println!("\n2. Testing get campaign data...");
    let campaign: Value = http
        .get(format!("{base}/api/campaign-data"))
        .send()
        .await?
        .json()
        .await?;
    expect_success(&campaign, "campaign-data")?;
    println!("OK Campaign data: {}", campaign["data"]);

    println!("\n3. Testing get dedications...");
    let dedications: Value = http
        .get(format!("{base}/api/dedications"))
        .send()
        .await?
        .json()
        .await?;
    expect_success(&dedications, "dedications")?;
    let count = dedications["data"].as_array().map(Vec::len).unwrap_or(0);
    println!("OK Dedications count: {}", count);

    if read_only {
        println!("\nRead-only checks passed");
        return Ok(());
    }

    println!("\n4. Testing update campaign...");
    let updated: Value = http
        .post(format!("{base}/api/update-campaign"))
        .json(&campaign["data"])
        .send()
        .await?
        .json()
        .await?;
    expect_success(&updated, "update-campaign")?;
    println!("OK Campaign updated: {}", updated["message"]);

    println!("\n5. Testing add dedication...");
    let added: Value = http
        .post(format!("{base}/api/add-dedication"))
        .json(&json!({
            "title": "Test Dedication",
            "amount": "$50,000",
            "status": "available",
            "phase": DEFAULT_PHASE,
        }))
        .send()
        .await?
        .json()
        .await?;
    expect_success(&added, "add-dedication")?;
    println!("OK Dedication added: id {}", added["data"]["id"]);

    println!("\n6. Testing update dedication...");
    let mut change = added["data"].clone();
    change["status"] = json!("sold");
    let changed: Value = http
        .post(format!("{base}/api/update-dedication"))
        .json(&change)
        .send()
        .await?
        .json()
        .await?;
    expect_success(&changed, "update-dedication")?;
    println!("OK Dedication updated: {}", changed["message"]);

    println!("\nAll API checks passed");
    Ok(())
}

fn expect_success(body: &Value, step: &str) -> anyhow::Result<()> {
    if body["success"] == json!(true) {
        Ok(())
    } else {
        Err(anyhow::anyhow!("{} failed: {}", step, body))
    }
}

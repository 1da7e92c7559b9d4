//! Integration tests for the campaign API.
//!
//! Each scenario runs the full router against the memory, file and SQLite
//! backends. Run with: cargo test --test integration

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use campaign_backend::api::{create_router, AppState};
use campaign_backend::model::SeedData;
use campaign_backend::storage::{
    FileStore, MemoryStore, RecordStore, SqliteStore, StorageAdapter,
};

/// A router plus whatever keeps its backend alive.
struct TestApp {
    router: Router,
    _dir: Option<TempDir>,
}

async fn apps() -> Vec<(&'static str, TestApp)> {
    let file_dir = tempfile::tempdir().unwrap();
    let file_store = FileStore::open(file_dir.path()).await.unwrap();

    let sqlite_dir = tempfile::tempdir().unwrap();
    let sqlite_store = SqliteStore::open(sqlite_dir.path().join("campaign.db"))
        .await
        .unwrap();

    vec![
        ("memory", app_with(Arc::new(MemoryStore::new()), None)),
        ("file", app_with(Arc::new(file_store), Some(file_dir))),
        ("sqlite", app_with(Arc::new(sqlite_store), Some(sqlite_dir))),
    ]
}

fn app_with(store: Arc<dyn RecordStore>, dir: Option<TempDir>) -> TestApp {
    let storage = StorageAdapter::new(store, SeedData::builtin().unwrap());
    TestApp {
        router: create_router(AppState::new(storage)),
        _dir: dir,
    }
}

async fn get(app: &TestApp, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

async fn post(app: &TestApp, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body.to_string())).await
}

async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    body: Option<String>,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.map(Body::from).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn campaign_reads_are_idempotent() {
    for (name, app) in apps().await {
        let (status, first) = get(&app, "/api/campaign-data").await;
        assert_eq!(status, StatusCode::OK, "{name}");
        assert_eq!(first["success"], true, "{name}");
        assert_eq!(first["data"]["goal"], 1800000, "{name}");
        assert_eq!(first["data"]["raised"], 950000, "{name}");

        let (_, second) = get(&app, "/api/campaign-data").await;
        assert_eq!(first, second, "{name}");
    }
}

#[tokio::test]
async fn fresh_backend_lists_default_dedications() {
    for (name, app) in apps().await {
        let (status, body) = get(&app, "/api/dedications").await;
        assert_eq!(status, StatusCode::OK, "{name}");

        let items = body["data"].as_array().unwrap();
        assert_eq!(items.len(), 15, "{name}");
        assert_eq!(
            items[0],
            json!({"id": 1, "title": "Campus Dedication", "amount": "$900,000", "status": "available", "phase": 1}),
            "{name}"
        );
        assert_eq!(
            items[14],
            json!({"id": 15, "title": "Gym", "amount": "$4,000,000", "status": "available", "phase": 2}),
            "{name}"
        );
    }
}

#[tokio::test]
async fn update_campaign_round_trips() {
    for (name, app) in apps().await {
        let record = json!({"goal": 2000000, "raised": 1000000, "lastUpdated": "2024-01-01"});
        let (status, body) = post(&app, "/api/update-campaign", record.clone()).await;
        assert_eq!(status, StatusCode::OK, "{name}");
        assert_eq!(body["message"], "Campaign updated successfully", "{name}");
        assert_eq!(body["data"], record, "{name}");

        let (_, body) = get(&app, "/api/campaign-data").await;
        assert_eq!(body["data"], record, "{name}");
    }
}

#[tokio::test]
async fn update_campaign_rejects_bad_fields() {
    for (name, app) in apps().await {
        let (status, body) = post(
            &app,
            "/api/update-campaign",
            json!({"goal": "a lot", "raised": 5, "lastUpdated": "soon"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{name}");
        assert_eq!(body["success"], false, "{name}");
        assert_eq!(body["message"], "Validation failed", "{name}");

        let fields: Vec<&str> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["goal", "lastUpdated"], "{name}");
    }
}

#[tokio::test]
async fn add_dedication_allocates_next_id() {
    for (name, app) in apps().await {
        let (status, body) = post(
            &app,
            "/api/add-dedication",
            json!({"title": "Test", "amount": "$50,000", "status": "available"}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{name}");
        assert_eq!(body["message"], "Dedication added successfully", "{name}");
        assert_eq!(
            body["data"],
            json!({"id": 16, "title": "Test", "amount": "$50,000", "status": "available", "phase": 1}),
            "{name}"
        );

        let (_, list) = get(&app, "/api/dedications").await;
        assert_eq!(list["data"].as_array().unwrap().len(), 16, "{name}");
    }
}

#[tokio::test]
async fn update_unknown_dedication_is_404_and_leaves_list_alone() {
    for (name, app) in apps().await {
        let (_, before) = get(&app, "/api/dedications").await;

        let (status, body) = post(
            &app,
            "/api/update-dedication",
            json!({"id": 9999, "title": "X", "amount": "$1", "status": "available"}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{name}");
        assert_eq!(body["message"], "Dedication not found", "{name}");

        let (_, after) = get(&app, "/api/dedications").await;
        assert_eq!(before, after, "{name}");
    }
}

#[tokio::test]
async fn update_dedication_reports_all_validation_errors() {
    for (name, app) in apps().await {
        let (status, body) = post(
            &app,
            "/api/update-dedication",
            json!({"id": 1, "title": "", "amount": "$1", "status": "bogus"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{name}");

        let errors = body["errors"].as_array().unwrap();
        assert!(errors.len() >= 2, "{name}");
        assert!(errors.iter().any(|e| e["field"] == "title"), "{name}");
        assert!(errors.iter().any(|e| e["field"] == "status"), "{name}");
    }
}

#[tokio::test]
async fn update_dedication_requires_id() {
    for (name, app) in apps().await {
        let (status, body) = post(
            &app,
            "/api/update-dedication",
            json!({"title": "Gym", "amount": "$1", "status": "sold"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{name}");
        assert_eq!(body["message"], "Dedication ID is required", "{name}");
    }
}

#[tokio::test]
async fn update_dedication_keeps_phase_when_omitted() {
    for (name, app) in apps().await {
        let (status, body) = post(
            &app,
            "/api/update-dedication",
            json!({"id": 14, "title": " Retreat House ", "amount": "$900,000", "status": "pending"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{name}");
        assert_eq!(body["message"], "Dedication updated successfully", "{name}");
        assert_eq!(
            body["data"],
            json!({"id": 14, "title": "Retreat House", "amount": "$900,000", "status": "pending", "phase": 2}),
            "{name}"
        );

        let (_, list) = get(&app, "/api/dedications").await;
        let stored = list["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|d| d["id"] == 14)
            .cloned()
            .unwrap();
        assert_eq!(stored, body["data"], "{name}");
    }
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    for (name, app) in apps().await {
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/add-dedication",
            Some("{\"title\": ".to_string()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{name}");
        assert_eq!(body["message"], "Invalid JSON body", "{name}");
    }
}

#[tokio::test]
async fn ids_stay_unique_under_concurrent_adds() {
    for (name, app) in apps().await {
        let app = Arc::new(app);
        let mut handles = Vec::new();
        for i in 0..10 {
            let app = Arc::clone(&app);
            handles.push(tokio::spawn(async move {
                post(
                    &app,
                    "/api/add-dedication",
                    json!({"title": format!("Item {i}"), "amount": "$10", "status": "pending", "phase": 3}),
                )
                .await
            }));
        }
        for handle in handles {
            let (status, _) = handle.await.unwrap();
            assert_eq!(status, StatusCode::CREATED, "{name}");
        }

        let (_, list) = get(&app, "/api/dedications").await;
        let items = list["data"].as_array().unwrap();
        let mut ids: Vec<u64> = items.iter().map(|d| d["id"].as_u64().unwrap()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 25, "{name}");
        assert!(items.iter().all(|d| d["phase"].as_u64().unwrap() >= 1), "{name}");
    }
}

#[tokio::test]
async fn file_backend_persists_across_restarts() {
    let dir = tempfile::tempdir().unwrap();

    let first = app_with(Arc::new(FileStore::open(dir.path()).await.unwrap()), None);
    let (status, _) = post(
        &first,
        "/api/add-dedication",
        json!({"title": "Library", "amount": "$12,000", "status": "sold", "phase": 2}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let second = app_with(Arc::new(FileStore::open(dir.path()).await.unwrap()), None);
    let (_, list) = get(&second, "/api/dedications").await;
    let last = list["data"].as_array().unwrap().last().cloned().unwrap();
    assert_eq!(last["title"], "Library");
    assert_eq!(last["id"], 16);
}

#[tokio::test]
async fn corrupt_file_yields_generic_500() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("campaign-data.json"), "{oops").unwrap();
    let app = app_with(Arc::new(FileStore::open(dir.path()).await.unwrap()), None);

    let (status, body) = get(&app, "/api/campaign-data").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"success": false, "message": "Error retrieving campaign data"})
    );
}

#[tokio::test]
async fn datetime_local_values_are_accepted() {
    for (name, app) in apps().await {
        let record = json!({"goal": 1800000, "raised": 975000, "lastUpdated": "2024-06-01T10:30"});
        let (status, body) = post(&app, "/api/update-campaign", record.clone()).await;
        assert_eq!(status, StatusCode::OK, "{name}");
        assert_eq!(body["data"], record, "{name}");
    }
}

#[tokio::test]
async fn integral_string_id_matches_and_null_phase_is_rejected() {
    for (name, app) in apps().await {
        let (status, body) = post(
            &app,
            "/api/update-dedication",
            json!({"id": "15.0", "title": "Gym", "amount": 4000000, "status": "sold"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{name}");
        assert_eq!(
            body["data"],
            json!({"id": 15, "title": "Gym", "amount": "4000000", "status": "sold", "phase": 2}),
            "{name}"
        );

        let (status, body) = post(
            &app,
            "/api/update-dedication",
            json!({"id": 15, "title": "Gym", "amount": "$1", "status": "sold", "phase": null}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{name}");
        assert_eq!(body["errors"][0]["field"], "phase", "{name}");
    }
}

//! HTTP API tests, driven through the router with `oneshot`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use catalog_sync::api::create_router;
use catalog_sync::api::sync::ACCEPTED_MESSAGE;
use catalog_sync::db::{MemoryStore, Stores};
use catalog_sync::jobs::SyncWorker;
use catalog_sync::{AppState, Config};
use http::{Request, StatusCode};
use inventory_client::{ClientResult, FetchedPage, InventoryApi, SourceCredentials};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use shared::error::ErrorCode;
use shared::models::{ExternalItem, IntegrationRecord};
use shared::sync::JobState;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use uuid::Uuid;

/// One-page catalog with two models
struct StaticInventory;

#[async_trait]
impl InventoryApi for StaticInventory {
    async fn fetch_page(
        &self,
        _credentials: &SourceCredentials,
        _page: u32,
        _per_page: u32,
    ) -> ClientResult<FetchedPage> {
        let items = vec![
            ExternalItem::new("i-1")
                .with_sku("AS14-NB/M")
                .with_rate(Decimal::new(1990, 2))
                .with_stock(2),
            ExternalItem::new("i-2")
                .with_sku("AS14-NB/L")
                .with_rate(Decimal::new(1990, 2))
                .with_stock(5),
            ExternalItem::new("i-3")
                .with_sku("TS02-WH/S")
                .with_rate(Decimal::new(990, 2))
                .with_stock(1),
        ];
        Ok(FetchedPage {
            returned: items.len(),
            has_more_page: false,
            items,
        })
    }
}

fn test_config() -> Config {
    Config::from_lookup(|name| match name {
        "STORE_BACKEND" => Some("memory".to_string()),
        "SYNC_BATCH_PAUSE_MS" => Some("0".to_string()),
        _ => None,
    })
    .unwrap()
}

fn test_state() -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::with_parts(
        &test_config(),
        Stores::memory(store.clone(), None),
        Arc::new(StaticInventory),
    );
    (state, store)
}

fn spawn_worker(state: &AppState, shutdown: CancellationToken) -> JoinHandle<()> {
    let worker = SyncWorker::new(
        0,
        state.job_rx.clone(),
        state.pipeline.clone(),
        state.registry.clone(),
        state.locks.clone(),
    );
    tokio::spawn(worker.run(shutdown))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn trigger_body(scope: &str) -> Value {
    json!({
        "merchant_scope_id": scope,
        "access_credential": "token-1",
        "organization_id": "org-1",
    })
}

#[tokio::test]
async fn test_trigger_returns_accepted_with_job_id() {
    let (state, _) = test_state();
    let app = create_router(state.clone());

    let (status, body) = send(app, post_json("/api/sync/trigger", trigger_body("shop-1"))).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["code"], 0);
    assert_eq!(body["message"], ACCEPTED_MESSAGE);
    assert_eq!(body["data"]["merchant_scope_id"], "shop-1");

    let job_id: Uuid = body["data"]["job_id"].as_str().unwrap().parse().unwrap();
    let job = state.registry.get(&job_id).unwrap();
    assert_eq!(job.state, JobState::Queued);
}

#[tokio::test]
async fn test_job_runs_to_completion() {
    let (state, store) = test_state();
    let shutdown = CancellationToken::new();
    spawn_worker(&state, shutdown.clone());

    let (status, body) = send(
        create_router(state.clone()),
        post_json("/api/sync/trigger", trigger_body("shop-1")),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let job_id: Uuid = body["data"]["job_id"].as_str().unwrap().parse().unwrap();

    let mut rx = state.registry.subscribe(&job_id).unwrap();
    tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| s.state.is_finished()),
    )
    .await
    .unwrap()
    .unwrap();

    let (status, body) = send(
        create_router(state.clone()),
        get(&format!("/api/sync/jobs/{job_id}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state"], "succeeded");
    assert_eq!(body["data"]["trigger"], "manual");
    assert_eq!(body["data"]["report"]["models_created"], 2);
    assert_eq!(body["data"]["report"]["variants_created"], 3);

    assert_eq!(store.row_counts(), (2, 3, 3));
    shutdown.cancel();
}

#[tokio::test]
async fn test_shutdown_stops_worker_waiting_for_scope_lock() {
    let (state, store) = test_state();
    let shutdown = CancellationToken::new();
    let worker = spawn_worker(&state, shutdown.clone());

    // another run holds the scope
    let _held = state.locks.acquire("shop-1").await;

    let (status, body) = send(
        create_router(state.clone()),
        post_json("/api/sync/trigger", trigger_body("shop-1")),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let job_id: Uuid = body["data"]["job_id"].as_str().unwrap().parse().unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(1), worker)
        .await
        .expect("worker should stop while the scope is still locked")
        .unwrap();
    assert_eq!(state.registry.get(&job_id).unwrap().state, JobState::Queued);
    assert_eq!(store.row_counts(), (0, 0, 0));
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let (state, _) = test_state();
    let uri = format!("/api/sync/jobs/{}", Uuid::new_v4());

    let (status, body) = send(create_router(state), get(&uri)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], ErrorCode::SyncJobNotFound.code());
}

#[tokio::test]
async fn test_trigger_without_integration_is_rejected() {
    let (state, _) = test_state();

    let (status, body) = send(
        create_router(state.clone()),
        post_json("/api/sync/trigger", json!({ "merchant_scope_id": "shop-9" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], ErrorCode::IntegrationNotFound.code());
    assert_eq!(state.registry.count_in(JobState::Queued), 0);
}

#[tokio::test]
async fn test_trigger_requires_scope() {
    let (state, _) = test_state();

    let (status, body) = send(
        create_router(state),
        post_json("/api/sync/trigger", json!({ "merchant_scope_id": "  " })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], ErrorCode::RequiredField.code());
}

#[tokio::test]
async fn test_trigger_rejects_disabled_integration() {
    let (state, store) = test_state();
    store.put_integration(IntegrationRecord {
        merchant_scope_id: "shop-2".to_string(),
        organization_id: "org-2".to_string(),
        access_credential: "token-2".to_string(),
        enabled: false,
        last_sync_at: None,
        updated_at: 1,
    });

    let (status, body) = send(
        create_router(state),
        post_json("/api/sync/trigger", json!({ "merchant_scope_id": "shop-2" })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], ErrorCode::IntegrationDisabled.code());
}

#[tokio::test]
async fn test_trigger_uses_stored_credentials() {
    let (state, store) = test_state();
    store.put_integration(IntegrationRecord {
        merchant_scope_id: "shop-3".to_string(),
        organization_id: "org-3".to_string(),
        access_credential: "token-3".to_string(),
        enabled: true,
        last_sync_at: None,
        updated_at: 1,
    });

    let (status, _) = send(
        create_router(state.clone()),
        post_json("/api/sync/trigger", json!({ "merchant_scope_id": "shop-3" })),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(state.registry.has_active("shop-3"));
}

#[tokio::test]
async fn test_integration_view_omits_credential() {
    let (state, store) = test_state();
    store.put_integration(IntegrationRecord {
        merchant_scope_id: "shop-4".to_string(),
        organization_id: "org-4".to_string(),
        access_credential: "secret-token".to_string(),
        enabled: true,
        last_sync_at: Some(42),
        updated_at: 42,
    });

    let (status, body) = send(
        create_router(state.clone()),
        get("/api/sync/integrations/shop-4"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["organization_id"], "org-4");
    assert_eq!(body["data"]["last_sync_at"], 42);
    assert!(body["data"].get("access_credential").is_none());
    assert!(!body.to_string().contains("secret-token"));

    let (status, _) = send(create_router(state), get("/api/sync/integrations/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let (state, _) = test_state();

    let (status, body) = send(create_router(state), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "catalog-sync");
    assert_eq!(body["mirror_enabled"], false);
}

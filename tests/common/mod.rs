//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use tower::util::ServiceExt;

use beenergy::api::{AppState, router};
use beenergy::vault::{MockVaultClient, Network, VaultService};

/// Proxy state over a mock client on testnet.
pub fn mock_state(client: MockVaultClient) -> Arc<AppState<MockVaultClient>> {
    Arc::new(AppState {
        vault: VaultService::new(client, Network::Testnet),
    })
}

/// Sends one request through a fresh router and decodes the JSON reply.
pub async fn send(
    state: Arc<AppState<MockVaultClient>>,
    req: Request<Body>,
) -> (StatusCode, serde_json::Value) {
    let resp = router(state).oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Unique session file under the system temp dir.
pub fn temp_store_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "beenergy-{name}-{}/session.json",
        uuid::Uuid::new_v4()
    ))
}

/// Fixed clock: 2025-11-21 12:00 UTC.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 21, 12, 0, 0).unwrap()
}

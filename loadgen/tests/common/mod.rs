//! Common Test Utilities for Integration Tests
//!
//! Serves a minimal card API that records every request it receives.

#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, Uri, header},
    routing::get,
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A request as seen by the mock service
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub received_at: Instant,
}

impl RecordedRequest {
    /// Query parameters in order of appearance
    pub fn params(&self) -> Vec<(String, String)> {
        self.query
            .as_deref()
            .unwrap_or_default()
            .split('&')
            .filter(|p| !p.is_empty())
            .filter_map(|p| p.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

/// Mock card service with configurable latency and status
#[derive(Clone)]
pub struct MockCardService {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    delay: Duration,
    status: StatusCode,
}

impl MockCardService {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            delay: Duration::ZERO,
            status: StatusCode::OK,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    async fn respond(
        &self,
        uri: &Uri,
        headers: &HeaderMap,
        body: Value,
    ) -> (StatusCode, Json<Value>) {
        let header_str = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        };

        self.requests.lock().unwrap().push(RecordedRequest {
            path: uri.path().to_string(),
            query: uri.query().map(|q| q.to_string()),
            authorization: header_str(header::AUTHORIZATION),
            content_type: header_str(header::CONTENT_TYPE),
            received_at: Instant::now(),
        });

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        (self.status, Json(body))
    }
}

async fn list_cards(
    State(service): State<MockCardService>,
    uri: Uri,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    service
        .respond(&uri, &headers, json!({ "success": true, "data": [] }))
        .await
}

async fn card_details(
    State(service): State<MockCardService>,
    Path(card_id): Path<u32>,
    uri: Uri,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    service
        .respond(
            &uri,
            &headers,
            json!({ "success": true, "data": { "id": card_id } }),
        )
        .await
}

/// Serve `service` on an ephemeral port and return the API base URL
pub async fn spawn_card_service(service: MockCardService) -> String {
    let app = Router::new()
        .route("/api/v1/cards", get(list_cards))
        .route("/api/v1/cards/:card_id", get(card_details))
        .with_state(service);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/api/v1", addr)
}

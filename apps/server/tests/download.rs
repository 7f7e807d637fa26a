use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
};
use serde_json::json;
use tower::ServiceExt;

use vngate_market_data::{
    BackoffPolicy, Cell, DataQuery, DataTable, Dispatcher, FetchError, ProviderAdapter,
    ReportKind, SourceId,
};
use vngate_server::api::app_router;
use vngate_server::auth::AuthManager;
use vngate_server::config::Config;
use vngate_server::users::MemoryUserStore;
use vngate_server::AppState;

const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

/// Serves OHLC-style tables without touching the network: two rows for
/// VCB, three for FPT, one for anything else.
struct StubAdapter;

#[async_trait]
impl ProviderAdapter for StubAdapter {
    fn id(&self) -> SourceId {
        SourceId::Vci
    }

    fn supports(&self, _kind: ReportKind) -> bool {
        true
    }

    async fn fetch(&self, query: &DataQuery) -> Result<DataTable, FetchError> {
        let rows = match query.symbol.as_str() {
            "VCB" => 2,
            "FPT" => 3,
            _ => 1,
        };
        let mut table = DataTable::new();
        table.push_column(
            "time",
            (0..rows)
                .map(|i| Cell::Text(format!("2024-01-{:02}", i + 2)))
                .collect(),
        );
        table.push_column("open", vec![Cell::Integer(90_000); rows]);
        table.push_column("high", vec![Cell::Integer(92_500); rows]);
        table.push_column("low", vec![Cell::Integer(89_500); rows]);
        table.push_column("close", vec![Cell::Integer(91_500); rows]);
        table.push_column("volume", vec![Cell::Integer(1_250_300); rows]);
        Ok(table)
    }
}

/// Always rate limited, to drive the retry-exhaustion path.
struct RateLimitedAdapter;

#[async_trait]
impl ProviderAdapter for RateLimitedAdapter {
    fn id(&self) -> SourceId {
        SourceId::Vci
    }

    fn supports(&self, _kind: ReportKind) -> bool {
        true
    }

    async fn fetch(&self, _query: &DataQuery) -> Result<DataTable, FetchError> {
        Err(FetchError::RateLimited {
            source: SourceId::Vci,
        })
    }
}

fn test_config() -> Config {
    Config {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        jwt_secret: SECRET.to_vec(),
        token_ttl: Duration::from_secs(1800),
        cors_allow: vec!["*".to_string()],
        request_timeout: Duration::from_secs(5),
        attempt_timeout: Duration::from_secs(1),
        backoff: BackoffPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            max_total_wait: Duration::from_secs(5),
            jitter: 0.0,
        },
    }
}

fn build_test_router(adapter: Arc<dyn ProviderAdapter>) -> axum::Router {
    let config = test_config();
    let mut dispatcher = Dispatcher::new(config.backoff.clone(), config.attempt_timeout);
    dispatcher.register(adapter);
    let state = Arc::new(AppState {
        user_store: Arc::new(MemoryUserStore::new()),
        auth: Arc::new(AuthManager::new(&config.jwt_secret, config.token_ttl)),
        dispatcher: Arc::new(dispatcher),
        request_timeout: config.request_timeout,
    });
    app_router(state, &config)
}

async fn login(app: &axum::Router) -> String {
    let register = json!({"username": "alice", "email": "a@x.com", "password": "pw12345"});
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(register.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let credentials = json!({"username": "alice", "password": "pw12345"});
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(credentials.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    body["access_token"].as_str().unwrap().to_string()
}

async fn post_authed(
    app: &axum::Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

fn history_body() -> serde_json::Value {
    json!({
        "symbol": "VCB",
        "start_date": "2024-01-01",
        "end_date": "2024-01-31",
        "source": "vci",
        "interval": "D",
    })
}

#[tokio::test]
async fn download_requires_auth() {
    let app = build_test_router(Arc::new(StubAdapter));
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/download/csv")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(history_body().to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn download_csv_returns_ohlc_file() {
    let app = build_test_router(Arc::new(StubAdapter));
    let token = login(&app).await;

    let response = post_authed(&app, "/api/v1/download/csv", &token, history_body()).await;
    assert_eq!(response.status(), 200);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/csv"));
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("VCB_2024-01-01_2024-01-31.csv"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "ticker,time,open,high,low,close,volume"
    );
    assert_eq!(lines.count(), 2);
}

#[tokio::test]
async fn download_csv_text_embeds_csv() {
    let app = build_test_router(Arc::new(StubAdapter));
    let token = login(&app).await;

    let response = post_authed(&app, "/api/v1/download/csv-text", &token, history_body()).await;
    assert_eq!(response.status(), 200);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["symbol"], "VCB");
    let csv = body["csv_data"].as_str().unwrap();
    assert!(csv.starts_with("ticker,time,open"));
    assert_eq!(body["data_size"].as_u64().unwrap() as usize, csv.len());
}

#[tokio::test]
async fn download_validation_failures_are_400() {
    let app = build_test_router(Arc::new(StubAdapter));
    let token = login(&app).await;

    // Unknown source never reaches dispatch
    let mut body = history_body();
    body["source"] = json!("yahoo");
    let response = post_authed(&app, "/api/v1/download/csv", &token, body).await;
    assert_eq!(response.status(), 400);

    // Symbol too short
    let mut body = history_body();
    body["symbol"] = json!("V");
    let response = post_authed(&app, "/api/v1/download/csv", &token, body).await;
    assert_eq!(response.status(), 400);

    // Inverted date range
    let mut body = history_body();
    body["start_date"] = json!("2024-02-01");
    body["end_date"] = json!("2024-01-01");
    let response = post_authed(&app, "/api/v1/download/csv", &token, body).await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn unregistered_source_is_400() {
    let app = build_test_router(Arc::new(StubAdapter));
    let token = login(&app).await;

    let mut body = history_body();
    body["source"] = json!("msn"); // valid source id, no adapter registered
    let response = post_authed(&app, "/api/v1/download/csv", &token, body).await;
    assert_eq!(response.status(), 400);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .contains("No adapter registered"));
}

#[tokio::test]
async fn exhausted_retries_surface_as_502() {
    let app = build_test_router(Arc::new(RateLimitedAdapter));
    let token = login(&app).await;

    let response = post_authed(&app, "/api/v1/download/csv", &token, history_body()).await;
    assert_eq!(response.status(), 502);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("Rate limited"));
    assert!(detail.contains("after 2 attempts"));
}

#[tokio::test]
async fn combined_download_merges_symbols() {
    let app = build_test_router(Arc::new(StubAdapter));
    let token = login(&app).await;

    let body = json!({
        "symbols": ["VCB", "FPT"],
        "start_date": "2024-01-01",
        "end_date": "2024-01-31",
        "source": "vci",
        "interval": "D",
        "combine": true,
    });
    let response = post_authed(&app, "/api/v1/download/multiple", &token, body).await;
    assert_eq!(response.status(), 200);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    // header + 2 VCB rows + 3 FPT rows
    assert_eq!(lines.len(), 6);
    assert_eq!(lines.iter().filter(|l| l.starts_with("VCB,")).count(), 2);
    assert_eq!(lines.iter().filter(|l| l.starts_with("FPT,")).count(), 3);
}

#[tokio::test]
async fn separate_download_keys_by_symbol() {
    let app = build_test_router(Arc::new(StubAdapter));
    let token = login(&app).await;

    let body = json!({
        "symbols": ["VCB", "FPT"],
        "start_date": "2024-01-01",
        "end_date": "2024-01-31",
        "combine": false,
    });
    let response = post_authed(&app, "/api/v1/download/multiple", &token, body).await;
    assert_eq!(response.status(), 200);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let payload: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(payload["total_symbols"], 2);
    let csv_data = payload["csv_data"].as_object().unwrap();
    assert!(csv_data["VCB"].as_str().unwrap().contains("ticker,time"));
    assert!(csv_data["FPT"].as_str().unwrap().contains("ticker,time"));
}

#[tokio::test]
async fn company_overview_echoes_symbol_and_source() {
    let app = build_test_router(Arc::new(StubAdapter));
    let token = login(&app).await;

    let response = post_authed(
        &app,
        "/api/v1/company/overview",
        &token,
        json!({"symbol": "vcb"}),
    )
    .await;
    assert_eq!(response.status(), 200);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["symbol"], "VCB");
    assert_eq!(body["source"], "vci");
    assert!(body["data"]["close"].is_array());
}

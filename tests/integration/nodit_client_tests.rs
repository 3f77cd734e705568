//! Nodit client integration tests
//!
//! Runs the client against a local fake of the Data API to cover request
//! shape, API key handling, response caching, invalidation and normalization,
//! then drives a full check through the service with the real client.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use wallet_monitor::config::ProviderConfig;
use wallet_monitor::monitoring::MonitorSettings;
use wallet_monitor::{
    AlertRuleInput, AlertType, CheckOutcome, DataProvider, Direction, MetricsState,
    MonitoringService, NoditClient, NotificationSink, Notifier, ProviderError, SystemClock, TxKind,
};

use crate::support::{RecordingSink, CHAT_ID, COUNTERPARTY, WALLET};

const API_KEY: &str = "test-nodit-key";
const USDC_CONTRACT: &str = "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913";

#[derive(Default)]
struct FakeNodit {
    native_items: Mutex<Vec<Value>>,
    token_items: Mutex<Vec<Value>>,
    native_hits: AtomicUsize,
    token_hits: AtomicUsize,
    last_body: Mutex<Option<Value>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("X-API-KEY")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == API_KEY)
        .unwrap_or(false)
}

async fn native_handler(
    State(fake): State<Arc<FakeNodit>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "invalid api key").into_response();
    }
    fake.native_hits.fetch_add(1, Ordering::SeqCst);
    *fake.last_body.lock() = Some(body);
    let items = fake.native_items.lock().clone();
    Json(json!({ "rpp": items.len(), "items": items })).into_response()
}

async fn token_handler(
    State(fake): State<Arc<FakeNodit>>,
    headers: HeaderMap,
    Json(_body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "invalid api key").into_response();
    }
    fake.token_hits.fetch_add(1, Ordering::SeqCst);
    let items = fake.token_items.lock().clone();
    Json(json!({ "rpp": items.len(), "items": items })).into_response()
}

/// Serve the fake API on an ephemeral port; returns its base URL
async fn spawn_fake(fake: Arc<FakeNodit>) -> String {
    let app = Router::new()
        .route("/blockchain/getTransactionsByAccount", post(native_handler))
        .route("/token/getTokenTransfersByAccount", post(token_handler))
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client_config(base_url: &str, api_key: &str) -> ProviderConfig {
    ProviderConfig {
        base_url: base_url.to_string(),
        api_key: Some(SecretString::new(api_key.to_string())),
        timeout_secs: 5,
        cache_ttl_secs: 60,
        rate_limit_per_second: 100,
        ..ProviderConfig::default()
    }
}

fn native_item(hash: &str, from: &str, to: &str, wei: &str, timestamp: i64) -> Value {
    json!({
        "transactionHash": hash,
        "from": from,
        "to": to,
        "value": wei,
        "timestamp": timestamp
    })
}

fn usdc_item(hash: &str, from: &str, to: &str, raw: &str, timestamp: i64) -> Value {
    json!({
        "transactionHash": hash,
        "from": from,
        "to": to,
        "value": raw,
        "timestamp": timestamp,
        "contract": { "address": USDC_CONTRACT, "symbol": "USDC", "decimals": 6 }
    })
}

#[tokio::test]
async fn test_native_call_sends_account_and_page_size() {
    let fake = Arc::new(FakeNodit::default());
    fake.native_items.lock().push(native_item(
        "0xn1",
        COUNTERPARTY,
        WALLET,
        "2500000000000000000",
        1_700_000_000,
    ));
    let base_url = spawn_fake(fake.clone()).await;
    let client = NoditClient::new(&client_config(&base_url, API_KEY)).unwrap();
    assert!(client.has_api_key());

    let txs = client.list_native_transactions(WALLET, 20).await.unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].direction, Direction::In);
    assert_eq!(txs[0].value, "2.5".parse::<Decimal>().unwrap());
    assert_eq!(txs[0].kind, TxKind::Native);

    let body = fake.last_body.lock().clone().unwrap();
    assert_eq!(body["accountAddress"], WALLET);
    assert_eq!(body["rpp"], 20);
}

#[tokio::test]
async fn test_responses_are_cached_until_invalidated() {
    let fake = Arc::new(FakeNodit::default());
    let base_url = spawn_fake(fake.clone()).await;
    let client = NoditClient::new(&client_config(&base_url, API_KEY)).unwrap();

    client.list_native_transactions(WALLET, 20).await.unwrap();
    client.list_native_transactions(WALLET, 20).await.unwrap();
    assert_eq!(fake.native_hits.load(Ordering::SeqCst), 1);

    client.invalidate(WALLET);
    client.list_native_transactions(WALLET, 20).await.unwrap();
    assert_eq!(fake.native_hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_token_transfers_are_normalized() {
    let fake = Arc::new(FakeNodit::default());
    {
        let mut items = fake.token_items.lock();
        items.push(usdc_item("0xt1", WALLET, COUNTERPARTY, "7500000", 1_700_000_000));
        items.push(usdc_item("0xt2", COUNTERPARTY, WALLET, "1000000", 1_700_000_500));
    }
    let base_url = spawn_fake(fake.clone()).await;
    let client = NoditClient::new(&client_config(&base_url, API_KEY)).unwrap();

    let txs = client.list_token_transfers(WALLET, 20).await.unwrap();
    assert_eq!(txs.len(), 2);
    assert_eq!(txs[0].hash, "0xt2");
    assert_eq!(txs[0].direction, Direction::In);
    assert_eq!(txs[0].value, Decimal::ONE);
    assert_eq!(txs[1].direction, Direction::Out);
    assert_eq!(txs[1].value, "7.5".parse::<Decimal>().unwrap());
    assert!(txs.iter().all(|t| t.token_symbol == "USDC" && t.kind == TxKind::Token));
}

#[tokio::test]
async fn test_rejected_key_surfaces_api_error() {
    let fake = Arc::new(FakeNodit::default());
    let base_url = spawn_fake(fake.clone()).await;
    let client = NoditClient::new(&client_config(&base_url, "wrong-key")).unwrap();

    match client.list_native_transactions(WALLET, 20).await {
        Err(ProviderError::Api { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("invalid api key"));
        }
        other => panic!("expected API error, got {:?}", other.map(|t| t.len())),
    }
    assert_eq!(fake.native_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_service_detects_transfers_through_client() {
    let fake = Arc::new(FakeNodit::default());
    let recent = Utc::now().timestamp() - 60;
    fake.native_items.lock().push(native_item(
        "0xlive",
        COUNTERPARTY,
        WALLET,
        "3000000000000000000",
        recent,
    ));
    fake.token_items
        .lock()
        .push(usdc_item("0xlivetoken", COUNTERPARTY, WALLET, "20000000", recent - 30));
    let base_url = spawn_fake(fake.clone()).await;

    let metrics = Arc::new(MetricsState::new());
    let sink = Arc::new(RecordingSink::new());
    let notifier = Notifier::new(
        Some(sink.clone() as Arc<dyn NotificationSink>),
        "https://basescan.org",
        Duration::from_secs(2),
        metrics.clone(),
    );
    let provider = Arc::new(NoditClient::new(&client_config(&base_url, API_KEY)).unwrap());
    let service = MonitoringService::new(
        MonitorSettings::default(),
        provider,
        notifier,
        Arc::new(SystemClock),
        metrics,
    );

    service
        .start_monitoring(
            WALLET,
            CHAT_ID,
            vec![AlertRuleInput {
                alert_type: AlertType::IncomingFunds,
                token: "ETH".to_string(),
                amount: Decimal::ONE,
            }],
        )
        .unwrap();

    let outcome = service.trigger_check(WALLET).await.unwrap();
    assert_eq!(
        outcome,
        CheckOutcome::Completed {
            new_transactions: 2,
            alerts_fired: 1
        }
    );
    assert_eq!(sink.alerts().len(), 1);
    assert_eq!(sink.summaries().len(), 1);
    assert!(sink.summaries()[0].contains("3.000000 ETH"));
    assert!(sink.summaries()[0].contains("20.000000 USDC"));
}

//! Drives `HttpLedgerClient` against an in-process mock ledger node.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use txswarm::{
    ActivityChain, AttemptOutcome, DelayWindow, HttpLedgerClient, LedgerApi, LedgerError,
    Output, TransactionRequest, bootstrap::bootstrap, create_shared_client, stats::SwarmStats,
};

const FAUCET_AMOUNT: u64 = 1_000;

/// Unspent outputs per address, in the node's `(transactionId, value)` form.
#[derive(Default)]
struct LedgerState {
    minted: AtomicU64,
    next_tx: AtomicU64,
    fail_keygen: AtomicBool,
    malformed_lists: AtomicBool,
    unspent: Mutex<HashMap<String, Vec<(String, u64)>>>,
    queried: Mutex<Vec<String>>,
    published: Mutex<Vec<Value>>,
}

impl LedgerState {
    fn total_supply(&self) -> u64 {
        self.unspent.lock().unwrap().values().flatten().map(|(_, v)| v).sum()
    }
}

#[derive(Deserialize)]
struct AddressQuery {
    address: String,
}

async fn generate_keys(State(state): State<Arc<LedgerState>>) -> Response {
    if state.fail_keygen.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let n = state.minted.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "address": {"type": "SHA256", "data": format!("addr/{n}+=")},
        "keyPriv": {"data": format!("priv-{n}")},
        "keyPub": {"data": format!("pub-{n}")},
    }))
    .into_response()
}

async fn list_transactions(
    State(state): State<Arc<LedgerState>>,
    Query(query): Query<AddressQuery>,
) -> Response {
    state.queried.lock().unwrap().push(query.address.clone());
    if state.malformed_lists.load(Ordering::SeqCst) {
        return "{not json".into_response();
    }

    let unspent = state.unspent.lock().unwrap();
    match unspent.get(&query.address) {
        Some(entries) if !entries.is_empty() => Json(json!({
            "unspentTransactions": entries
                .iter()
                .map(|(id, value)| json!({"transactionId": id, "value": value.to_string()}))
                .collect::<Vec<_>>(),
        }))
        .into_response(),
        _ => Json(json!({})).into_response(),
    }
}

async fn faucet_send(
    State(state): State<Arc<LedgerState>>,
    Query(query): Query<AddressQuery>,
) -> &'static str {
    let id = format!("faucet-{}", state.next_tx.fetch_add(1, Ordering::SeqCst));
    state.unspent.lock().unwrap().entry(query.address).or_default().push((id, FAUCET_AMOUNT));
    "{}"
}

async fn publish_transaction(
    State(state): State<Arc<LedgerState>>,
    Json(body): Json<Value>,
) -> StatusCode {
    state.published.lock().unwrap().push(body.clone());

    let inputs: Vec<String> = body["transactionsIds"]
        .as_array()
        .map(|ids| ids.iter().filter_map(|id| id.as_str().map(String::from)).collect())
        .unwrap_or_default();

    let mut unspent = state.unspent.lock().unwrap();
    for entries in unspent.values_mut() {
        entries.retain(|(id, _)| !inputs.contains(id));
    }

    let tx = state.next_tx.fetch_add(1, Ordering::SeqCst);
    for (i, output) in body["outputs"].as_array().into_iter().flatten().enumerate() {
        let address = output["address"]["data"].as_str().unwrap_or_default().to_string();
        let value: u64 =
            output["value"]["value"].as_str().and_then(|v| v.parse().ok()).unwrap_or(0);
        unspent.entry(address).or_default().push((format!("tx-{tx}-{i}"), value));
    }
    StatusCode::OK
}

struct MockLedgerNode {
    state: Arc<LedgerState>,
    url: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server_task: Option<JoinHandle<()>>,
}

impl MockLedgerNode {
    async fn start() -> Self {
        let state = Arc::new(LedgerState::default());
        let app = Router::new()
            .route("/generate_keys", post(generate_keys))
            .route("/list_transactions", post(list_transactions))
            .route("/faucet_send", post(faucet_send))
            .route("/publish_transaction", post(publish_transaction))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let server_task = tokio::spawn(async move {
            let shutdown = async {
                shutdown_rx.await.ok();
            };
            axum::serve(listener, app).with_graceful_shutdown(shutdown).await.ok();
        });

        Self { state, url, shutdown_tx: Some(shutdown_tx), server_task: Some(server_task) }
    }

    fn client(&self) -> HttpLedgerClient {
        let http = create_shared_client(Duration::from_secs(5)).unwrap();
        HttpLedgerClient::new(http, format!("{}/", self.url))
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.server_task.take() {
            let _ = task.await;
        }
    }
}

#[tokio::test]
async fn generate_keys_returns_identity() {
    let node = MockLedgerNode::start().await;
    let client = node.client();

    let identity = client.generate_key_pair().await.unwrap();
    assert_eq!(identity.address, "addr/0+=");
    assert_eq!(identity.credential, "priv-0");

    node.stop().await;
}

#[tokio::test]
async fn faucet_then_list_round_trips_encoded_address() {
    let node = MockLedgerNode::start().await;
    let client = node.client();
    let identity = client.generate_key_pair().await.unwrap();

    assert!(client.list_unspent(&identity.address).await.unwrap().is_empty());

    client.request_faucet_funds(&identity.address).await.unwrap();
    let unspent = client.list_unspent(&identity.address).await.unwrap();
    assert_eq!(unspent.len(), 1);
    assert_eq!(unspent[0].value, FAUCET_AMOUNT);

    // Reserved characters in the address survive query encoding.
    assert!(node.state.queried.lock().unwrap().iter().all(|a| a == "addr/0+="));

    node.stop().await;
}

#[tokio::test]
async fn submit_posts_ledger_body() {
    let node = MockLedgerNode::start().await;
    let client = node.client();

    let request = TransactionRequest {
        input_ids: vec!["faucet-0".into()],
        outputs: vec![
            Output { recipient: "bob".into(), value: 400 },
            Output { recipient: "alice".into(), value: 600 },
        ],
        fee: 0,
        signer_credential: "priv-alice".into(),
    };
    client.submit_transaction(&request).await.unwrap();

    let published = node.state.published.lock().unwrap().clone();
    assert_eq!(
        published,
        vec![json!({
            "transactionsIds": ["faucet-0"],
            "outputs": [
                {"address": {"type": "SHA256", "data": "bob"}, "value": {"value": "400"}},
                {"address": {"type": "SHA256", "data": "alice"}, "value": {"value": "600"}},
            ],
            "fees": {"value": "0"},
            "keyPriv": "priv-alice",
        })]
    );

    node.stop().await;
}

#[tokio::test]
async fn server_error_maps_to_status() {
    let node = MockLedgerNode::start().await;
    node.state.fail_keygen.store(true, Ordering::SeqCst);

    let err = node.client().generate_key_pair().await.unwrap_err();
    assert!(matches!(err, LedgerError::Status(500)), "unexpected error: {err}");

    node.stop().await;
}

#[tokio::test]
async fn malformed_body_maps_to_protocol_error() {
    let node = MockLedgerNode::start().await;
    node.state.malformed_lists.store(true, Ordering::SeqCst);

    let err = node.client().list_unspent("anyone").await.unwrap_err();
    assert!(matches!(err, LedgerError::Protocol(_)), "unexpected error: {err}");

    node.stop().await;
}

#[tokio::test]
async fn swarm_activity_conserves_total_supply() {
    let node = MockLedgerNode::start().await;
    let client = Arc::new(node.client());
    let stats = SwarmStats::shared();

    let pool = Arc::new(bootstrap(client.as_ref(), 4, 2, &stats).await.unwrap());
    assert_eq!(pool.size(), 4);
    assert_eq!(node.state.total_supply(), 4 * FAUCET_AMOUNT);

    let delay = DelayWindow::up_to(Duration::from_secs(1));
    let mut chains: Vec<_> = (0..pool.size())
        .map(|i| {
            ActivityChain::new(i, Arc::clone(&pool), Arc::clone(&client), Arc::clone(&stats), delay)
                .unwrap()
        })
        .collect();

    let mut submitted = 0;
    for _ in 0..10 {
        for chain in &mut chains {
            if chain.execute_once().await == AttemptOutcome::Submitted {
                submitted += 1;
            }
        }
    }

    assert!(submitted > 0);
    assert_eq!(node.state.published.lock().unwrap().len(), submitted);
    assert_eq!(node.state.total_supply(), 4 * FAUCET_AMOUNT);
    assert_eq!(stats.snapshot().failed, 0);

    node.stop().await;
}

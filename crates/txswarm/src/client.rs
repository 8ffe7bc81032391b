//! HTTP client for the ledger node's REST surface.
//!
//! Every call is a single round trip with no retries; callers decide what a
//! failure means for them.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    error::LedgerError,
    types::{
        GeneratedKeys, Identity, PublishTransactionBody, TransactionRequest, UnspentList,
        UnspentOutput,
    },
};

/// The four ledger operations the swarm depends on.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    /// Mints a fresh address/credential pair on the node.
    async fn generate_key_pair(&self) -> Result<Identity, LedgerError>;

    /// Lists unspent outputs owned by `address`. Never fails on an absent list.
    async fn list_unspent(&self, address: &str) -> Result<Vec<UnspentOutput>, LedgerError>;

    /// Asks the faucet to credit `address`. The body is returned unparsed.
    async fn request_faucet_funds(&self, address: &str) -> Result<String, LedgerError>;

    /// Publishes a signed transaction. The body is returned unparsed.
    async fn submit_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<String, LedgerError>;
}

/// Creates a shared HTTP client with connection pooling for all chains.
pub fn create_shared_client(request_timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .pool_max_idle_per_host(100)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(10))
        .timeout(request_timeout)
        .build()
}

/// `LedgerApi` implementation backed by a ledger node's HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpLedgerClient {
    client: Client,
    base_url: String,
}

impl HttpLedgerClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn route(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn post_with_address(&self, path: &str, address: &str) -> Result<Response, LedgerError> {
        let response =
            self.client.post(self.route(path)).query(&[("address", address)]).send().await?;
        check_status(response)
    }
}

fn check_status(response: Response) -> Result<Response, LedgerError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(LedgerError::Status(status.as_u16()))
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, LedgerError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| LedgerError::Protocol(e.to_string()))
}

#[async_trait]
impl LedgerApi for HttpLedgerClient {
    async fn generate_key_pair(&self) -> Result<Identity, LedgerError> {
        let response = self.client.post(self.route("generate_keys")).send().await?;
        let keys: GeneratedKeys = decode(check_status(response)?).await?;
        Ok(keys.into_identity())
    }

    async fn list_unspent(&self, address: &str) -> Result<Vec<UnspentOutput>, LedgerError> {
        let response = self.post_with_address("list_transactions", address).await?;
        let list: UnspentList = decode(response).await?;
        Ok(list.into_outputs())
    }

    async fn request_faucet_funds(&self, address: &str) -> Result<String, LedgerError> {
        let response = self.post_with_address("faucet_send", address).await?;
        Ok(response.text().await?)
    }

    async fn submit_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<String, LedgerError> {
        let body = PublishTransactionBody::from(request);
        debug!(
            inputs = request.input_ids.len(),
            outputs = request.outputs.len(),
            value = request.output_total(),
            "Publishing transaction"
        );
        let response =
            self.client.post(self.route("publish_transaction")).json(&body).send().await?;
        Ok(check_status(response)?.text().await?)
    }
}

//! In-memory `LedgerApi` used by unit tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    client::LedgerApi,
    error::LedgerError,
    types::{Identity, TransactionRequest, UnspentOutput},
};

/// Mock ledger that mints sequential identities and serves canned unspent lists.
#[derive(Default)]
pub(crate) struct MockLedger {
    pub(crate) minted: AtomicU64,
    /// Unspent outputs returned for every address not listed in `unspent`.
    pub(crate) default_unspent: Vec<UnspentOutput>,
    pub(crate) unspent: HashMap<String, Vec<UnspentOutput>>,
    /// Addresses whose `list_unspent` always fails with a network error.
    pub(crate) failing: HashSet<String>,
    /// Addresses whose `list_unspent` takes this long to answer.
    pub(crate) slow: HashMap<String, Duration>,
    /// Key generation fails for these 0-based mint indices.
    pub(crate) keygen_failures: HashSet<u64>,
    /// Faucet requests fail for these addresses.
    pub(crate) faucet_failures: HashSet<String>,
    pub(crate) list_calls: Mutex<HashMap<String, u64>>,
    pub(crate) funded: Mutex<Vec<String>>,
    pub(crate) submitted: Mutex<Vec<TransactionRequest>>,
}

impl MockLedger {
    pub(crate) fn list_calls(&self, address: &str) -> u64 {
        self.list_calls.lock().unwrap().get(address).copied().unwrap_or(0)
    }

    pub(crate) fn submitted(&self) -> Vec<TransactionRequest> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerApi for MockLedger {
    async fn generate_key_pair(&self) -> Result<Identity, LedgerError> {
        let n = self.minted.fetch_add(1, Ordering::SeqCst);
        if self.keygen_failures.contains(&n) {
            return Err(LedgerError::Protocol("missing field `keyPriv`".into()));
        }
        Ok(Identity::new(format!("addr-{n}"), format!("key-{n}")))
    }

    async fn list_unspent(&self, address: &str) -> Result<Vec<UnspentOutput>, LedgerError> {
        *self.list_calls.lock().unwrap().entry(address.to_string()).or_default() += 1;

        if let Some(delay) = self.slow.get(address) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(address) {
            return Err(LedgerError::Network("connection reset".into()));
        }
        Ok(self.unspent.get(address).unwrap_or(&self.default_unspent).clone())
    }

    async fn request_faucet_funds(&self, address: &str) -> Result<String, LedgerError> {
        if self.faucet_failures.contains(address) {
            return Err(LedgerError::Status(503));
        }
        self.funded.lock().unwrap().push(address.to_string());
        Ok(String::new())
    }

    async fn submit_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<String, LedgerError> {
        self.submitted.lock().unwrap().push(request.clone());
        Ok("ok".into())
    }
}

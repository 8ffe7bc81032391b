//! Core data model and the JSON shapes exchanged with the ledger node.
//!
//! Wire structs are kept private to this module: the rest of the crate only
//! sees the typed model, and `PublishTransactionBody` is the single encoder
//! for outgoing transactions.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Address type tag the ledger expects on every output.
pub const ADDRESS_TYPE: &str = "SHA256";

/// A simulated actor: an address plus the opaque credential that signs for it.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub address: String,
    pub credential: String,
}

impl Identity {
    pub fn new(address: impl Into<String>, credential: impl Into<String>) -> Self {
        Self { address: address.into(), credential: credential.into() }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("address", &self.address)
            .field("credential", &"<redacted>")
            .finish()
    }
}

/// A spendable output owned by an address, as reported by `/list_transactions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspentOutput {
    pub id: String,
    pub value: u64,
}

/// One payment in a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub recipient: String,
    pub value: u64,
}

/// A fully assembled transaction, ready for `/publish_transaction`.
#[derive(Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub input_ids: Vec<String>,
    pub outputs: Vec<Output>,
    pub fee: u64,
    pub signer_credential: String,
}

impl TransactionRequest {
    /// Sum of all output values.
    pub fn output_total(&self) -> u64 {
        self.outputs.iter().map(|o| o.value).sum()
    }
}

impl fmt::Debug for TransactionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionRequest")
            .field("input_ids", &self.input_ids)
            .field("outputs", &self.outputs)
            .field("fee", &self.fee)
            .field("signer_credential", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Outgoing: /publish_transaction
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct WireAddress<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
struct WireAmount {
    value: String,
}

#[derive(Debug, Serialize)]
struct WireOutput<'a> {
    address: WireAddress<'a>,
    value: WireAmount,
}

/// JSON body posted to `/publish_transaction`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishTransactionBody<'a> {
    transactions_ids: Vec<&'a str>,
    outputs: Vec<WireOutput<'a>>,
    fees: WireAmount,
    key_priv: &'a str,
}

impl<'a> From<&'a TransactionRequest> for PublishTransactionBody<'a> {
    fn from(request: &'a TransactionRequest) -> Self {
        Self {
            transactions_ids: request.input_ids.iter().map(String::as_str).collect(),
            outputs: request
                .outputs
                .iter()
                .map(|o| WireOutput {
                    address: WireAddress { kind: ADDRESS_TYPE, data: &o.recipient },
                    value: WireAmount { value: o.value.to_string() },
                })
                .collect(),
            fees: WireAmount { value: request.fee.to_string() },
            key_priv: &request.signer_credential,
        }
    }
}

// ---------------------------------------------------------------------------
// Incoming: /generate_keys and /list_transactions
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WireData {
    data: String,
}

/// Response of `/generate_keys`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeneratedKeys {
    address: WireData,
    key_priv: WireData,
}

impl GeneratedKeys {
    pub(crate) fn into_identity(self) -> Identity {
        Identity { address: self.address.data, credential: self.key_priv.data }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUnspent {
    transaction_id: String,
    #[serde(deserialize_with = "amount_from_number_or_string")]
    value: u64,
}

/// Response of `/list_transactions`. A missing array means no unspent outputs.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UnspentList {
    #[serde(default)]
    unspent_transactions: Option<Vec<WireUnspent>>,
}

impl UnspentList {
    pub(crate) fn into_outputs(self) -> Vec<UnspentOutput> {
        self.unspent_transactions
            .unwrap_or_default()
            .into_iter()
            .map(|u| UnspentOutput { id: u.transaction_id, value: u.value })
            .collect()
    }
}

/// The node renders 64-bit amounts as decimal strings; plain numbers are accepted too.
fn amount_from_number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(u64),
        Text(String),
    }

    match Amount::deserialize(deserializer)? {
        Amount::Number(n) => Ok(n),
        Amount::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

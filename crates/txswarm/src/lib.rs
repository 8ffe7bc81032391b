//! Synthetic transaction load generator for a UTXO ledger node.
//!
//! Bootstrap mints and funds a pool of identities through the node's REST API,
//! then every identity runs its own activity chain: wait a random delay, spend
//! a random subset of its unspent outputs to random pool members, repeat.

pub mod bootstrap;
pub mod builder;
mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod pool;
mod runner;
pub mod scheduler;
pub mod stats;
pub mod types;

#[cfg(test)]
mod testing;

pub use builder::{NoOpReason, Plan, build};
pub use cli::Args;
pub use client::{HttpLedgerClient, LedgerApi, create_shared_client};
pub use config::SwarmConfig;
pub use error::LedgerError;
pub use pool::{IdentityPool, SharedIdentityPool};
pub use runner::run_swarm;
pub use scheduler::{ActivityChain, AttemptOutcome, DelayWindow};
pub use types::{Identity, Output, TransactionRequest, UnspentOutput};

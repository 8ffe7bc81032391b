//! Randomized transaction construction.
//!
//! Inputs and recipients are sampled uniformly, each recipient receives a
//! random share of what is left, and whatever remains returns to the sender
//! as change, so every transaction spends exactly what it consumes.

use rand::{Rng, seq::index};

use crate::{
    pool::IdentityPool,
    types::{Identity, Output, TransactionRequest, UnspentOutput},
};

/// Fee attached to every generated transaction.
pub const FEE: u64 = 0;

/// Why no transaction was built for an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    /// The identity owns no unspent outputs
    NoUnspent,
    /// The selected inputs carry no value
    ZeroValue,
    /// The selected inputs sum past `u64::MAX`, which a sane ledger never reports
    InputOverflow,
}

/// Outcome of a build: a request to publish, or nothing to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    Submit(TransactionRequest),
    NoOp(NoOpReason),
}

/// Builds one randomized transaction for `sender` from its current unspent outputs.
pub fn build(
    sender: &Identity,
    pool: &IdentityPool,
    unspent: &[UnspentOutput],
    rng: &mut impl Rng,
) -> Plan {
    if unspent.is_empty() {
        return Plan::NoOp(NoOpReason::NoUnspent);
    }

    let input_count = rng.gen_range(1..=unspent.len());
    let inputs: Vec<&UnspentOutput> = index::sample(rng, unspent.len(), input_count)
        .into_iter()
        .map(|i| &unspent[i])
        .collect();

    let Some(available) = inputs.iter().try_fold(0u64, |acc, u| acc.checked_add(u.value)) else {
        return Plan::NoOp(NoOpReason::InputOverflow);
    };
    if available == 0 {
        return Plan::NoOp(NoOpReason::ZeroValue);
    }

    let output_count = rng.gen_range(1..=pool.size().max(1));
    let recipients = pool.random_subset(output_count, rng);
    let outputs = allocate_outputs(&sender.address, &recipients, available, rng);

    Plan::Submit(TransactionRequest {
        input_ids: inputs.iter().map(|u| u.id.clone()).collect(),
        outputs,
        fee: FEE,
        signer_credential: sender.credential.clone(),
    })
}

/// Splits `available` across `recipients` in order, then pays the remainder back
/// to `sender` as change.
///
/// Each non-sender recipient draws `uniform[0, remaining)`; zero draws are
/// skipped. The returned outputs always sum to exactly `available`.
pub(crate) fn allocate_outputs(
    sender: &str,
    recipients: &[&Identity],
    available: u64,
    rng: &mut impl Rng,
) -> Vec<Output> {
    let mut remaining = available;
    let mut outputs = Vec::with_capacity(recipients.len() + 1);

    for recipient in recipients.iter().filter(|r| r.address != sender) {
        if remaining == 0 {
            break;
        }
        let value = rng.gen_range(0..remaining);
        if value == 0 {
            continue;
        }
        outputs.push(Output { recipient: recipient.address.clone(), value });
        remaining -= value;
    }

    if remaining > 0 {
        outputs.push(Output { recipient: sender.to_string(), value: remaining });
    }

    outputs
}

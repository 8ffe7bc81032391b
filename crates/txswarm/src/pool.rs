use std::sync::Arc;

use rand::{Rng, seq::index};

use crate::types::Identity;

/// The fixed set of identities for one run.
///
/// Populated once by bootstrap and never mutated afterwards, so chains read it
/// concurrently through a plain `Arc` without locking.
#[derive(Debug, Default)]
pub struct IdentityPool {
    identities: Vec<Identity>,
}

/// Pool handle shared by every activity chain.
pub type SharedIdentityPool = Arc<IdentityPool>;

impl IdentityPool {
    pub const fn new(identities: Vec<Identity>) -> Self {
        Self { identities }
    }

    pub fn size(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn all(&self) -> &[Identity] {
        &self.identities
    }

    pub fn get(&self, index: usize) -> Option<&Identity> {
        self.identities.get(index)
    }

    /// Samples `n` distinct identities uniformly without replacement, in random order.
    /// `n` is clamped to the pool size.
    pub fn random_subset(&self, n: usize, rng: &mut impl Rng) -> Vec<&Identity> {
        let amount = n.min(self.identities.len());
        index::sample(rng, self.identities.len(), amount)
            .into_iter()
            .map(|i| &self.identities[i])
            .collect()
    }
}

impl From<Vec<Identity>> for IdentityPool {
    fn from(identities: Vec<Identity>) -> Self {
        Self::new(identities)
    }
}

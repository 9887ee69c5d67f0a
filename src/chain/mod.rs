//! Bigram chain — persistence port and training policy.
//!
//! A [`BigramStore`] holds `(prev, curr) → next` transition edges with
//! observed frequencies, scoped per community. [`train_message`] feeds every
//! consecutive token triple of a message into the store, then applies the
//! eviction policy so a community's edge count stays bounded.
//!
//! The store implementation is responsible for atomic increment-or-insert;
//! multiple messages in the same community may train concurrently.

pub mod generator;
pub mod sqlite;

use tracing::debug;

use crate::error::EngineError;

/// Fewest tokens a message needs before it produces any training triple.
pub const MIN_TRAINABLE_TOKENS: usize = 3;

/// Persistence port for bigram edges.
///
/// Implementations must make `train` safe under concurrent callers for the
/// same `(community, prev, curr, next)` key — a transactional upsert or
/// atomic increment, not read-modify-write.
pub trait BigramStore: Send + Sync {
    /// Upsert one edge: insert with `freq = 1`, or increment an existing
    /// edge's frequency.
    fn train(&self, community: &str, prev: &str, curr: &str, next: &str)
    -> Result<(), EngineError>;

    /// Distinct `(prev, curr)` pairs observed as edge heads.
    fn start_pairs(&self, community: &str) -> Result<Vec<(String, String)>, EngineError>;

    /// Frequency distribution over `next` for one `(prev, curr)` head.
    fn next_distribution(
        &self,
        community: &str,
        prev: &str,
        curr: &str,
    ) -> Result<Vec<(String, u64)>, EngineError>;

    /// Total edge count for one community.
    fn count(&self, community: &str) -> Result<u64, EngineError>;

    /// Delete the `n` oldest-inserted edges, by insertion sequence —
    /// frequency and reinforcement recency are ignored.
    fn evict_oldest(&self, community: &str, n: u64) -> Result<u64, EngineError>;
}

/// Eviction policy knobs. See [`crate::config::ChainSettings`] for the
/// TOML-backed source of these values.
#[derive(Debug, Clone, Copy)]
pub struct EvictionPolicy {
    /// Maximum edges per community before eviction kicks in.
    pub edge_ceiling: u64,
    /// Extra headroom deleted on top of the overshoot, so eviction does not
    /// re-trigger on every subsequent training event.
    pub evict_batch: u64,
}

impl EvictionPolicy {
    /// Check the count and, if over the ceiling, delete enough of the oldest
    /// edges to settle comfortably under it. The delete is a single bounded
    /// batch — one training event can never trigger an unbounded delete.
    pub fn maintain(&self, store: &dyn BigramStore, community: &str) -> Result<(), EngineError> {
        let count = store.count(community)?;
        if count <= self.edge_ceiling {
            return Ok(());
        }
        let n = (count - self.edge_ceiling + self.evict_batch).min(count);
        let deleted = store.evict_oldest(community, n)?;
        debug!(community = %community, count, deleted, "evicted oldest bigram edges");
        Ok(())
    }
}

/// Train the store on one tokenized message.
///
/// Messages below [`MIN_TRAINABLE_TOKENS`] are ignored. Every consecutive
/// triple `(prev, curr, next)` becomes one upsert; after each successful
/// upsert the eviction policy is consulted.
pub fn train_message(
    store: &dyn BigramStore,
    community: &str,
    tokens: &[String],
    policy: EvictionPolicy,
) -> Result<usize, EngineError> {
    if tokens.len() < MIN_TRAINABLE_TOKENS {
        return Ok(0);
    }
    let mut trained = 0;
    for window in tokens.windows(3) {
        store.train(community, &window[0], &window[1], &window[2])?;
        trained += 1;
        policy.maintain(store, community)?;
    }
    Ok(trained)
}

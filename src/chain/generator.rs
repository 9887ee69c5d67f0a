//! Chain walker — synthesizes a new token sequence from the bigram store.
//!
//! The walk is seeded from a uniformly chosen start pair, advanced by
//! frequency-weighted draws over each head's `next` distribution, and ended
//! by a terminal-punctuation token, a stopword, a dead end, or the word
//! budget. Every random decision goes through the injected [`Rng`], so a
//! fixed seed reproduces a fixed walk.

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use tracing::debug;

use super::BigramStore;
use crate::error::EngineError;
use crate::tokenize::{is_punctuation_cluster, is_stopword, is_terminal};

/// Generate a response for `community`, or `None` when the store has no
/// usable start pair or the walk comes up shorter than `min_words`.
/// Both are generation failures the caller may silently ignore, not errors.
pub fn generate<R: Rng>(
    store: &dyn BigramStore,
    community: &str,
    min_words: usize,
    max_words: usize,
    rng: &mut R,
) -> Result<Option<String>, EngineError> {
    let tokens = match walk(store, community, min_words, max_words, rng)? {
        Some(tokens) => tokens,
        None => return Ok(None),
    };
    Ok(Some(detokenize(&tokens)))
}

/// The raw token walk behind [`generate`].
pub fn walk<R: Rng>(
    store: &dyn BigramStore,
    community: &str,
    min_words: usize,
    max_words: usize,
    rng: &mut R,
) -> Result<Option<Vec<String>>, EngineError> {
    let candidates: Vec<(String, String)> = store
        .start_pairs(community)?
        .into_iter()
        .filter(|(prev, curr)| !is_stopword(prev) && !is_stopword(curr))
        .collect();
    if candidates.is_empty() {
        debug!(community = %community, "no eligible start pairs");
        return Ok(None);
    }

    let (mut prev, mut curr) = candidates[rng.gen_range(0..candidates.len())].clone();
    let mut out = vec![prev.clone(), curr.clone()];

    for _ in 0..max_words.saturating_sub(2) {
        let dist = store.next_distribution(community, &prev, &curr)?;
        if dist.is_empty() {
            break;
        }

        let next = weighted_pick(&dist, rng);

        // Sentence enders are kept and close the walk; any other stopword
        // closes it without being kept.
        if is_terminal(&next) {
            out.push(next);
            break;
        }
        if is_stopword(&next) {
            break;
        }

        out.push(next.clone());
        prev = curr;
        curr = next;
    }

    // The seed pair alone can overshoot a degenerate budget below 2.
    if out.len() < min_words || out.len() > max_words {
        return Ok(None);
    }
    Ok(Some(out))
}

/// Frequency-weighted draw: probability proportional to each option's count.
fn weighted_pick<R: Rng>(dist: &[(String, u64)], rng: &mut R) -> String {
    debug_assert!(!dist.is_empty());
    match WeightedIndex::new(dist.iter().map(|(_, freq)| *freq)) {
        Ok(index) => dist[index.sample(rng)].0.clone(),
        // All-zero weights cannot occur (freq >= 1); fall back to the first
        // option rather than panicking if a store ever violates that.
        Err(_) => dist[0].0.clone(),
    }
}

/// Join tokens with single spaces, attaching punctuation clusters directly
/// to the preceding token.
pub fn detokenize(tokens: &[String]) -> String {
    let mut text = String::new();
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 && !is_punctuation_cluster(token) {
            text.push(' ');
        }
        text.push_str(token);
    }
    text
}

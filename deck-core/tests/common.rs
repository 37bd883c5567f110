#![allow(dead_code)]

use deck_core::{CardSlot, ShufflePlanner};
use deck_types::Card;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;

/// Creates a deterministic RNG so shuffle tests are reproducible
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Creates a planner whose position range is exactly `card_count` wide,
/// which makes random collisions all but certain
pub fn cramped_planner(card_count: usize, max_attempts: u32) -> ShufflePlanner {
    ShufflePlanner::with_upper_bound(max_attempts, card_count as i64 - 1)
}

/// Counts how many times each card appears in a layout
pub fn card_counts(slots: &[CardSlot]) -> HashMap<Card, usize> {
    let mut counts = HashMap::new();
    for slot in slots {
        *counts.entry(slot.card).or_insert(0) += 1;
    }
    counts
}

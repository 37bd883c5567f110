use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use tracing::{debug, info};

/// Largest position a shuffle hands out. Keeping it well below `i64::MAX`
/// lets `highest_position + 1` never overflow.
pub const POSITION_UPPER_BOUND: i64 = i32::MAX as i64;

pub const DEFAULT_MAX_SHUFFLE_ATTEMPTS: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShuffleError {
    #[error("Cannot place {cards} cards in positions 0..={upper_bound}")]
    RangeTooNarrow { cards: usize, upper_bound: i64 },
}

/// New positions for the undrawn cards of a deck, index-aligned with the
/// cards handed to the planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShufflePlan {
    pub positions: Vec<i64>,
    pub attempts: u32,
    pub used_fallback: bool,
}

/// Assigns random positions to cards and repairs collisions.
///
/// Every attempt draws each position uniformly from `0..=upper_bound`. When
/// an attempt produces a duplicate the whole assignment is redrawn. After
/// `max_attempts` failed attempts the planner falls back to a random
/// permutation of `0..n`, which cannot collide.
#[derive(Debug, Clone, Copy)]
pub struct ShufflePlanner {
    max_attempts: u32,
    upper_bound: i64,
}

impl Default for ShufflePlanner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SHUFFLE_ATTEMPTS)
    }
}

impl ShufflePlanner {
    pub fn new(max_attempts: u32) -> Self {
        Self::with_upper_bound(max_attempts, POSITION_UPPER_BOUND)
    }

    pub fn with_upper_bound(max_attempts: u32, upper_bound: i64) -> Self {
        Self {
            max_attempts,
            upper_bound: upper_bound.max(0),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn plan<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        card_count: usize,
    ) -> Result<ShufflePlan, ShuffleError> {
        if card_count as u64 > self.upper_bound as u64 + 1 {
            return Err(ShuffleError::RangeTooNarrow {
                cards: card_count,
                upper_bound: self.upper_bound,
            });
        }

        for attempt in 1..=self.max_attempts {
            let positions: Vec<i64> = (0..card_count)
                .map(|_| rng.gen_range(0..=self.upper_bound))
                .collect();

            if !has_collision(&positions) {
                return Ok(ShufflePlan {
                    positions,
                    attempts: attempt,
                    used_fallback: false,
                });
            }
            debug!("Shuffle attempt {} produced duplicate positions", attempt);
        }

        info!(
            "Shuffle of {} cards collided {} times, falling back to permutation",
            card_count, self.max_attempts
        );
        let mut positions: Vec<i64> = (0..card_count as i64).collect();
        positions.shuffle(rng);

        Ok(ShufflePlan {
            positions,
            attempts: self.max_attempts,
            used_fallback: true,
        })
    }
}

pub fn has_collision(positions: &[i64]) -> bool {
    let mut seen = HashSet::with_capacity(positions.len());
    positions.iter().any(|position| !seen.insert(*position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_has_collision() {
        assert!(!has_collision(&[]));
        assert!(!has_collision(&[3, 1, 2]));
        assert!(has_collision(&[3, 1, 3]));
    }

    #[test]
    fn test_wide_range_succeeds_without_fallback() {
        let mut rng = StdRng::seed_from_u64(7);
        let plan = ShufflePlanner::default().plan(&mut rng, 108).unwrap();
        assert_eq!(plan.positions.len(), 108);
        assert!(!plan.used_fallback);
        assert!(!has_collision(&plan.positions));
        assert!(plan
            .positions
            .iter()
            .all(|position| (0..=POSITION_UPPER_BOUND).contains(position)));
    }

    #[test]
    fn test_zero_cards() {
        let mut rng = StdRng::seed_from_u64(1);
        let plan = ShufflePlanner::default().plan(&mut rng, 0).unwrap();
        assert!(plan.positions.is_empty());
    }
}

//! Seeded, reproducible reordering of question and answer lists.
//!
//! The generator is ChaCha8 seeded from the stored 64-bit seed and the
//! permutation is `rand`'s Fisher-Yates shuffle. Both are pure functions of
//! the seed, so an attempt replays the same order on every request.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

/// Reorders `items` deterministically from `seed`.
pub fn shuffle_with_seed<T>(mut items: Vec<T>, seed: u64) -> Vec<T> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    items.shuffle(&mut rng);
    items
}

/// Reorders `items` when a seed is stored; returns the authored order otherwise.
pub fn shuffle<T>(items: Vec<T>, seed: Option<i64>) -> Vec<T> {
    match seed {
        Some(seed) => shuffle_with_seed(items, seed as u64),
        None => items,
    }
}

/// Derives the answer-order seed for one question so that questions with the
/// same number of answers are not permuted identically.
pub fn answer_seed_for(answer_seed: i64, question_id: i64) -> i64 {
    let mixed = (answer_seed as u64) ^ (question_id as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    mixed.rotate_left(17) as i64
}

/// Fresh seed for a new attempt.
pub fn generate_seed() -> i64 {
    rand::random::<i64>()
}

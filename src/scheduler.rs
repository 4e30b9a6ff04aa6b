//! Produces the disjoint index pairs that drive one epoch.

use rand::Rng;
use rand::rngs::SmallRng;

use crate::error::{Result, SoupError};

/// Shuffle `[0, n)` with Fisher-Yates and emit consecutive disjoint
/// pairs. `n` must be even. Consumes `n - 1` draws from `rng` (one
/// swap target per position, from the last index down to 1) — this is
/// the only RNG use inside the scheduler; epoch-level draws (order bit,
/// mutation samples) happen afterward in `Soup::epoch`.
pub fn random_disjoint_pairs(n: usize, rng: &mut SmallRng) -> Result<Vec<(usize, usize)>> {
    if n % 2 != 0 {
        return Err(SoupError::InvalidPopulation("population size must be even"));
    }
    let mut indices: Vec<usize> = (0..n).collect();
    for i in (1..n).rev() {
        let j = rng.gen_range(0..=i);
        indices.swap(i, j);
    }
    Ok(indices.chunks_exact(2).map(|pair| (pair[0], pair[1])).collect())
}

//! Owns the population and advances it one epoch at a time.
//!
//! The next generation is materialized fresh each epoch rather than
//! written in place: pair outputs can land in any slot, and in-place
//! writes would let a later pair in the same epoch observe an earlier
//! pair's output instead of the epoch's starting state.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::detector::{self, Order, PairOutcome};
use crate::error::{Result, SoupError};
use crate::scheduler;
use crate::vm::{PROGRAM_LEN, Program, TAPE_LEN, Vm};

/// The primordial soup: a population of programs, a random source, and
/// a monotonically increasing epoch counter.
pub struct Soup {
    pool: Vec<Program>,
    rng: SmallRng,
    epoch_index: u64,
}

impl Soup {
    /// Create a new soup with `size` randomly initialized programs.
    /// `size` must be even and at least 2.
    pub fn new(size: usize, seed: u64) -> Result<Self> {
        if size < 2 || size % 2 != 0 {
            return Err(SoupError::InvalidPopulation("population size must be even and at least 2"));
        }
        let mut rng = SmallRng::seed_from_u64(seed);
        let pool = (0..size)
            .map(|_| {
                let mut program = [0u8; PROGRAM_LEN];
                rng.fill(&mut program[..]);
                program
            })
            .collect();
        Ok(Self { pool, rng, epoch_index: 0 })
    }

    /// Build a soup directly from an existing population (used by the
    /// snapshot loader). The RNG is re-seeded fresh; callers that need
    /// exact RNG continuity across a save/load boundary must persist
    /// and restore the seed themselves via `meta`.
    pub fn from_pool(pool: Vec<Program>, seed: u64, epoch_index: u64) -> Result<Self> {
        if pool.len() < 2 || pool.len() % 2 != 0 {
            return Err(SoupError::InvalidPopulation("population size must be even and at least 2"));
        }
        Ok(Self { pool, rng: SmallRng::seed_from_u64(seed), epoch_index })
    }

    pub fn population(&self) -> &[Program] {
        &self.pool
    }

    pub fn epoch_index(&self) -> u64 {
        self.epoch_index
    }

    pub fn size(&self) -> usize {
        self.pool.len()
    }

    /// Advance one epoch: schedule disjoint pairs, run each pair's
    /// interaction, optionally mutate offspring, write the next
    /// generation back, and advance the epoch counter.
    ///
    /// Returns the per-pair outcomes when `record_outcomes` is set
    /// (otherwise an empty vector).
    pub fn epoch(&mut self, step_limit: usize, mutation_p: f64, record_outcomes: bool) -> Result<Vec<PairOutcome>> {
        let pairs = scheduler::random_disjoint_pairs(self.pool.len(), &mut self.rng)?;
        let mut next_gen = self.pool.clone();
        let mut outcomes = Vec::new();

        for (i, j) in pairs {
            let a_before = self.pool[i];
            let b_before = self.pool[j];

            let order = if self.rng.r#gen::<bool>() { Order::Ab } else { Order::Ba };

            let mut tape = [0u8; TAPE_LEN];
            match order {
                Order::Ab => {
                    tape[..PROGRAM_LEN].copy_from_slice(&a_before);
                    tape[PROGRAM_LEN..].copy_from_slice(&b_before);
                }
                Order::Ba => {
                    tape[..PROGRAM_LEN].copy_from_slice(&b_before);
                    tape[PROGRAM_LEN..].copy_from_slice(&a_before);
                }
            }

            let run_result = Vm::new(&mut tape, step_limit)?.run();

            let first: Program = tape[..PROGRAM_LEN].try_into().unwrap();
            let second: Program = tape[PROGRAM_LEN..].try_into().unwrap();
            let (mut a_after, mut b_after) = match order {
                Order::Ab => (first, second),
                Order::Ba => (second, first),
            };

            if mutation_p > 0.0 {
                self.mutate_offspring(&mut a_after, mutation_p);
                self.mutate_offspring(&mut b_after, mutation_p);
            }

            next_gen[i] = a_after;
            next_gen[j] = b_after;

            if record_outcomes {
                let event = detector::detect_exact_replication(&a_before, &b_before, &a_after, &b_after)?;
                outcomes.push(PairOutcome { i, j, order, run_result, event });
            }
        }

        self.pool = next_gen;
        self.epoch_index += 1;
        Ok(outcomes)
    }

    /// Per-byte mutation loop, in index order, one RNG draw per byte
    /// (plus one more per replacement). Called on `A'` then `B'`, the
    /// documented order for each pair's offspring.
    fn mutate_offspring(&mut self, program: &mut Program, per_byte_p: f64) {
        for byte in program.iter_mut() {
            if self.rng.r#gen::<f64>() < per_byte_p {
                *byte = self.rng.r#gen::<u8>();
            }
        }
    }

    /// Apply background mutation to the current population, outside of
    /// an epoch. Walks the population in index order; a no-op at
    /// `per_byte_p <= 0.0`.
    pub fn inject_mutation(&mut self, per_byte_p: f64) {
        if per_byte_p <= 0.0 {
            return;
        }
        for program in self.pool.iter_mut() {
            for byte in program.iter_mut() {
                if self.rng.r#gen::<f64>() < per_byte_p {
                    *byte = self.rng.r#gen::<u8>();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_odd_population() {
        let err = Soup::new(3, 1).unwrap_err();
        matches!(err, SoupError::InvalidPopulation(_));
    }

    #[test]
    fn rejects_too_small_population() {
        let err = Soup::new(0, 1).unwrap_err();
        matches!(err, SoupError::InvalidPopulation(_));
    }

    #[test]
    fn size_two_is_legal() {
        let mut soup = Soup::new(2, 1).unwrap();
        soup.epoch(8192, 0.0, false).unwrap();
        assert_eq!(soup.size(), 2);
    }

    #[test]
    fn deterministic_initialization() {
        let s1 = Soup::new(64, 42).unwrap();
        let s2 = Soup::new(64, 42).unwrap();
        assert_eq!(s1.population(), s2.population());
    }

    #[test]
    fn different_seeds_differ() {
        let s1 = Soup::new(64, 1).unwrap();
        let s2 = Soup::new(64, 2).unwrap();
        assert_ne!(s1.population(), s2.population());
    }

    #[test]
    fn epoch_preserves_population_size_and_program_length() {
        let mut soup = Soup::new(32, 7).unwrap();
        for _ in 0..5 {
            soup.epoch(256, 0.0, false).unwrap();
            assert_eq!(soup.size(), 32);
            for p in soup.population() {
                assert_eq!(p.len(), PROGRAM_LEN);
            }
        }
    }

    #[test]
    fn epoch_index_increments_by_one() {
        let mut soup = Soup::new(16, 3).unwrap();
        for e in 1..=10u64 {
            soup.epoch(256, 0.0, false).unwrap();
            assert_eq!(soup.epoch_index(), e);
        }
    }

    #[test]
    fn zero_mutation_is_noop_on_noop_tapes() {
        // A population of all-zero programs (every byte a no-op):
        // regardless of concatenation order, the VM makes no changes,
        // so A' == A and B' == B for every pair.
        let mut soup = Soup::new(8, 11).unwrap();
        for program in soup.pool.iter_mut() {
            *program = [0u8; PROGRAM_LEN];
        }
        let before = soup.population().to_vec();
        let outcomes = soup.epoch(1024, 0.0, true).unwrap();
        assert_eq!(soup.population(), before.as_slice());
        for outcome in outcomes {
            assert_eq!(outcome.event.a_after, outcome.event.a_before);
            assert_eq!(outcome.event.b_after, outcome.event.b_before);
        }
    }

    #[test]
    fn inject_mutation_zero_is_noop() {
        let mut soup = Soup::new(16, 5).unwrap();
        let before = soup.population().to_vec();
        soup.inject_mutation(0.0);
        assert_eq!(soup.population(), before.as_slice());
    }

    #[test]
    fn reproducibility_across_independent_runs() {
        let run = || {
            let mut soup = Soup::new(128, 123).unwrap();
            for _ in 0..50 {
                soup.epoch(512, 5e-5, false).unwrap();
            }
            soup.population().to_vec()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn identity_program_pair_is_stable_under_step_limit() {
        let mut soup = Soup::new(2, 0).unwrap();
        for program in soup.pool.iter_mut() {
            *program = [0u8; PROGRAM_LEN];
        }
        let outcomes = soup.epoch(1024, 0.0, true).unwrap();
        assert_eq!(soup.population(), vec![[0u8; PROGRAM_LEN]; 2].as_slice());
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].run_result.halt_reason, crate::vm::HaltReason::StepLimit);
        // A and B start identical, so this is not a distinct-program
        // replication event even though both halves end up unchanged.
        assert_eq!(outcomes[0].event.kind, crate::detector::ReplicationKind::None);
    }
}

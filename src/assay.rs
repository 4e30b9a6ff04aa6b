//! Stress-tests a candidate program against a set of "food" programs,
//! counting strict exact-replication successes in both concatenation
//! orders.

use rand::Rng;
use rand::rngs::SmallRng;

use crate::detector::{ReplicationKind, detect_exact_replication};
use crate::error::{Result, SoupError};
use crate::vm::{PROGRAM_LEN, Program, TAPE_LEN, Vm};

/// Runs `trials` interactions of `candidate` against a food drawn
/// uniformly from `foods` each time, returning `(successes, trials)`.
///
/// A trial succeeds only if `candidate` replicates itself exactly
/// regardless of which half of the tape it starts in: the
/// `candidate || food` run must classify `A_exact`, AND the
/// `food || candidate` run must classify `B_exact`. No partial credit.
pub fn assay_candidate(
    candidate: &Program,
    foods: &[Program],
    trials: usize,
    step_limit: usize,
    rng: &mut SmallRng,
) -> Result<(usize, usize)> {
    if foods.is_empty() {
        return Err(SoupError::InvalidPopulation("foods must be non-empty"));
    }

    let mut successes = 0;
    for _ in 0..trials {
        let food = &foods[rng.gen_range(0..foods.len())];

        let mut tape_sf = [0u8; TAPE_LEN];
        tape_sf[..PROGRAM_LEN].copy_from_slice(candidate);
        tape_sf[PROGRAM_LEN..].copy_from_slice(food);
        Vm::new(&mut tape_sf, step_limit)?.run();
        let sf_event = detect_exact_replication(
            candidate,
            food,
            &tape_sf[..PROGRAM_LEN],
            &tape_sf[PROGRAM_LEN..],
        )?;

        let mut tape_fs = [0u8; TAPE_LEN];
        tape_fs[..PROGRAM_LEN].copy_from_slice(food);
        tape_fs[PROGRAM_LEN..].copy_from_slice(candidate);
        Vm::new(&mut tape_fs, step_limit)?.run();
        let fs_event = detect_exact_replication(
            food,
            candidate,
            &tape_fs[..PROGRAM_LEN],
            &tape_fs[PROGRAM_LEN..],
        )?;

        if sf_event.kind == ReplicationKind::AExact && fs_event.kind == ReplicationKind::BExact {
            successes += 1;
        }
    }

    Ok((successes, trials))
}

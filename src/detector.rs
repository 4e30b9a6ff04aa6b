//! Classifies a pre/post interaction snapshot as an exact-replication
//! event. Byte-exact only — approximate measures belong to analytics,
//! not here, to keep the emergence signal unambiguous.

use crate::error::{Result, SoupError};
use crate::vm::{PROGRAM_LEN, RunResult};

/// Which half of the pair (if either) replicated itself exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationKind {
    AExact,
    BExact,
    None,
}

/// Concatenation order used to build the tape for an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ab,
    Ba,
}

/// The four 64-byte snapshots bracketing an interaction, plus the
/// classification derived from them.
#[derive(Debug, Clone)]
pub struct ReplicationEvent {
    pub kind: ReplicationKind,
    pub a_before: [u8; PROGRAM_LEN],
    pub b_before: [u8; PROGRAM_LEN],
    pub a_after: [u8; PROGRAM_LEN],
    pub b_after: [u8; PROGRAM_LEN],
}

/// `{i, j, order, RunResult, ReplicationEvent}` — created per pair only
/// when outcome recording is requested.
#[derive(Debug, Clone)]
pub struct PairOutcome {
    pub i: usize,
    pub j: usize,
    pub order: Order,
    pub run_result: RunResult,
    pub event: ReplicationEvent,
}

fn to_program(bytes: &[u8]) -> Result<[u8; PROGRAM_LEN]> {
    bytes
        .try_into()
        .map_err(|_| SoupError::InvalidProgram { expected: PROGRAM_LEN, actual: bytes.len() })
}

/// Classify a pre/post interaction by byte-exact comparison.
///
/// `A_exact` when both halves end up equal to the pre-interaction `A`;
/// `B_exact` when both end up equal to pre-interaction `B`; `None`
/// otherwise. All four inputs must be exactly 64 bytes. When `A_before`
/// and `B_before` are themselves identical, neither program has
/// overwritten a *distinct* other with a copy of itself, so the pair
/// classifies as `None` regardless of what the halves end up holding.
pub fn detect_exact_replication(
    a_before: &[u8],
    b_before: &[u8],
    a_after: &[u8],
    b_after: &[u8],
) -> Result<ReplicationEvent> {
    let a_before = to_program(a_before)?;
    let b_before = to_program(b_before)?;
    let a_after = to_program(a_after)?;
    let b_after = to_program(b_after)?;

    let kind = if a_before == b_before {
        ReplicationKind::None
    } else if a_after == a_before && b_after == a_before {
        ReplicationKind::AExact
    } else if a_after == b_before && b_after == b_before {
        ReplicationKind::BExact
    } else {
        ReplicationKind::None
    };

    Ok(ReplicationEvent { kind, a_before, b_before, a_after, b_after })
}
